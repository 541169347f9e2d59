
use num_complex::Complex;

use crate::DigSigProcErr;
use crate::buffer::AlignedBuffer;
use crate::utils::wrap_floor;

const ZERO:Complex<f64> = Complex{ re: 0.0, im: 0.0 };

/// Carrier wipeoff plus code-resampling correlator over an arbitrary set of taps.  The
/// local code replica, the tap offsets and the accumulators all live in SIMD-aligned
/// buffers that stay put for the life of the correlator.
pub struct Multicorrelator {
	local_code: AlignedBuffer<f32>,
	shifts_chips: AlignedBuffer<f64>,
	outs: AlignedBuffer<Complex<f64>>,
}

impl Multicorrelator {

	/// `code_length_half_chips` is the replica table length (two entries per chip);
	/// `shifts_chips` gives one code offset per tap, in chips, in output order.
	pub fn new(code_length_half_chips:usize, shifts_chips:&[f64]) -> Result<Self, DigSigProcErr> {
		if shifts_chips.is_empty() { return Err(DigSigProcErr::ConfigurationError("a correlator needs at least one tap")); }

		let local_code = AlignedBuffer::with_platform_alignment(code_length_half_chips)?;
		let mut shifts = AlignedBuffer::with_platform_alignment(shifts_chips.len())?;
		shifts.as_mut_slice().copy_from_slice(shifts_chips);
		let outs = AlignedBuffer::with_platform_alignment(shifts_chips.len())?;

		Ok(Self { local_code, shifts_chips: shifts, outs })
	}

	pub fn num_taps(&self) -> usize { self.outs.len() }
	pub fn outputs(&self) -> &[Complex<f64>] { self.outs.as_slice() }

	/// The replica storage, exposed so a code generator can fill it in place.
	pub fn local_code_mut(&mut self) -> &mut [f32] { self.local_code.as_mut_slice() }

	pub fn clear_outputs(&mut self) {
		for out in self.outs.as_mut_slice() { *out = ZERO; }
	}

	/// Accumulates one block: for every input sample, remove the carrier predicted by the
	/// phase ramp, index the replica for each tap at the current code phase plus that
	/// tap's offset, and accumulate.  Phases advance in f64 so the indexing cannot drift
	/// over long runs; indices wrap modulo the replica length.
	pub fn correlate(&mut self,
			input:&[Complex<f64>],
			init_carr_phase_rad:f64, carr_phase_step_rad:f64,
			init_code_phase_half_chips:f64, code_phase_step_half_chips:f64,
			n_samples:usize) {

		self.clear_outputs();

		let code_len:usize = self.local_code.len();
		let code = self.local_code.as_slice();
		let shifts = self.shifts_chips.as_slice();
		let outs = self.outs.as_mut_slice();

		for k in 0..n_samples {
			let phase:f64 = init_carr_phase_rad + (k as f64) * carr_phase_step_rad;
			let wiped:Complex<f64> = input[k] * Complex{ re: phase.cos(), im: -phase.sin() };
			let code_phase:f64 = init_code_phase_half_chips + (k as f64) * code_phase_step_half_chips;

			for (tap, shift) in shifts.iter().enumerate() {
				let idx:usize = wrap_floor(code_phase + shift * 2.0, code_len);
				outs[tap] += wiped * (code[idx] as f64);
			}
		}
	}

}
