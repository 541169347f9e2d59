
use std::collections::VecDeque;

use num_complex::Complex;

/// Signal-to-noise-variance C/N0 estimator over a window of Prompt correlator outputs.
/// The narrowband/total power ratio is kept strictly inside (0, 1) and the result is
/// reported on [0, 60] dB-Hz.  An empty window yields 0.
pub fn cn0_svn_estimator(prompt_buffer:&VecDeque<Complex<f64>>, coh_integration_time_s:f64) -> f64 {
	if prompt_buffer.is_empty() { return 0.0; }
	let n:f64 = prompt_buffer.len() as f64;
	let p_sig:f64 = {
		let sum:f64 = prompt_buffer.iter().map(|c| c.re.abs() ).sum();
		(sum / n).powi(2)
	};
	let p_tot:f64 = {
		let sum:f64 = prompt_buffer.iter().map(|c| c.re*c.re + c.im*c.im).sum();
		sum / n
	};
	if p_tot <= 0.0 { return 0.0; }
	let np:f64 = (p_sig / p_tot).clamp(f64::EPSILON, 1.0 - f64::EPSILON);
	let snr:f64 = np / (1.0 - np);
	(10.0 * snr.log10() - 10.0 * coh_integration_time_s.log10()).clamp(0.0, 60.0)
}

/// Carrier lock test statistic over the same Prompt window; ranges over [-1, 1] with
/// values near 1 indicating phase lock.  The window is summed first and squared after,
/// so incoherent phase spreads the energy into the quadrature sum and drives the
/// statistic down.  An empty window yields 0.
pub fn carrier_lock_detector(prompt_buffer:&VecDeque<Complex<f64>>) -> f64 {
	let tmp_sum_i:f64 = prompt_buffer.iter().map(|c| c.re).sum();
	let tmp_sum_q:f64 = prompt_buffer.iter().map(|c| c.im).sum();
	let nbp:f64 = tmp_sum_i * tmp_sum_i + tmp_sum_q * tmp_sum_q;
	let nbd:f64 = tmp_sum_i * tmp_sum_i - tmp_sum_q * tmp_sum_q;
	if nbp == 0.0 { 0.0 } else { nbd / nbp }
}
