
use num_complex::Complex;

/// Costas-loop two-quadrant arctangent PLL discriminator.  Returns the phase error in
/// radians; insensitive to data-symbol sign flips on the Prompt tap.  A Prompt with no
/// in-phase component yields 0.
pub fn pll_cloop_two_quadrant_atan(prompt:Complex<f64>) -> f64 {
	if prompt.re == 0.0 { 0.0 } else { (prompt.im / prompt.re).atan() }
}

/// Non-coherent very-early-minus-late DLL discriminator normalized by the total flank
/// power, in chips.  All four flanking taps contribute so the response stays linear
/// across the wide E1 correlation peak.  A dead correlator (zero denominator) yields 0.
pub fn dll_nc_vemlp_normalized(very_early:Complex<f64>, early:Complex<f64>, late:Complex<f64>, very_late:Complex<f64>) -> f64 {
	let early_mag:f64 = very_early.norm() + early.norm();
	let late_mag:f64 = very_late.norm() + late.norm();
	if early_mag + late_mag == 0.0 { 0.0 } else { (early_mag - late_mag) / (early_mag + late_mag) }
}
