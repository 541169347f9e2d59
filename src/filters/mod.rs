
pub trait ScalarFilter {

	fn apply(&mut self, x:f64) -> f64;
	fn initialize(&mut self);

}

/// Second-order proportional-plus-integral tracking loop filter from the Kaplan/Borre
/// receiver texts.  The same structure serves both loops; the constructors differ in the
/// natural-frequency derivation and the loop gain.
pub struct Tracking2ndOrderFilter {
	tau1: f64,
	tau2: f64,
	pdi: f64,
	last_error: f64,
	last_nco: f64,
}

impl Tracking2ndOrderFilter {

	/// Carrier loop: `noise_bandwidth_hz` is the PLL noise bandwidth and `pdi_s` the
	/// coherent integration period in seconds.  Corrections come out in Hz.
	pub fn new_pll(noise_bandwidth_hz:f64, pdi_s:f64) -> Self {
		Self::from_loop_design(noise_bandwidth_hz / 0.7845, 0.7, 0.25, pdi_s)
	}

	/// Code loop: corrections come out in chips/second.
	pub fn new_dll(noise_bandwidth_hz:f64, pdi_s:f64) -> Self {
		Self::from_loop_design(noise_bandwidth_hz / 0.53, 0.7, 1.0, pdi_s)
	}

	fn from_loop_design(wn:f64, zeta:f64, k:f64, pdi:f64) -> Self {
		let tau1:f64 = k / (wn * wn);
		let tau2:f64 = (2.0 * zeta) / wn;
		Self { tau1, tau2, pdi, last_error: 0.0, last_nco: 0.0 }
	}

}

impl ScalarFilter for Tracking2ndOrderFilter {

	fn apply(&mut self, x:f64) -> f64 {
		let nco:f64 = self.last_nco
			+ (self.tau2 / self.tau1) * (x - self.last_error)
			+ (x + self.last_error) * (self.pdi / (2.0 * self.tau1));
		self.last_nco = nco;
		self.last_error = x;
		nco
	}

	fn initialize(&mut self) {
		self.last_error = 0.0;
		self.last_nco = 0.0;
	}

}

#[test]
fn zero_error_keeps_nco_at_zero() {
	let mut pll = Tracking2ndOrderFilter::new_pll(15.0, 0.004);
	let mut dll = Tracking2ndOrderFilter::new_dll(2.0, 0.004);
	for _ in 0..1000 {
		assert_eq!(pll.apply(0.0), 0.0);
		assert_eq!(dll.apply(0.0), 0.0);
	}
}

#[test]
fn persistent_error_integrates_up() {
	let mut pll = Tracking2ndOrderFilter::new_pll(15.0, 0.004);
	let first:f64 = pll.apply(0.1);
	assert!(first > 0.0);
	let mut last:f64 = first;
	for _ in 0..10 { last = pll.apply(0.1); }
	assert!(last > first);

	pll.initialize();
	assert_eq!(pll.apply(0.0), 0.0);
}
