
use num_complex::Complex;

use galileo_radio::Sample;
use galileo_radio::gnss::galileo_e1::{signal_modulation,
	GALILEO_E1_CODE_CHIP_RATE_HZ, GALILEO_E1_FREQ_HZ, REPLICA_LENGTH};
use galileo_radio::gnss::galileo_e1::tracking::{AcquisitionHint, Tracking, TrackingConfig, TrackingResult};
use galileo_radio::utils::wrap_floor;

// Runs the tracker against a noiseless synthetic E1B capture: one second of PRN 11 at
// 4.0 Msps with 1234.5 Hz of Doppler and a 137-sample code phase offset.
fn main() -> Result<(), &'static str> {

	let fs:f64 = 4.0e6;
	let doppler_hz:f64 = 1234.5;
	let delay_samples:f64 = 137.0;

	let mut replica = vec![0.0f32; REPLICA_LENGTH];
	signal_modulation::e1_code_float_sampled(&mut replica, "1B", false, 11, 0.0)
		.map_err(|_| "Unable to generate the E1B replica")?;

	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).map_err(|_| "Invalid configuration")?;
	trk.set_acquisition_hint(AcquisitionHint {
		prn: 11,
		acq_delay_samples: delay_samples,
		acq_doppler_hz: 1230.0,
		acq_sample_stamp: 0,
		system: 'E',
		signal: String::from("1B"),
	});
	trk.start_tracking().map_err(|_| "Unable to start tracking")?;

	let code_step_half_chips:f64 = 2.0 * GALILEO_E1_CODE_CHIP_RATE_HZ * (1.0 + doppler_hz / GALILEO_E1_FREQ_HZ) / fs;
	let carr_step_rad:f64 = 2.0 * std::f64::consts::PI * doppler_hz / fs;

	for idx in 0..(fs as usize) {
		let code:f64 = replica[wrap_floor(((idx as f64) - delay_samples) * code_step_half_chips, REPLICA_LENGTH)] as f64;
		let phase:f64 = carr_step_rad * (idx as f64);
		let s = Sample{ val: Complex{ re: phase.cos(), im: phase.sin() } * code, idx };

		if let TrackingResult::Ready(record) = trk.apply(&s) {
			println!("{:8.4} [sec] PRN {:02}  Doppler {:9.3} [Hz]  C/N0 {:5.1} [dB-Hz]  prompt {:12.1}",
				(record.tracking_sample_counter as f64)/fs, record.prn,
				record.carrier_doppler_hz, record.cn0_db_hz, record.prompt_i);
		}
	}

	Ok(())

}
