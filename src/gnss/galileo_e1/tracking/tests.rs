
use num_complex::Complex;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::Sample;
use crate::DigSigProcErr;
use crate::gnss::galileo_e1::{signal_modulation,
	GALILEO_E1_CODE_CHIP_RATE_HZ, GALILEO_E1_FREQ_HZ, REPLICA_LENGTH};
use crate::utils::wrap_floor;

use super::*;

/// Streams synthetic E1B baseband: the sinboc replica delayed by a code phase, a Doppler
/// carrier, and AWGN scaled for a target C/N0.  Phase accumulators make Doppler changes
/// phase-continuous, the way a real front end sees them.
struct SignalGenerator {
	replica: Vec<f64>,
	rng: StdRng,
	fs: f64,
	carrier_phase_rad: f64,
	code_phase_half_chips: f64,
	carrier_step_rad: f64,
	code_step_half_chips: f64,
	noise_sigma: f64,
	idx: usize,
}

impl SignalGenerator {

	fn new(prn:usize, fs:f64, doppler_hz:f64, delay_samples:f64, cn0_db_hz:f64, seed:u64) -> Self {
		let mut replica_f32 = vec![0.0f32; REPLICA_LENGTH];
		signal_modulation::e1_code_float_sampled(&mut replica_f32, "1B", false, prn, 0.0).unwrap();
		let replica:Vec<f64> = replica_f32.iter().map(|x| *x as f64).collect();

		let code_freq_hz:f64 = GALILEO_E1_CODE_CHIP_RATE_HZ * (1.0 + doppler_hz / GALILEO_E1_FREQ_HZ);
		let code_step_half_chips:f64 = 2.0 * code_freq_hz / fs;

		// Unit carrier amplitude, so N0 = 10^(-C/N0 / 10) and the complex noise power is
		// N0 * fs, split evenly between the two components
		let noise_sigma:f64 = (fs * 10f64.powf(-cn0_db_hz / 10.0) / 2.0).sqrt();

		Self {
			replica,
			rng: StdRng::seed_from_u64(seed),
			fs,
			carrier_phase_rad: 0.0,
			code_phase_half_chips: -delay_samples * code_step_half_chips,
			carrier_step_rad: TWO_PI * doppler_hz / fs,
			code_step_half_chips,
			noise_sigma,
			idx: 0,
		}
	}

	fn set_doppler(&mut self, doppler_hz:f64) {
		self.carrier_step_rad = TWO_PI * doppler_hz / self.fs;
		let code_freq_hz:f64 = GALILEO_E1_CODE_CHIP_RATE_HZ * (1.0 + doppler_hz / GALILEO_E1_FREQ_HZ);
		self.code_step_half_chips = 2.0 * code_freq_hz / self.fs;
	}

	fn next_sample(&mut self) -> Sample {
		let code:f64 = self.replica[wrap_floor(self.code_phase_half_chips, REPLICA_LENGTH)];
		let signal = Complex{ re: self.carrier_phase_rad.cos(), im: self.carrier_phase_rad.sin() } * code;

		// Box-Muller pair for the complex AWGN
		let u1:f64 = 1.0 - self.rng.gen::<f64>();
		let u2:f64 = self.rng.gen::<f64>();
		let r:f64 = (-2.0 * u1.ln()).sqrt() * self.noise_sigma;
		let noise = Complex{ re: r * (TWO_PI * u2).cos(), im: r * (TWO_PI * u2).sin() };

		self.carrier_phase_rad += self.carrier_step_rad;
		self.code_phase_half_chips += self.code_step_half_chips;

		let idx = self.idx;
		self.idx += 1;
		Sample{ val: signal + noise, idx }
	}

}

fn run_samples(trk:&mut Tracking, gen:&mut SignalGenerator, n_samples:usize) -> Vec<TrackingRecord> {
	let mut records:Vec<TrackingRecord> = vec![];
	for _ in 0..n_samples {
		if let TrackingResult::Ready(record) = trk.apply(&gen.next_sample()) {
			records.push(record);
		}
	}
	records
}

fn start_with_hint(trk:&mut Tracking, prn:usize, delay_samples:f64, doppler_hz:f64, stamp:u64) {
	trk.set_acquisition_hint(AcquisitionHint {
		prn,
		acq_delay_samples: delay_samples,
		acq_doppler_hz: doppler_hz,
		acq_sample_stamp: stamp,
		system: 'E',
		signal: String::from("1B"),
	});
	trk.start_tracking().unwrap();
}

#[test]
fn clean_signal_locks_and_converges() {
	let fs:f64 = 4.0e6;
	let doppler_hz:f64 = 1234.5;
	let delay_samples:f64 = 137.0;
	let prn_len:u64 = 16000;

	let mut gen = SignalGenerator::new(11, fs, doppler_hz, delay_samples, 45.0, 0x1157);
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	// The acquisition estimate is a few Hz off, as a real search grid would be
	start_with_hint(&mut trk, 11, delay_samples, 1230.0, 0);

	let records = run_samples(&mut trk, &mut gen, fs as usize);

	// Pull-in completes in a single period and stamps the aligned position
	assert!(!records[0].flag_valid_symbol);
	assert_eq!(records[0].tracking_sample_counter, 137 + prn_len);

	// One record per period, block boundaries advancing by one code period each time.
	// The first tracked period starts where pull-in left the stream, so its stamp
	// repeats the pull-in stamp.
	assert!(records.len() >= 240, "only {} records", records.len());
	assert_eq!(records[1].tracking_sample_counter, records[0].tracking_sample_counter);
	for pair in records[1..].windows(2) {
		let advance:u64 = pair[1].tracking_sample_counter - pair[0].tracking_sample_counter;
		assert!(advance >= prn_len - 2 && advance <= prn_len + 2, "block advance {}", advance);
	}

	// NCO remnant invariants hold at the end of the run
	assert!(trk.rem_carr_phase_rad() >= 0.0 && trk.rem_carr_phase_rad() < TWO_PI);
	assert!(trk.rem_code_phase_samples().abs() < 1.0);
	assert!(trk.lock_fail_counter() <= MAXIMUM_LOCK_FAIL_COUNTER + 1);
	assert_eq!(trk.state(), TrackingState::Locked);
	assert!(trk.pop_event().is_none());

	// Steady-state Doppler error under 2 Hz RMS over the last 100 periods
	let tail = &records[records.len() - 100..];
	let doppler_rms:f64 = {
		let sum_sq:f64 = tail.iter().map(|r| (r.carrier_doppler_hz - doppler_hz).powi(2)).sum();
		(sum_sq / (tail.len() as f64)).sqrt()
	};
	assert!(doppler_rms < 2.0, "Doppler RMS {:.2} Hz", doppler_rms);

	// Code phase error under 0.02 chips RMS against the true (Doppler-dilated) boundaries
	let t_true:f64 = (prn_len as f64) / (1.0 + doppler_hz / GALILEO_E1_FREQ_HZ);
	let code_rms_chips:f64 = {
		let sum_sq:f64 = tail.iter().map(|r| {
			let boundary:f64 = (r.tracking_sample_counter as f64) + r.code_phase_samples;
			let m:f64 = ((boundary - delay_samples) / t_true).round();
			let err_samples:f64 = boundary - delay_samples - m * t_true;
			(err_samples * GALILEO_E1_CODE_CHIP_RATE_HZ / fs).powi(2)
		}).sum();
		(sum_sq / (tail.len() as f64)).sqrt()
	};
	assert!(code_rms_chips < 0.02, "code phase RMS {:.4} chips", code_rms_chips);

	// The C/N0 estimate settles near the synthesized 45 dB-Hz
	let last = records.last().unwrap();
	assert!(last.cn0_db_hz > 40.0 && last.cn0_db_hz < 50.0, "C/N0 {:.1}", last.cn0_db_hz);
	assert!(trk.carrier_lock_test() > CARRIER_LOCK_THRESHOLD);
}

#[test]
fn pull_in_lands_on_the_next_code_boundary() {
	let fs:f64 = 4.092e6;
	let prn_len:u64 = 16368;
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	trk.set_channel(2);

	// The channel idles while acquisition works on the same stream
	let zero = Sample{ val: Complex{ re: 0.0, im: 0.0 }, idx: 0 };
	for _ in 0..30_000 {
		match trk.apply(&zero) {
			TrackingResult::NotReady => (),
			_ => panic!("idle channel produced output"),
		}
	}
	assert_eq!(trk.sample_counter(), 30_000);

	// Acquisition stamped its estimate mid-period, 10000 samples ago
	start_with_hint(&mut trk, 11, 137.0, 500.0, 20_000);
	assert_eq!(trk.state(), TrackingState::PullIn);

	let mut first_record:Option<TrackingRecord> = None;
	let mut consumed:usize = 0;
	while first_record.is_none() {
		consumed += 1;
		if let TrackingResult::Ready(record) = trk.apply(&zero) {
			first_record = Some(record);
		}
	}
	let record = first_record.unwrap();

	// The stamp lands on the first code-period boundary after the acquisition delay
	assert!(!record.flag_valid_symbol);
	assert_eq!((record.tracking_sample_counter - 20_000 - 137) % prn_len, 0);
	assert_eq!(record.tracking_sample_counter, trk.sample_counter());
	assert_eq!(consumed as u64 + 30_000, record.tracking_sample_counter);
	assert_eq!(trk.state(), TrackingState::Locked);
}

#[test]
fn pull_in_rejects_inconsistent_hints() {
	let fs:f64 = 4.092e6;

	// A stamp from a stream position the channel has not reached yet
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	trk.set_acquisition_hint(AcquisitionHint {
		prn: 11, acq_delay_samples: 0.0, acq_doppler_hz: 0.0,
		acq_sample_stamp: 1000, system: 'E', signal: String::from("1B"),
	});
	match trk.start_tracking() {
		Err(DigSigProcErr::ConfigurationError(_)) => (),
		other => panic!("expected a configuration error, got {:?}", other),
	}

	// A delay so negative the alignment offset would be negative
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	trk.set_acquisition_hint(AcquisitionHint {
		prn: 11, acq_delay_samples: -20_000.0, acq_doppler_hz: 0.0,
		acq_sample_stamp: 0, system: 'E', signal: String::from("1B"),
	});
	match trk.start_tracking() {
		Err(DigSigProcErr::ConfigurationError(_)) => (),
		other => panic!("expected a configuration error, got {:?}", other),
	}
	assert_eq!(trk.state(), TrackingState::Idle);

	// No hint at all
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	match trk.start_tracking() {
		Err(DigSigProcErr::AcquisitionAbsent) => (),
		other => panic!("expected AcquisitionAbsent, got {:?}", other),
	}
}

#[test]
fn weak_signal_escalates_to_loss_of_lock() {
	let fs:f64 = 4.092e6;
	let mut gen = SignalGenerator::new(11, fs, 800.0, 200.0, 15.0, 0x1503);
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	trk.set_channel(3);
	start_with_hint(&mut trk, 11, 200.0, 800.0, 0);

	// 60 periods is well past the escalation budget
	let max_samples:usize = 16368 * 60;
	let mut records:usize = 0;
	let mut event:Option<TrackingEvent> = None;
	'run: for _ in 0..max_samples {
		if let TrackingResult::Ready(_) = trk.apply(&gen.next_sample()) {
			records += 1;
		}
		if let Some(e) = trk.pop_event() {
			event = Some(e);
			break 'run;
		}
	}

	let event = event.expect("no loss-of-lock event");
	assert_eq!(event, TrackingEvent::LossOfLock{ channel: 3 });
	assert_eq!(event.tag(), EVENT_LOSS_OF_LOCK);

	// The escalation takes the fail counter past its limit once, about 200 ms in
	assert!(records <= 55, "lock failure took {} periods", records);
	assert_eq!(trk.state(), TrackingState::Idle);
	assert_eq!(trk.lock_fail_counter(), 0);

	// Disabled channel keeps consuming but stays silent
	let counter_before = trk.sample_counter();
	for _ in 0..16368 {
		match trk.apply(&gen.next_sample()) {
			TrackingResult::NotReady => (),
			_ => panic!("disabled channel produced output"),
		}
	}
	assert_eq!(trk.sample_counter(), counter_before + 16368);
}

#[test]
fn zero_input_period_is_clamped() {
	let fs:f64 = 4.092e6;
	let prn_len:usize = 16368;
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	start_with_hint(&mut trk, 1, 0.0, 0.0, 0);

	let zero = Sample{ val: Complex{ re: 0.0, im: 0.0 }, idx: 0 };

	// Pull-in consumes exactly one code period when the delay estimate is zero
	let mut pull_in_record:Option<TrackingRecord> = None;
	for _ in 0..prn_len {
		if let TrackingResult::Ready(record) = trk.apply(&zero) {
			pull_in_record = Some(record);
		}
	}
	assert_eq!(pull_in_record.expect("pull-in never completed").tracking_sample_counter, prn_len as u64);

	// One all-zero period: every discriminator clamps to zero and the loop state is
	// untouched, but the quality monitor counts the failure
	let mut record:Option<TrackingRecord> = None;
	for _ in 0..prn_len {
		if let TrackingResult::Ready(r) = trk.apply(&zero) {
			record = Some(r);
		}
	}
	let record = record.expect("no record for the zero period");

	assert_eq!(record.prompt_i, 0.0);
	assert_eq!(record.prompt_q, 0.0);
	assert_eq!(record.carrier_doppler_hz, 0.0);
	assert_eq!(record.cn0_db_hz, 0.0);
	assert_eq!(trk.carrier_doppler_hz(), 0.0);
	assert_eq!(trk.code_freq_chips(), GALILEO_E1_CODE_CHIP_RATE_HZ);
	assert_eq!(trk.rem_code_phase_samples(), 0.0);
	assert_eq!(trk.rem_carr_phase_rad(), 0.0);
	assert_eq!(trk.current_prn_length_samples(), prn_len);
	assert_eq!(trk.sample_counter(), 2 * prn_len as u64);
	assert_eq!(trk.lock_fail_counter(), 1);
	assert_eq!(trk.state(), TrackingState::Locked);
}

#[test]
fn doppler_step_reconverges_without_excess_overshoot() {
	let fs:f64 = 4.0e6;
	let fd1:f64 = 1000.0;
	let fd2:f64 = 1020.0;

	let mut gen = SignalGenerator::new(20, fs, fd1, 0.0, 48.0, 0x2042);
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	start_with_hint(&mut trk, 20, 0.0, fd1, 0);

	// Pull-in plus 50 clean periods
	let before = run_samples(&mut trk, &mut gen, 16_000 * 51);
	assert!(before.len() >= 50);
	let settled = before.last().unwrap().carrier_doppler_hz;
	assert!((settled - fd1).abs() < 2.0, "baseline Doppler {:.2}", settled);

	// Phase-continuous frequency step
	gen.set_doppler(fd2);
	let after = run_samples(&mut trk, &mut gen, 16_000 * 150);

	// Re-convergence with bounded overshoot
	let max_doppler:f64 = after.iter().map(|r| r.carrier_doppler_hz).fold(f64::MIN, f64::max);
	assert!(max_doppler < fd2 + 10.0, "overshoot to {:.2} Hz", max_doppler);

	let tail = &after[after.len() - 50..];
	let rms:f64 = {
		let sum_sq:f64 = tail.iter().map(|r| (r.carrier_doppler_hz - fd2).powi(2)).sum();
		(sum_sq / (tail.len() as f64)).sqrt()
	};
	assert!(rms < 2.0, "post-step Doppler RMS {:.2} Hz", rms);
	assert!(trk.pop_event().is_none());
}

#[test]
fn cooperative_stop_emits_a_terminal_record() {
	let fs:f64 = 4.0e6;
	let mut gen = SignalGenerator::new(2, fs, 500.0, 50.0, 45.0, 0x0207);
	let mut trk = Tracking::new(TrackingConfig::for_sample_rate(fs)).unwrap();
	start_with_hint(&mut trk, 2, 50.0, 500.0, 0);

	// Through pull-in and a few tracked periods
	let records = run_samples(&mut trk, &mut gen, 16_000 * 5);
	assert!(records.len() >= 4);

	trk.stop_tracking();
	assert_eq!(trk.state(), TrackingState::Locked);

	// The period in flight still completes and reports
	let terminal = run_samples(&mut trk, &mut gen, 16_000 * 2);
	assert_eq!(terminal.len(), 1);
	assert_eq!(trk.state(), TrackingState::Idle);

	// Nothing more comes out after the terminal record
	let silent = run_samples(&mut trk, &mut gen, 16_000);
	assert!(silent.is_empty());
}
