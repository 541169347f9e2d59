
use std::collections::VecDeque;

use num_complex::Complex;
use serde::{Serialize, Deserialize};

use crate::{Sample, DigSigProcErr};
use crate::filters::{ScalarFilter, Tracking2ndOrderFilter};
use crate::gnss::tracking::lock_detectors;
use crate::gnss::galileo_e1::{signal_modulation, system_name,
	GALILEO_E1_FREQ_HZ, GALILEO_E1_CODE_CHIP_RATE_HZ, GALILEO_E1_B_CODE_LENGTH_CHIPS,
	GALILEO_E1_CODE_PERIOD, GALILEO_E1_CODE_PERIOD_MS, REPLICA_LENGTH};

pub mod correlator;
pub mod discriminators;
pub mod dump;

#[cfg(test)]
mod tests;

use self::correlator::Multicorrelator;
use self::dump::{TrackingDump, TrackingEpoch};

// Lock monitoring
pub const CN0_ESTIMATION_SAMPLES:usize = 20;
pub const MINIMUM_VALID_CN0_DB_HZ:f64 = 25.0;
pub const MAXIMUM_LOCK_FAIL_COUNTER:usize = 50;
pub const CARRIER_LOCK_THRESHOLD:f64 = 0.85;

/// Outbound event tags; the payload is the channel id
pub const EVENT_LOSS_OF_LOCK:u32 = 3;

const TWO_PI:f64 = 2.0 * std::f64::consts::PI;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
	pub if_freq_hz: f64,
	pub fs_hz: f64,
	pub vector_length_samples: usize,
	pub dump: bool,
	pub dump_filename: String,
	pub pll_bw_hz: f64,
	pub dll_bw_hz: f64,
	pub early_late_spc_chips: f64,
	pub very_early_late_spc_chips: f64,
}

impl TrackingConfig {

	/// Defaults for a front end delivering baseband at `fs_hz`
	pub fn for_sample_rate(fs_hz:f64) -> Self {
		Self {
			if_freq_hz: 0.0,
			fs_hz,
			vector_length_samples: (fs_hz * GALILEO_E1_CODE_PERIOD).round() as usize,
			dump: false,
			dump_filename: String::from("./tracking_ch_"),
			pll_bw_hz: 15.0,
			dll_bw_hz: 2.0,
			early_late_spc_chips: 0.15,
			very_early_late_spc_chips: 0.6,
		}
	}

}

/// Initial delay/Doppler estimate handed over by acquisition when the channel starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionHint {
	pub prn: usize,
	pub acq_delay_samples: f64,
	pub acq_doppler_hz: f64,
	pub acq_sample_stamp: u64,
	pub system: char,
	pub signal: String,
}

/// Per-code-period synchronization record consumed by telemetry decoding and PVT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingRecord {
	pub tracking_sample_counter: u64,
	pub fs: u64,
	pub prompt_i: f64,
	pub prompt_q: f64,
	pub code_phase_samples: f64,
	pub carrier_phase_rad: f64,
	pub carrier_doppler_hz: f64,
	pub cn0_db_hz: f64,
	pub flag_valid_symbol: bool,
	pub correlation_length_ms: f64,
	pub system: char,
	pub signal: String,
	pub prn: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
	LossOfLock{ channel: usize },
}

impl TrackingEvent {

	pub fn tag(&self) -> u32 {
		match self {
			TrackingEvent::LossOfLock{..} => EVENT_LOSS_OF_LOCK,
		}
	}

	pub fn channel(&self) -> usize {
		match self {
			TrackingEvent::LossOfLock{ channel } => *channel,
		}
	}

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
	Idle,
	PullIn,
	Locked,
}

#[derive(Debug)]
pub enum TrackingResult {
	NotReady,
	Ready(TrackingRecord),
	Err(DigSigProcErr),
}

/// DLL+PLL VEML tracking controller for one Galileo E1B channel.  Owns every piece of
/// loop state; one processing task drives it to completion on each code period.
pub struct Tracking {
	cfg: TrackingConfig,
	channel: usize,
	acq: Option<AcquisitionHint>,
	state: TrackingState,
	stop_requested: bool,

	// NCO state
	carrier_doppler_hz: f64,
	code_freq_chips: f64,
	rem_carr_phase_rad: f64,
	rem_code_phase_samples: f64,
	acc_carrier_phase_rad: f64,
	acc_code_phase_secs: f64,

	// Block geometry
	current_prn_length_samples: usize,
	sample_counter: u64,
	pull_in_remaining: usize,

	correlator: Multicorrelator,
	carrier_filter: Tracking2ndOrderFilter,
	code_filter: Tracking2ndOrderFilter,

	sample_buffer: Vec<Complex<f64>>,

	// Lock state
	prompt_buffer: VecDeque<Complex<f64>>,
	cn0_db_hz: f64,
	carrier_lock_test: f64,
	lock_fail_counter: usize,

	events: VecDeque<TrackingEvent>,
	preamble_timestamp_s: Option<f64>,
	dump: Option<TrackingDump>,
}

impl Tracking {

	pub fn new(cfg:TrackingConfig) -> Result<Self, DigSigProcErr> {
		if !(cfg.fs_hz > 0.0) { return Err(DigSigProcErr::ConfigurationError("sample rate must be positive")); }
		if cfg.vector_length_samples == 0 { return Err(DigSigProcErr::ConfigurationError("vector length must be positive")); }
		if (cfg.vector_length_samples as f64 - cfg.fs_hz * GALILEO_E1_CODE_PERIOD).abs() > 1.0 {
			return Err(DigSigProcErr::ConfigurationError("vector length must span one E1 code period"));
		}
		if !(cfg.pll_bw_hz > 0.0 && cfg.dll_bw_hz > 0.0) { return Err(DigSigProcErr::ConfigurationError("loop bandwidths must be positive")); }
		if !(cfg.early_late_spc_chips > 0.0) { return Err(DigSigProcErr::ConfigurationError("early-late spacing must be positive")); }
		if !(cfg.very_early_late_spc_chips > cfg.early_late_spc_chips) {
			return Err(DigSigProcErr::ConfigurationError("very-early-late spacing must exceed early-late spacing"));
		}

		// Tap layout: Very-Early, Early, Prompt, Late, Very-Late
		let shifts_chips:[f64; 5] = [
			-cfg.very_early_late_spc_chips,
			-cfg.early_late_spc_chips,
			0.0,
			cfg.early_late_spc_chips,
			cfg.very_early_late_spc_chips,
		];
		let correlator = Multicorrelator::new(REPLICA_LENGTH, &shifts_chips)?;

		let carrier_filter = Tracking2ndOrderFilter::new_pll(cfg.pll_bw_hz, GALILEO_E1_CODE_PERIOD);
		let code_filter = Tracking2ndOrderFilter::new_dll(cfg.dll_bw_hz, GALILEO_E1_CODE_PERIOD);

		let current_prn_length_samples = cfg.vector_length_samples;

		Ok(Self {
			cfg, channel: 0, acq: None,
			state: TrackingState::Idle, stop_requested: false,
			carrier_doppler_hz: 0.0,
			code_freq_chips: GALILEO_E1_CODE_CHIP_RATE_HZ,
			rem_carr_phase_rad: 0.0, rem_code_phase_samples: 0.0,
			acc_carrier_phase_rad: 0.0, acc_code_phase_secs: 0.0,
			current_prn_length_samples, sample_counter: 0, pull_in_remaining: 0,
			correlator, carrier_filter, code_filter,
			sample_buffer: Vec::with_capacity(current_prn_length_samples + 2),
			prompt_buffer: VecDeque::with_capacity(CN0_ESTIMATION_SAMPLES),
			cn0_db_hz: 0.0, carrier_lock_test: 0.0, lock_fail_counter: 0,
			events: VecDeque::new(), preamble_timestamp_s: None, dump: None,
		})
	}

	// Read-only getter methods
	pub fn state(&self) -> TrackingState { self.state }
	pub fn channel(&self) -> usize { self.channel }
	pub fn sample_counter(&self) -> u64 { self.sample_counter }
	pub fn carrier_doppler_hz(&self) -> f64 { self.carrier_doppler_hz }
	pub fn code_freq_chips(&self) -> f64 { self.code_freq_chips }
	pub fn rem_carr_phase_rad(&self) -> f64 { self.rem_carr_phase_rad }
	pub fn rem_code_phase_samples(&self) -> f64 { self.rem_code_phase_samples }
	pub fn acc_carrier_phase_rad(&self) -> f64 { self.acc_carrier_phase_rad }
	pub fn acc_code_phase_secs(&self) -> f64 { self.acc_code_phase_secs }
	pub fn current_prn_length_samples(&self) -> usize { self.current_prn_length_samples }
	pub fn cn0_db_hz(&self) -> f64 { self.cn0_db_hz }
	pub fn carrier_lock_test(&self) -> f64 { self.carrier_lock_test }
	pub fn lock_fail_counter(&self) -> usize { self.lock_fail_counter }

	// Named views of the correlator tap outputs
	pub fn very_early(&self) -> Complex<f64> { self.correlator.outputs()[0] }
	pub fn early(&self) -> Complex<f64> { self.correlator.outputs()[1] }
	pub fn prompt(&self) -> Complex<f64> { self.correlator.outputs()[2] }
	pub fn late(&self) -> Complex<f64> { self.correlator.outputs()[3] }
	pub fn very_late(&self) -> Complex<f64> { self.correlator.outputs()[4] }

	pub fn set_channel(&mut self, channel:usize) {
		self.channel = channel;
		if self.cfg.dump && self.dump.is_none() {
			self.dump = TrackingDump::open(&self.cfg.dump_filename, channel);
		}
	}

	pub fn set_acquisition_hint(&mut self, hint:AcquisitionHint) {
		self.acq = Some(hint);
	}

	/// Telemetry-bit timestamp hints arrive asynchronously from the decoder; they are
	/// advisory and never gate the processing loop.
	pub fn handle_preamble_timestamp(&mut self, t:f64) {
		self.preamble_timestamp_s = Some(t);
	}

	pub fn preamble_timestamp_s(&self) -> Option<f64> { self.preamble_timestamp_s }

	pub fn pop_event(&mut self) -> Option<TrackingEvent> { self.events.pop_front() }

	/// Arms the channel from the stored acquisition hint: regenerates the local replica,
	/// resets both loop filters and all NCO state, and computes the pull-in alignment
	/// that makes the first tracked period start on a code-period boundary.
	pub fn start_tracking(&mut self) -> Result<(), DigSigProcErr> {
		let acq = self.acq.clone().ok_or(DigSigProcErr::AcquisitionAbsent)?;

		// Local reference always starts at chip 1, two samples per chip
		signal_modulation::e1_code_float_sampled(self.correlator.local_code_mut(), &acq.signal, false, acq.prn, 0.0)?;

		self.carrier_filter.initialize();
		self.code_filter.initialize();
		self.correlator.clear_outputs();

		self.carrier_doppler_hz = acq.acq_doppler_hz;
		self.code_freq_chips = GALILEO_E1_CODE_CHIP_RATE_HZ;
		self.rem_carr_phase_rad = 0.0;
		self.rem_code_phase_samples = 0.0;
		self.acc_carrier_phase_rad = 0.0;
		self.acc_code_phase_secs = 0.0;
		self.current_prn_length_samples = self.cfg.vector_length_samples;

		self.sample_buffer.clear();
		self.prompt_buffer.clear();
		self.cn0_db_hz = 0.0;
		self.carrier_lock_test = 0.0;
		self.lock_fail_counter = 0;
		self.stop_requested = false;

		// Signal alignment: skip enough input that the first tracked period begins at a
		// code-period boundary relative to the acquisition stamp
		if self.sample_counter < acq.acq_sample_stamp {
			return Err(DigSigProcErr::ConfigurationError("acquisition stamp is ahead of the sample counter"));
		}
		let acq_to_trk_delay:f64 = (self.sample_counter - acq.acq_sample_stamp) as f64;
		let prn_length:f64 = self.current_prn_length_samples as f64;
		let shift_correction:f64 = prn_length - acq_to_trk_delay.rem_euclid(prn_length);
		let samples_offset:f64 = (acq.acq_delay_samples + shift_correction).round();
		if samples_offset < 0.0 {
			return Err(DigSigProcErr::ConfigurationError("pull-in offset is negative"));
		}

		self.pull_in_remaining = samples_offset as usize;
		self.state = if self.pull_in_remaining == 0 { TrackingState::Locked } else { TrackingState::PullIn };

		eprintln!("Tracking of {} E1B signal started on channel {} for PRN {:02}; pull-in Doppler {:.1} [Hz], code phase {:.1} [samples]",
			system_name(acq.system as u8), self.channel, acq.prn, acq.acq_doppler_hz, acq.acq_delay_samples);

		Ok(())
	}

	/// Requests a cooperative stop: the period in flight completes and emits its record,
	/// after which the channel goes idle and consumes no more input.
	pub fn stop_tracking(&mut self) {
		match self.state {
			TrackingState::Idle => (),
			TrackingState::PullIn => { self.state = TrackingState::Idle; },
			TrackingState::Locked => { self.stop_requested = true; },
		}
	}

	/// Feeds one complex baseband sample.  Returns a record exactly once per processed
	/// period, the pull-in period included.
	pub fn apply(&mut self, sample:&Sample) -> TrackingResult {
		match self.state {
			TrackingState::Idle => {
				// An idle channel still consumes the stream so a later activation sees a
				// consistent sample count
				self.sample_counter += 1;
				TrackingResult::NotReady
			},
			TrackingState::PullIn => {
				self.pull_in_remaining -= 1;
				self.sample_counter += 1;
				if self.pull_in_remaining == 0 {
					self.state = TrackingState::Locked;
					let acq = match self.acq.as_ref() {
						Some(acq) => acq,
						None => return TrackingResult::Err(DigSigProcErr::AcquisitionAbsent),
					};
					// Minimal record carrying the aligned sample stamp
					TrackingResult::Ready(TrackingRecord {
						tracking_sample_counter: self.sample_counter,
						fs: self.cfg.fs_hz as u64,
						prompt_i: 0.0, prompt_q: 0.0,
						code_phase_samples: 0.0,
						carrier_phase_rad: 0.0,
						carrier_doppler_hz: self.carrier_doppler_hz,
						cn0_db_hz: 0.0,
						flag_valid_symbol: false,
						correlation_length_ms: GALILEO_E1_CODE_PERIOD_MS,
						system: acq.system, signal: acq.signal.clone(), prn: acq.prn,
					})
				} else {
					TrackingResult::NotReady
				}
			},
			TrackingState::Locked => {
				self.sample_buffer.push(sample.val);
				if self.sample_buffer.len() >= self.current_prn_length_samples {
					let result = self.process_period();
					self.sample_buffer.clear();
					if self.stop_requested {
						self.stop_requested = false;
						self.state = TrackingState::Idle;
					}
					result
				} else {
					TrackingResult::NotReady
				}
			},
		}
	}

	fn process_period(&mut self) -> TrackingResult {
		let acq = match self.acq.clone() {
			Some(acq) => acq,
			None => return TrackingResult::Err(DigSigProcErr::AcquisitionAbsent),
		};
		let fs:f64 = self.cfg.fs_hz;
		let n:usize = self.current_prn_length_samples;

		// Carrier wipeoff and correlation over one code period.  The remnant code phase
		// is the delay of the code start past the block start, so the replica phase ramp
		// begins that many samples behind; negating it here is what keeps the replica
		// continuous from one block to the next.
		let carr_phase_step_rad:f64 = TWO_PI * self.carrier_doppler_hz / fs;
		let code_phase_step_half_chips:f64 = 2.0 * self.code_freq_chips / fs;
		let rem_code_phase_half_chips:f64 = -self.rem_code_phase_samples * code_phase_step_half_chips;
		self.correlator.correlate(&self.sample_buffer,
			self.rem_carr_phase_rad, carr_phase_step_rad,
			rem_code_phase_half_chips, code_phase_step_half_chips, n);

		let very_early = self.very_early();
		let early = self.early();
		let prompt = self.prompt();
		let late = self.late();
		let very_late = self.very_late();

		// PLL discriminator and filter; new carrier Doppler estimate
		let carr_error_hz:f64 = discriminators::pll_cloop_two_quadrant_atan(prompt) / TWO_PI;
		let carr_error_filt_hz:f64 = self.carrier_filter.apply(carr_error_hz);
		self.carrier_doppler_hz = acq.acq_doppler_hz + carr_error_filt_hz;

		// Code Doppler follows the carrier scaled to the chip rate
		self.code_freq_chips = GALILEO_E1_CODE_CHIP_RATE_HZ
			+ (self.carrier_doppler_hz * GALILEO_E1_CODE_CHIP_RATE_HZ) / GALILEO_E1_FREQ_HZ;

		// Carrier phase accumulator and remnant for the next block's NCO
		let block_phase_rad:f64 = TWO_PI * self.carrier_doppler_hz * (n as f64) / fs;
		self.acc_carrier_phase_rad -= block_phase_rad;
		self.rem_carr_phase_rad = (self.rem_carr_phase_rad + block_phase_rad).rem_euclid(TWO_PI);

		// DLL discriminator and filter; code phase accumulator
		let code_error_chips:f64 = discriminators::dll_nc_vemlp_normalized(very_early, early, late, very_late);
		let code_error_filt_chips:f64 = self.code_filter.apply(code_error_chips);
		let code_error_filt_secs:f64 = (GALILEO_E1_CODE_PERIOD * code_error_filt_chips) / GALILEO_E1_CODE_CHIP_RATE_HZ;
		self.acc_code_phase_secs += code_error_filt_secs;

		// Next block length from the new PRN period and the code phase error estimate
		let t_chip_seconds:f64 = 1.0 / self.code_freq_chips;
		let t_prn_seconds:f64 = t_chip_seconds * (GALILEO_E1_B_CODE_LENGTH_CHIPS as f64);
		let t_prn_samples:f64 = t_prn_seconds * fs;
		let k_blk_samples:f64 = t_prn_samples + self.rem_code_phase_samples + code_error_filt_secs * fs;
		let next_prn_length:usize = k_blk_samples.round() as usize;

		// C/N0 estimation and lock detection over the Prompt window
		self.prompt_buffer.push_back(prompt);
		if self.prompt_buffer.len() >= CN0_ESTIMATION_SAMPLES {
			self.cn0_db_hz = lock_detectors::cn0_svn_estimator(&self.prompt_buffer, GALILEO_E1_CODE_PERIOD);
			self.carrier_lock_test = lock_detectors::carrier_lock_detector(&self.prompt_buffer);
			self.prompt_buffer.clear();
		}
		if self.carrier_lock_test < CARRIER_LOCK_THRESHOLD || self.cn0_db_hz < MINIMUM_VALID_CN0_DB_HZ {
			self.lock_fail_counter += 1;
		} else if self.lock_fail_counter > 0 {
			self.lock_fail_counter -= 1;
		}
		if self.lock_fail_counter > MAXIMUM_LOCK_FAIL_COUNTER {
			eprintln!("Loss of lock in channel {}!", self.channel);
			self.events.push_back(TrackingEvent::LossOfLock{ channel: self.channel });
			self.lock_fail_counter = 0;
			self.state = TrackingState::Idle;
		}

		let record = TrackingRecord {
			tracking_sample_counter: self.sample_counter,
			fs: fs as u64,
			prompt_i: prompt.re,
			prompt_q: prompt.im,
			code_phase_samples: self.rem_code_phase_samples,
			carrier_phase_rad: self.acc_carrier_phase_rad,
			carrier_doppler_hz: self.carrier_doppler_hz,
			cn0_db_hz: self.cn0_db_hz,
			flag_valid_symbol: true,
			correlation_length_ms: GALILEO_E1_CODE_PERIOD_MS,
			system: acq.system, signal: acq.signal.clone(), prn: acq.prn,
		};

		if let Some(dump) = &mut self.dump {
			dump.write_epoch(&TrackingEpoch {
				abs_very_early: very_early.norm(),
				abs_early: early.norm(),
				abs_prompt: prompt.norm(),
				abs_late: late.norm(),
				abs_very_late: very_late.norm(),
				prompt_i: prompt.re,
				prompt_q: prompt.im,
				prn_start_sample_count: self.sample_counter,
				acc_carrier_phase_rad: self.acc_carrier_phase_rad,
				carrier_doppler_hz: self.carrier_doppler_hz,
				code_freq_chips: self.code_freq_chips,
				carr_error_hz, carr_error_filt_hz,
				code_error_chips, code_error_filt_chips,
				cn0_db_hz: self.cn0_db_hz,
				carrier_lock_test: self.carrier_lock_test,
				rem_code_phase_samples: self.rem_code_phase_samples,
				next_prn_start: (self.sample_counter + n as u64) as f64,
				prn: acq.prn as u32,
			});
		}

		// Remnant code phase after this period's stamp; rounding error stays under one sample
		self.rem_code_phase_samples = k_blk_samples - (next_prn_length as f64);
		self.current_prn_length_samples = next_prn_length;
		self.sample_counter += n as u64;

		TrackingResult::Ready(record)
	}

}
