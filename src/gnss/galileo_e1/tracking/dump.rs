
use std::fs::File;
use std::io::BufWriter;

use byteorder::{LittleEndian, WriteBytesExt};

/// One epoch of the binary debug log.  Field order is frozen: the five tap magnitudes,
/// Prompt I/Q, PRN start sample stamp, accumulated carrier phase, carrier Doppler, code
/// frequency, raw and filtered PLL errors, raw and filtered DLL errors, C/N0, carrier
/// lock test, remnant code phase, next PRN start, PRN.  Floats are f32, the sample stamp
/// is u64, the PRN is u32, all little endian.
pub struct TrackingEpoch {
	pub abs_very_early: f64,
	pub abs_early: f64,
	pub abs_prompt: f64,
	pub abs_late: f64,
	pub abs_very_late: f64,
	pub prompt_i: f64,
	pub prompt_q: f64,
	pub prn_start_sample_count: u64,
	pub acc_carrier_phase_rad: f64,
	pub carrier_doppler_hz: f64,
	pub code_freq_chips: f64,
	pub carr_error_hz: f64,
	pub carr_error_filt_hz: f64,
	pub code_error_chips: f64,
	pub code_error_filt_chips: f64,
	pub cn0_db_hz: f64,
	pub carrier_lock_test: f64,
	pub rem_code_phase_samples: f64,
	pub next_prn_start: f64,
	pub prn: u32,
}

/// Optional per-channel debug sink.  Failures to open or write are reported on stderr
/// and otherwise ignored; tracking never stalls on the log.
pub struct TrackingDump {
	writer: BufWriter<File>,
	filename: String,
}

impl TrackingDump {

	/// Opens `<base><channel>.dat`, returning None (with a stderr note) on failure.
	pub fn open(base:&str, channel:usize) -> Option<Self> {
		let filename = format!("{}{}.dat", base, channel);
		match File::create(&filename) {
			Ok(f) => {
				eprintln!("Tracking dump enabled on channel {}, log file {}", channel, &filename);
				Some(Self { writer: BufWriter::new(f), filename })
			},
			Err(e) => {
				eprintln!("Channel {} unable to open tracking dump file {}: {}", channel, &filename, e);
				None
			},
		}
	}

	pub fn filename(&self) -> &str { &self.filename }

	pub fn write_epoch(&mut self, epoch:&TrackingEpoch) {
		if let Err(e) = self.try_write_epoch(epoch) {
			eprintln!("Error writing tracking dump file {}: {}", &self.filename, e);
		}
	}

	fn try_write_epoch(&mut self, epoch:&TrackingEpoch) -> std::io::Result<()> {
		let w = &mut self.writer;
		w.write_f32::<LittleEndian>(epoch.abs_very_early as f32)?;
		w.write_f32::<LittleEndian>(epoch.abs_early as f32)?;
		w.write_f32::<LittleEndian>(epoch.abs_prompt as f32)?;
		w.write_f32::<LittleEndian>(epoch.abs_late as f32)?;
		w.write_f32::<LittleEndian>(epoch.abs_very_late as f32)?;
		w.write_f32::<LittleEndian>(epoch.prompt_i as f32)?;
		w.write_f32::<LittleEndian>(epoch.prompt_q as f32)?;
		w.write_u64::<LittleEndian>(epoch.prn_start_sample_count)?;
		w.write_f32::<LittleEndian>(epoch.acc_carrier_phase_rad as f32)?;
		w.write_f32::<LittleEndian>(epoch.carrier_doppler_hz as f32)?;
		w.write_f32::<LittleEndian>(epoch.code_freq_chips as f32)?;
		w.write_f32::<LittleEndian>(epoch.carr_error_hz as f32)?;
		w.write_f32::<LittleEndian>(epoch.carr_error_filt_hz as f32)?;
		w.write_f32::<LittleEndian>(epoch.code_error_chips as f32)?;
		w.write_f32::<LittleEndian>(epoch.code_error_filt_chips as f32)?;
		w.write_f32::<LittleEndian>(epoch.cn0_db_hz as f32)?;
		w.write_f32::<LittleEndian>(epoch.carrier_lock_test as f32)?;
		w.write_f32::<LittleEndian>(epoch.rem_code_phase_samples as f32)?;
		w.write_f64::<LittleEndian>(epoch.next_prn_start)?;
		w.write_u32::<LittleEndian>(epoch.prn)?;
		Ok(())
	}

}
