
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Arg, App};
use colored::*;

use galileo_radio::io::FileSourceLEf32Complex;
use galileo_radio::gnss::galileo_e1::tracking::{self, AcquisitionHint, TrackingConfig, TrackingRecord, TrackingResult};

fn main() -> Result<(), &'static str> {

	let matches = App::new("Galileo E1 Tracking")
		.version("0.1.0")
		.author("John Stanford (johnwstanford@gmail.com)")
		.about("Takes baseband IQ samples centered on 1575.42 MHz and produces tracking records for the E1B signal")
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Input file of interleaved little-endian f32 I/Q pairs")
			.required(true).takes_value(true))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true).required(true))
		.arg(Arg::with_name("prn")
			.short("p").long("prn")
			.takes_value(true).required(true))
		.arg(Arg::with_name("acq_doppler_hz")
			.short("d").long("acq_doppler_hz")
			.help("Carrier Doppler estimate from acquisition")
			.takes_value(true).required(true))
		.arg(Arg::with_name("acq_delay_samples")
			.short("c").long("acq_delay_samples")
			.help("Code phase estimate from acquisition")
			.takes_value(true).required(true))
		.arg(Arg::with_name("pll_bw_hz")
			.long("pll_bw_hz")
			.takes_value(true))
		.arg(Arg::with_name("dll_bw_hz")
			.long("dll_bw_hz")
			.takes_value(true))
		.arg(Arg::with_name("dump")
			.long("dump")
			.help("Write the binary tracking log")
			.takes_value(true))
		.arg(Arg::with_name("max_records")
			.short("m").long("max_records")
			.takes_value(true))
		.get_matches();

	// Parse mandatory fields
	let fname:&str            = matches.value_of("filename").unwrap();
	let fs:f64                = matches.value_of("sample_rate_sps").unwrap().parse().map_err(|_| "Unable to parse sample rate")?;
	let prn:usize             = matches.value_of("prn").unwrap().parse().map_err(|_| "Unable to parse PRN")?;
	let acq_doppler_hz:f64    = matches.value_of("acq_doppler_hz").unwrap().parse().map_err(|_| "Unable to parse Doppler")?;
	let acq_delay_samples:f64 = matches.value_of("acq_delay_samples").unwrap().parse().map_err(|_| "Unable to parse code phase")?;

	// Parse optional fields
	let opt_max_records:Option<usize> = matches.value_of("max_records").map(|s| s.parse().unwrap() );

	let mut cfg = TrackingConfig::for_sample_rate(fs);
	if let Some(bw) = matches.value_of("pll_bw_hz") { cfg.pll_bw_hz = bw.parse().map_err(|_| "Unable to parse PLL bandwidth")?; }
	if let Some(bw) = matches.value_of("dll_bw_hz") { cfg.dll_bw_hz = bw.parse().map_err(|_| "Unable to parse DLL bandwidth")?; }
	if let Some(base) = matches.value_of("dump") {
		cfg.dump = true;
		cfg.dump_filename = base.to_string();
	}

	eprintln!("Decoding {} at {} [samples/sec], PRN {:02}, max_records={:?}", &fname, &fs, prn, &opt_max_records);

	let running = Arc::new(AtomicBool::new(true));
	let r = running.clone();
	ctrlc::set_handler(move || {
		r.store(false, Ordering::SeqCst);
	}).map_err(|_| "Error setting Ctrl-C handler")?;

	let mut trk = tracking::Tracking::new(cfg).map_err(|_| "Invalid tracking configuration")?;
	trk.set_channel(0);
	trk.set_acquisition_hint(AcquisitionHint {
		prn,
		acq_delay_samples,
		acq_doppler_hz,
		acq_sample_stamp: 0,
		system: 'E',
		signal: String::from("1B"),
	});
	trk.start_tracking().map_err(|_| "Unable to start tracking")?;

	let src = FileSourceLEf32Complex::new(fname)?;
	let mut all_records:Vec<TrackingRecord> = vec![];

	'outer: for s in src {

		match trk.apply(&s) {
			TrackingResult::Ready(record) => {
				let line = format!("{:8.3} [sec], PRN {:02}, {:9.2} [Hz], C/N0 {:5.1} [dB-Hz], lock {:5.2}",
					(record.tracking_sample_counter as f64)/fs, record.prn, record.carrier_doppler_hz,
					record.cn0_db_hz, trk.carrier_lock_test());
				if      record.cn0_db_hz > 35.0 { eprintln!("{}", line.green());  }
				else if record.cn0_db_hz > 25.0 { eprintln!("{}", line.yellow()); }
				else                            { eprintln!("{}", line.red());    }

				all_records.push(record);
				if let Some(max_records) = opt_max_records {
					if all_records.len() >= max_records { break 'outer; }
				}
			},
			TrackingResult::NotReady => (),
			TrackingResult::Err(e) => {
				eprintln!("{}", format!("Tracking failed: {:?}", e).red());
				break 'outer;
			},
		}

		if let Some(event) = trk.pop_event() {
			eprintln!("{}", format!("Event {} on channel {}", event.tag(), event.channel()).red());
			break 'outer;
		}

		// Break out of this loop if SIGINT is detected (Ctrl-C)
		if !running.load(Ordering::SeqCst) { break 'outer; }

	}

	// Output data in JSON format
	println!("{}", serde_json::to_string_pretty(&all_records).map_err(|_| "Unable to serialize records")?);

	Ok(())

}
