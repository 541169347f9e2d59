
pub mod channel;
pub mod signal_modulation;
pub mod tracking;

// Galileo E1 signal constants.  The code-rate aiding in the tracking loop and the local
// replica generation both read the chip rate and carrier frequency from here so the two
// can never drift apart.
pub const GALILEO_E1_FREQ_HZ:f64 = 1.57542e9;
pub const GALILEO_E1_CODE_CHIP_RATE_HZ:f64 = 1.023e6;
pub const GALILEO_E1_B_CODE_LENGTH_CHIPS:usize = 4092;
pub const GALILEO_E1_CODE_PERIOD:f64 = 4.0e-3;
pub const GALILEO_E1_CODE_PERIOD_MS:f64 = 4.0;

/// The local sinboc(1,1) replica is sampled twice per chip
pub const REPLICA_SAMPLES_PER_CHIP:usize = 2;
pub const REPLICA_LENGTH:usize = REPLICA_SAMPLES_PER_CHIP * GALILEO_E1_B_CODE_LENGTH_CHIPS;

/// GNSS system names keyed by the single-byte tag carried in synchro records
pub const SYSTEM_NAMES:[(u8, &str); 4] = [
	(b'E', "Galileo"),
	(b'G', "GPS"),
	(b'R', "GLONASS"),
	(b'C', "BeiDou"),
];

pub fn system_name(tag:u8) -> &'static str {
	SYSTEM_NAMES.iter().find(|(t, _)| *t == tag).map(|(_, name)| *name).unwrap_or("Unknown")
}

#[test]
fn system_tag_lookup() {
	assert_eq!(system_name(b'E'), "Galileo");
	assert_eq!(system_name(b'X'), "Unknown");
}
