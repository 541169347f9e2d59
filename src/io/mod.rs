
use std::fs::File;

use byteorder::{LittleEndian, ReadBytesExt};
use num_complex::Complex;

use crate::Sample;

/// Streams complex baseband samples quantized as interleaved little-endian f32 pairs,
/// I then Q, the way the front end delivers them.
pub struct FileSourceLEf32Complex {
	f: File,
	idx: usize,
}

impl FileSourceLEf32Complex {

	pub fn new(filename:&str) -> Result<Self, &'static str> {
		let f = File::open(filename).map_err(|_| "Unable to open source file")?;
		Ok(Self { f, idx: 0 })
	}

	/// Discards the next `n` samples.
	pub fn drop_samples(&mut self, n:usize) {
		for _ in 0..n {
			self.next();
		}
	}

}

impl Iterator for FileSourceLEf32Complex {
	type Item = Sample;

	fn next(&mut self) -> Option<Sample> {
		match (self.f.read_f32::<LittleEndian>(), self.f.read_f32::<LittleEndian>()) {
			(Ok(re), Ok(im)) => {
				let idx = self.idx;
				self.idx += 1;
				Some(Sample{ val: Complex{ re: re as f64, im: im as f64 }, idx })
			},
			(_, _) => None,
		}
	}
}
