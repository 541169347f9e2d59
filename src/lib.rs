
use num_complex::Complex;

pub mod buffer;

pub mod filters;
pub mod io;
pub mod gnss;

pub mod utils;

#[derive(Debug, Clone)]
pub struct Sample {
	pub val: Complex<f64>,
	pub idx: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DigSigProcErr {
    ConfigurationError(&'static str),
    AllocationError,
    AcquisitionAbsent,
    LossOfLock,
    Other(&'static str),
}
