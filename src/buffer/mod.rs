
use std::alloc::{alloc_zeroed, dealloc, Layout};

use crate::DigSigProcErr;

/// Alignment of the platform's widest vector load, in bytes.  Buffers handed to the
/// correlator kernel are allocated at this alignment so the hot loop can be vectorized
/// without a scalar prologue.
pub const PLATFORM_ALIGNMENT:usize = 64;

/// A heap buffer of plain-data elements whose base address satisfies an arbitrary
/// power-of-two byte alignment.  The storage is zero-filled on allocation and released
/// when the buffer is dropped.
#[derive(Debug)]
pub struct AlignedBuffer<T: Copy> {
	ptr: *mut T,
	len: usize,
	layout: Layout,
}

impl<T: Copy> AlignedBuffer<T> {

	/// Allocates `len` elements at a multiple of `alignment_bytes`.  The alignment must be
	/// a power of two; an alignment of 1 leaves only the element type's natural alignment
	/// in effect.
	pub fn new(len:usize, alignment_bytes:usize) -> Result<Self, DigSigProcErr> {
		if len == 0 { return Err(DigSigProcErr::ConfigurationError("zero-length aligned buffer")); }
		if !alignment_bytes.is_power_of_two() { return Err(DigSigProcErr::ConfigurationError("alignment must be a power of two")); }

		// The layout alignment can never drop below what the element type itself requires,
		// so the returned storage is always valid as a [T]
		let align:usize = alignment_bytes.max(std::mem::align_of::<T>());
		let layout = Layout::from_size_align(len * std::mem::size_of::<T>(), align)
			.map_err(|_| DigSigProcErr::ConfigurationError("buffer size overflows the allocator"))?;

		let ptr = unsafe { alloc_zeroed(layout) as *mut T };
		if ptr.is_null() { return Err(DigSigProcErr::AllocationError); }

		Ok(Self { ptr, len, layout })
	}

	pub fn with_platform_alignment(len:usize) -> Result<Self, DigSigProcErr> {
		Self::new(len, PLATFORM_ALIGNMENT)
	}

	pub fn len(&self) -> usize { self.len }
	pub fn is_empty(&self) -> bool { self.len == 0 }

	pub fn as_ptr(&self) -> *const T { self.ptr }

	pub fn as_slice(&self) -> &[T] {
		unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
	}

	pub fn as_mut_slice(&mut self) -> &mut [T] {
		unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
	}

}

impl<T: Copy> Drop for AlignedBuffer<T> {
	fn drop(&mut self) {
		unsafe { dealloc(self.ptr as *mut u8, self.layout); }
	}
}

unsafe impl<T: Copy + Send> Send for AlignedBuffer<T> {}
unsafe impl<T: Copy + Sync> Sync for AlignedBuffer<T> {}

#[test]
fn alignment_round_trip() {
	for &size in &[1usize, 5, 64, 1000, 8184] {
		for &alignment in &[1usize, 2, 8, 16, 32, 64, 128] {
			let buf:AlignedBuffer<f32> = AlignedBuffer::new(size, alignment).unwrap();
			assert_eq!((buf.as_ptr() as usize) % alignment, 0);
			assert_eq!(buf.len(), size);
			assert!(buf.as_slice().iter().all(|x| *x == 0.0));
		}
	}
}

#[test]
fn alignment_stress() {
	let mut bufs:Vec<AlignedBuffer<f32>> = vec![];
	for i in 0..10_000 {
		let alignment = [1usize, 16, 32, 64][i % 4];
		let buf = AlignedBuffer::new(1 + (i % 257), alignment).unwrap();
		assert_eq!((buf.as_ptr() as usize) % alignment, 0);
		bufs.push(buf);
	}
	// Release in reverse allocation order
	while let Some(buf) = bufs.pop() { drop(buf); }
}

#[test]
fn rejects_bad_configurations() {
	assert_eq!(AlignedBuffer::<f32>::new(16, 3).unwrap_err(), DigSigProcErr::ConfigurationError("alignment must be a power of two"));
	assert_eq!(AlignedBuffer::<f32>::new(0, 16).unwrap_err(), DigSigProcErr::ConfigurationError("zero-length aligned buffer"));
}

#[test]
fn writes_survive_round_trip() {
	let mut buf:AlignedBuffer<f64> = AlignedBuffer::with_platform_alignment(128).unwrap();
	for (i, x) in buf.as_mut_slice().iter_mut().enumerate() { *x = i as f64; }
	assert_eq!(buf.as_slice()[127], 127.0);
	assert_eq!((buf.as_ptr() as usize) % PLATFORM_ALIGNMENT, 0);
}
