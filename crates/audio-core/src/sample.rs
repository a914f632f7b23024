//! Integer sample containers and widening
//!
//! The capture loop is generic over the integer width the backend delivers.
//! Sinks widen every sample into an `i32` container before encoding, which
//! is lossless for every supported width.

/// A signed integer PCM sample as delivered by the backend
pub trait Sample: Copy + Default + Send + Sync + 'static {
    /// Width of the sample container in bits
    const BITS: u16;

    /// Widen the sample into an `i32` container
    fn to_i32(self) -> i32;
}

impl Sample for i8 {
    const BITS: u16 = 8;

    #[inline]
    fn to_i32(self) -> i32 {
        i32::from(self)
    }
}

impl Sample for i16 {
    const BITS: u16 = 16;

    #[inline]
    fn to_i32(self) -> i32 {
        i32::from(self)
    }
}

impl Sample for i32 {
    const BITS: u16 = 32;

    #[inline]
    fn to_i32(self) -> i32 {
        self
    }
}

/// Widen `samples` into `adapter`, reusing its allocation
pub fn widen_into<T: Sample>(samples: &[T], adapter: &mut Vec<i32>) {
    adapter.clear();
    adapter.extend(samples.iter().map(|&s| s.to_i32()));
}
