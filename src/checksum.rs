//! Checksum computation utilities.
//!
//! The `crc` cpio format stores, for every regular file, the 32-bit sum of
//! all data bytes (despite the name, it is not a CRC). Padding is never
//! included and other file types always carry 0.
//!
//! # Example
//!
//! ```rust
//! use cpioarc::checksum::{ByteSum, Checksum, checksum32};
//!
//! let mut sum = ByteSum::new();
//! sum.update(b"Hello, ");
//! sum.update(b"World!");
//! assert_eq!(sum.finalize(), checksum32(b"Hello, World!"));
//! assert_eq!(ByteSum::compute(b"\x01\x02\x03"), 6);
//! ```

use std::io::{self, Read};

use crate::READ_BUFFER_SIZE;

/// Common trait for checksum computation.
pub trait Checksum: Default + Clone {
    /// The output type of this checksum.
    type Output: Copy + Eq + std::fmt::Debug;

    /// Creates a new checksum calculator.
    fn new() -> Self;

    /// Updates the checksum with additional data.
    fn update(&mut self, data: &[u8]);

    /// Finishes the checksum computation and returns the value.
    fn finalize(&self) -> Self::Output;

    /// Resets the checksum to its initial state.
    fn reset(&mut self);

    /// Computes the checksum of a single slice in one call.
    fn compute(data: &[u8]) -> Self::Output {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Computes the checksum by reading from a reader until EOF.
    fn compute_reader<R: Read>(reader: &mut R) -> io::Result<Self::Output> {
        let mut hasher = Self::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hasher.finalize())
    }
}

/// Wrapping 32-bit byte sum, the checksum of the `crc` format.
///
/// # Example
///
/// ```rust
/// use cpioarc::checksum::{ByteSum, Checksum};
///
/// let sum = ByteSum::compute(&[0xff; 4]);
/// assert_eq!(sum, 0x3fc);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteSum {
    sum: u32,
}

impl Checksum for ByteSum {
    type Output = u32;

    fn new() -> Self {
        Self { sum: 0 }
    }

    fn update(&mut self, data: &[u8]) {
        self.sum = data
            .iter()
            .fold(self.sum, |acc, &b| acc.wrapping_add(u32::from(b)));
    }

    fn finalize(&self) -> u32 {
        self.sum
    }

    fn reset(&mut self) {
        self.sum = 0;
    }
}

/// Returns the wrapping sum of every byte in `data`.
pub fn checksum32(data: &[u8]) -> u32 {
    ByteSum::compute(data)
}

/// A reader wrapper that sums bytes while reading.
///
/// # Example
///
/// ```rust
/// use cpioarc::checksum::ByteSumReader;
/// use std::io::Read;
///
/// let mut reader = ByteSumReader::new(&b"abc"[..]);
/// let mut out = Vec::new();
/// reader.read_to_end(&mut out).unwrap();
/// assert_eq!(reader.checksum(), 97 + 98 + 99);
/// assert_eq!(reader.bytes_read(), 3);
/// ```
pub struct ByteSumReader<R> {
    inner: R,
    sum: ByteSum,
    bytes_read: u64,
}

impl<R> ByteSumReader<R> {
    /// Creates a new summing reader wrapping the given reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            sum: ByteSum::new(),
            bytes_read: 0,
        }
    }

    /// Returns the sum of the bytes read so far.
    pub fn checksum(&self) -> u32 {
        self.sum.finalize()
    }

    /// Returns the number of bytes read.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consumes the wrapper and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ByteSumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.sum.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}
