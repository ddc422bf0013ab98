//! Prefix Bucketer
//!
//! Folds the leading bytes of a key into a bucket number.

use crate::error::{NumberError, Result};

/// Bucket number in `[0, bucket_count)`
pub type Bucket = u32;

/// Maps keys to buckets by their leading bytes
///
/// The first `prefix_width` bytes of the key are read as an unsigned
/// big-endian integer (missing bytes count as zero) and reduced modulo the
/// bucket count. Width is two bytes unless the bucket count exceeds what two
/// bytes can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixBucketer {
    bucket_count: u32,
    prefix_width: usize,
}

impl PrefixBucketer {
    /// Default prefix width in bytes
    pub const DEFAULT_PREFIX_WIDTH: usize = 2;

    /// Create a bucketer for `bucket_count` buckets
    pub fn new(bucket_count: u32) -> Result<Self> {
        if bucket_count == 0 {
            return Err(NumberError::Config("bucket_count must be at least 1".into()));
        }

        // Smallest width that can address every bucket, never below two bytes
        let mut prefix_width = Self::DEFAULT_PREFIX_WIDTH;
        while prefix_width < 4 && (1u64 << (8 * prefix_width)) < bucket_count as u64 {
            prefix_width += 1;
        }

        Ok(Self {
            bucket_count,
            prefix_width,
        })
    }

    /// Bucket for a key
    #[inline]
    pub fn bucket(&self, key: &[u8]) -> Bucket {
        let mut prefix: u64 = 0;
        for i in 0..self.prefix_width {
            prefix = (prefix << 8) | key.get(i).copied().unwrap_or(0) as u64;
        }
        (prefix % self.bucket_count as u64) as Bucket
    }

    /// Number of buckets (B)
    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// Number of leading key bytes folded into the bucket
    pub fn prefix_width(&self) -> usize {
        self.prefix_width
    }
}
