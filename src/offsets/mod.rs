//! Offset Table Module
//!
//! Turns per-bucket record counts into global id ranges.
//!
//! ## Responsibilities
//! - Fold ascending `(bucket, count)` pairs into `B+1` monotone offsets
//! - Reject out-of-range and out-of-order buckets (fatal for the run)
//! - Persist the table for the assignment pass and load it back
//!
//! ## Layout
//! ```text
//!   counts:   {0: 2, 1: 1, 3: 3}            (B = 4)
//!   offsets:  [ 0 | 2 | 3 | 3 | 6 ]
//!              b0  b1  b2  b3  total
//!   bucket b owns ids [offsets[b], offsets[b+1])
//! ```
//!
//! ## File Format
//! `B+1` signed 32-bit big-endian integers, no header. `B` is inferred from
//! the file length.

mod builder;
mod file;

use std::path::Path;

use crate::error::{NumberError, Result};
use crate::partition::Bucket;
use crate::record::{list_part_files, Record, RecordReader};

pub use builder::build_offsets;

/// Record count of one nonempty bucket, as produced by the counting pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketCount {
    pub bucket: Bucket,
    pub count: u64,
}

impl BucketCount {
    pub fn new(bucket: Bucket, count: u64) -> Self {
        Self { bucket, count }
    }

    /// Key bytes: bucket as 4-byte big-endian
    pub fn encode_key(bucket: Bucket) -> [u8; 4] {
        bucket.to_be_bytes()
    }

    /// Value bytes: count as 8-byte big-endian
    pub fn encode_value(count: u64) -> [u8; 8] {
        count.to_be_bytes()
    }

    /// Decode a count record written by the counting pass
    pub fn decode(record: &Record) -> Result<Self> {
        let key: [u8; 4] = record.key.as_ref().try_into().map_err(|_| {
            NumberError::Corruption(format!(
                "bucket count key must be 4 bytes, got {}",
                record.key.len()
            ))
        })?;
        let value: [u8; 8] = record.value.as_ref().try_into().map_err(|_| {
            NumberError::Corruption(format!(
                "bucket count value must be 8 bytes, got {}",
                record.value.len()
            ))
        })?;
        Ok(Self {
            bucket: u32::from_be_bytes(key),
            count: u64::from_be_bytes(value),
        })
    }
}

/// Read every bucket count from a counting-pass output directory
///
/// Part files are read in partition-index order, entries in file order.
/// Ordering is not checked here; `build_offsets` does that.
pub fn read_bucket_counts(dir: &Path) -> Result<Vec<BucketCount>> {
    let mut counts = Vec::new();
    for part in list_part_files(dir)? {
        for record in RecordReader::open(&part)? {
            counts.push(BucketCount::decode(&record?)?);
        }
    }
    Ok(counts)
}

/// Dense per-bucket id ranges
///
/// Immutable once built. `offsets[0] == 0`, `offsets[B] == total`, and the
/// sequence never decreases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    offsets: Vec<u64>,
}

impl OffsetTable {
    /// Wrap a precomputed offset sequence after checking its invariants
    pub fn from_offsets(offsets: Vec<u64>) -> Result<Self> {
        if offsets.len() < 2 {
            return Err(NumberError::Corruption(format!(
                "offset table needs at least 2 entries, got {}",
                offsets.len()
            )));
        }
        if offsets[0] != 0 {
            return Err(NumberError::Corruption(format!(
                "offset table must start at 0, starts at {}",
                offsets[0]
            )));
        }
        if u32::try_from(offsets.len() - 1).is_err() {
            return Err(NumberError::Corruption(format!(
                "offset table too long: {} entries",
                offsets.len()
            )));
        }
        if let Some(b) = offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(NumberError::Corruption(format!(
                "offset table decreases at bucket {}: {} > {}",
                b,
                offsets[b],
                offsets[b + 1]
            )));
        }
        Ok(Self { offsets })
    }

    /// Number of buckets (B)
    pub fn bucket_count(&self) -> u32 {
        (self.offsets.len() - 1) as u32
    }

    /// Total record count (`offsets[B]`)
    pub fn total(&self) -> u64 {
        self.offsets[self.offsets.len() - 1]
    }

    /// Id range `[start, end)` owned by a bucket
    pub fn range(&self, bucket: Bucket) -> Option<(u64, u64)> {
        let b = bucket as usize;
        if b + 1 >= self.offsets.len() {
            return None;
        }
        Some((self.offsets[b], self.offsets[b + 1]))
    }

    /// Records in a bucket (0 for empty or unknown buckets)
    pub fn count(&self, bucket: Bucket) -> u64 {
        self.range(bucket).map(|(s, e)| e - s).unwrap_or(0)
    }

    /// Number of buckets holding at least one record
    pub fn nonempty_buckets(&self) -> usize {
        self.offsets.windows(2).filter(|w| w[1] > w[0]).count()
    }

    /// All `B+1` offsets
    pub fn as_slice(&self) -> &[u64] {
        &self.offsets
    }
}
