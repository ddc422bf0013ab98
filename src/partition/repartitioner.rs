//! Repartitioner
//!
//! Range partitioning of buckets onto reduce workers.

use std::ops::Range;

use super::Bucket;

/// Routes a bucket to a reduce partition
///
/// `worker_index(b) = floor(b * N / B)`. The mapping is monotone, so reduce
/// partition `p` holds a contiguous bucket range and concatenating partition
/// outputs in index order yields ascending buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repartitioner {
    bucket_count: u32,
    num_partitions: usize,
}

impl Repartitioner {
    pub fn new(bucket_count: u32, num_partitions: usize) -> Self {
        Self {
            bucket_count,
            num_partitions,
        }
    }

    /// Reduce partition for a bucket
    #[inline]
    pub fn worker_index(&self, bucket: Bucket) -> usize {
        Self::route(bucket, self.num_partitions, self.bucket_count)
    }

    /// `floor(bucket * num_partitions / bucket_count)` in 64-bit arithmetic
    #[inline]
    pub fn route(bucket: Bucket, num_partitions: usize, bucket_count: u32) -> usize {
        ((bucket as u64 * num_partitions as u64) / bucket_count as u64) as usize
    }

    /// Buckets routed to `partition`, as a contiguous range
    ///
    /// `route(b) >= p` exactly when `b * N >= p * B`, so the range starts at
    /// `ceil(p * B / N)`. Empty when the partition receives no bucket.
    pub fn buckets_for(&self, partition: usize) -> Range<Bucket> {
        let first = |p: u64| -> Bucket {
            let n = self.num_partitions as u64;
            let b = self.bucket_count as u64;
            ((p * b).div_ceil(n)).min(b) as Bucket
        };
        first(partition as u64)..first(partition as u64 + 1)
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }
}
