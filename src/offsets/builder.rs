//! Offset Table Builder
//!
//! Single-threaded prefix sum over ascending bucket counts.

use crate::error::{NumberError, Result};
use crate::partition::Bucket;

use super::{BucketCount, OffsetTable};

/// Fold state: offsets emitted so far, last bucket seen, running total
struct Scan {
    offsets: Vec<u64>,
    previous: Option<Bucket>,
    running: u64,
}

/// Build the offset table for `bucket_count` buckets
///
/// `counts` must list nonempty buckets in strictly ascending order. Gaps are
/// filled with zero-width ranges. A bucket outside `[0, bucket_count)` fails
/// with `Range`; a repeated or descending bucket fails with `Sequencing`.
pub fn build_offsets<I>(bucket_count: u32, counts: I) -> Result<OffsetTable>
where
    I: IntoIterator<Item = BucketCount>,
{
    if bucket_count == 0 {
        return Err(NumberError::Config("bucket_count must be at least 1".into()));
    }

    let initial = Scan {
        offsets: Vec::with_capacity(bucket_count as usize + 1),
        previous: None,
        running: 0,
    };

    let mut scan = counts.into_iter().try_fold(initial, |mut scan, bc| {
        if bc.bucket >= bucket_count {
            return Err(NumberError::Range {
                bucket: bc.bucket as u64,
                bucket_count,
            });
        }
        if let Some(previous) = scan.previous {
            if bc.bucket <= previous {
                return Err(NumberError::Sequencing {
                    previous,
                    bucket: bc.bucket,
                });
            }
        }

        // Buckets up to and including this one start at the running total
        scan.offsets.resize(bc.bucket as usize + 1, scan.running);
        scan.running = scan
            .running
            .checked_add(bc.count)
            .ok_or(NumberError::Overflow(u64::MAX))?;
        scan.previous = Some(bc.bucket);
        Ok(scan)
    })?;

    // Trailing empty buckets plus offset[B] = total
    scan.offsets.resize(bucket_count as usize + 1, scan.running);

    tracing::debug!(
        "Built offset table: {} buckets, {} records",
        bucket_count,
        scan.running
    );

    OffsetTable::from_offsets(scan.offsets)
}
