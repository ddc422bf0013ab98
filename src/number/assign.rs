//! Pass 2: id assignment

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{NumberError, Result};
use crate::exec::Job;
use crate::offsets::OffsetTable;
use crate::partition::{Bucket, PrefixBucketer, Repartitioner};
use crate::record::{Record, RecordSink};

/// Width in bytes of an encoded id
pub const ID_WIDTH: usize = 4;

/// Encode an id as 4 big-endian bytes
pub fn encode_id(id: u64) -> Result<[u8; ID_WIDTH]> {
    if id >= OffsetTable::MAX_TOTAL {
        return Err(NumberError::Overflow(id));
    }
    Ok((id as u32).to_be_bytes())
}

/// Decode a 4-byte big-endian id
pub fn decode_id(bytes: &[u8]) -> Option<u64> {
    let id: [u8; ID_WIDTH] = bytes.try_into().ok()?;
    Some(u32::from_be_bytes(id) as u64)
}

/// Output record encoding: id bytes immediately followed by the value
pub fn encode_assigned(id: u64, value: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(ID_WIDTH + value.len());
    out.extend_from_slice(&encode_id(id)?);
    out.extend_from_slice(value);
    Ok(out)
}

/// Assigns each record `offset[bucket] + position within the bucket`
///
/// The offset table is loaded at most once per job and shared read-only by
/// every reduce task. Each reduce invocation owns its own cursor.
pub struct AssignJob {
    bucketer: PrefixBucketer,
    table_path: Option<PathBuf>,
    table: OnceLock<Arc<OffsetTable>>,
    load_lock: Mutex<()>,
}

impl AssignJob {
    pub const NAME: &'static str = "number.assign";

    /// Job that loads its offset table from `table_path` on first use
    pub fn new(bucketer: PrefixBucketer, table_path: Option<PathBuf>) -> Self {
        Self {
            bucketer,
            table_path,
            table: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    /// Job with an offset table already in memory
    pub fn with_table(bucketer: PrefixBucketer, table: Arc<OffsetTable>) -> Self {
        let job = Self::new(bucketer, None);
        let _ = job.table.set(table);
        job
    }

    /// Shared offset table, loading it on first call
    fn table(&self) -> Result<Arc<OffsetTable>> {
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }

        let _guard = self.load_lock.lock();
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }

        let path = self.table_path.as_ref().ok_or_else(|| {
            NumberError::MissingConfiguration("offset table location not set".into())
        })?;
        let table = Arc::new(OffsetTable::read_from(path)?);

        if table.bucket_count() != self.bucketer.bucket_count() {
            return Err(NumberError::Config(format!(
                "offset table at {} has {} buckets, bucketer uses {}",
                path.display(),
                table.bucket_count(),
                self.bucketer.bucket_count()
            )));
        }

        tracing::debug!(
            "Loaded offset table from {}: {} buckets, {} records",
            path.display(),
            table.bucket_count(),
            table.total()
        );

        let _ = self.table.set(Arc::clone(&table));
        Ok(table)
    }
}

impl Job for AssignJob {
    type Key = Bucket;
    type Value = Bytes;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn map(&self, record: Record, emit: &mut dyn FnMut(Bucket, Bytes)) -> Result<()> {
        emit(self.bucketer.bucket(&record.key), record.value);
        Ok(())
    }

    fn partition(&self, key: &Bucket, num_partitions: usize) -> usize {
        Repartitioner::route(*key, num_partitions, self.bucketer.bucket_count())
    }

    fn setup(&self) -> Result<()> {
        self.table().map(|_| ())
    }

    fn reduce(&self, key: Bucket, values: Vec<Bytes>, out: &mut dyn RecordSink) -> Result<()> {
        let table = self.table()?;
        let (start, end) = table.range(key).ok_or(NumberError::Range {
            bucket: key as u64,
            bucket_count: table.bucket_count(),
        })?;

        let mut cursor = start;
        for value in &values {
            // Past the end means the bucket is over-full; keep counting, never emit
            if cursor < end {
                out.append(&encode_id(cursor)?, value)?;
            }
            cursor += 1;
        }

        if cursor != end {
            return Err(NumberError::CountMismatch {
                bucket: key,
                expected: end,
                actual: cursor,
            });
        }
        Ok(())
    }

    /// Every counted bucket owned by this partition must have been reduced
    ///
    /// A bucket with no records in this pass never reaches `reduce`, so its
    /// id range would otherwise be left unfilled without an error.
    fn finish(&self, partition: usize, num_partitions: usize, reduced: &[Bucket]) -> Result<()> {
        let table = self.table()?;
        let owned = Repartitioner::new(table.bucket_count(), num_partitions).buckets_for(partition);

        for bucket in owned {
            if reduced.binary_search(&bucket).is_ok() {
                continue;
            }
            if let Some((start, end)) = table.range(bucket) {
                if end > start {
                    return Err(NumberError::CountMismatch {
                        bucket,
                        expected: end,
                        actual: start,
                    });
                }
            }
        }
        Ok(())
    }
}
