//! Pass 1: bucket counting

use crate::error::Result;
use crate::exec::Job;
use crate::offsets::BucketCount;
use crate::partition::{Bucket, PrefixBucketer, Repartitioner};
use crate::record::{Record, RecordSink};

/// Counts records per bucket
///
/// `map` emits `(bucket, 1)`; combine and reduce both sum. The job has no
/// side effects outside its output, so any task can be re-run.
#[derive(Debug, Clone)]
pub struct CountJob {
    bucketer: PrefixBucketer,
}

impl CountJob {
    pub const NAME: &'static str = "number.count";

    pub fn new(bucketer: PrefixBucketer) -> Self {
        Self { bucketer }
    }
}

impl Job for CountJob {
    type Key = Bucket;
    type Value = u64;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn map(&self, record: Record, emit: &mut dyn FnMut(Bucket, u64)) -> Result<()> {
        emit(self.bucketer.bucket(&record.key), 1);
        Ok(())
    }

    fn partition(&self, key: &Bucket, num_partitions: usize) -> usize {
        Repartitioner::route(*key, num_partitions, self.bucketer.bucket_count())
    }

    fn combine(&self, _key: &Bucket, values: Vec<u64>) -> Vec<u64> {
        vec![values.iter().sum()]
    }

    fn reduce(&self, key: Bucket, values: Vec<u64>, out: &mut dyn RecordSink) -> Result<()> {
        let count: u64 = values.iter().sum();
        out.append(
            &BucketCount::encode_key(key),
            &BucketCount::encode_value(count),
        )
    }
}
