//! Batch Execution Module
//!
//! The map/reduce capability both numbering passes run on.
//!
//! ## Responsibilities
//! - Define what a job supplies: map, partition, optional combine, reduce
//! - Define what an executor provides: run a job over input files into an
//!   output directory of `part-NNNNN` files, retrying transient task failures
//! - Provide an in-process executor backed by a thread pool
//!
//! ## Job Lifecycle
//! ```text
//!   inputs ──► map tasks (one per file) ──► combine ──► shuffle by partition
//!                                                          │
//!                                     sort by key, group ◄─┘
//!                                              │
//!                                              ▼
//!      reduce tasks (one per partition) ──► _temporary/part-N.attempt-K
//!                                   finish ──► │ rename on success
//!                                              ▼
//!                                  part-N + _SUCCESS (job report)
//! ```
//!
//! Every task is a pure function of its input and can be re-run from
//! scratch. A failed job leaves no output directory behind.

mod local;
mod report;

use std::path::PathBuf;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::record::{Record, RecordSink};

pub use local::LocalExecutor;
pub use report::JobReport;

/// A map/reduce job
///
/// Keys are grouped and delivered to `reduce` in ascending order within each
/// partition. Values for one key arrive in map-task order, then emission
/// order, but jobs must not rely on that.
pub trait Job: Send + Sync {
    type Key: Ord + Clone + Send + Sync;
    type Value: Clone + Send + Sync;

    /// Name used in logs, errors and the job report
    fn name(&self) -> &str;

    /// Transform one input record into zero or more intermediate pairs
    fn map(&self, record: Record, emit: &mut dyn FnMut(Self::Key, Self::Value)) -> Result<()>;

    /// Reduce partition for an intermediate key, in `[0, num_partitions)`
    fn partition(&self, key: &Self::Key, num_partitions: usize) -> usize;

    /// Map-side pre-aggregation of one key's values; identity by default
    fn combine(&self, _key: &Self::Key, values: Vec<Self::Value>) -> Vec<Self::Value> {
        values
    }

    /// Called at the start of every reduce task
    fn setup(&self) -> Result<()> {
        Ok(())
    }

    /// Consume all values of one key and write output pairs
    fn reduce(
        &self,
        key: Self::Key,
        values: Vec<Self::Value>,
        out: &mut dyn RecordSink,
    ) -> Result<()>;

    /// Called once a reduce task has reduced every key of its partition
    ///
    /// `reduced` holds those keys in ascending order, possibly none. An error
    /// fails the task and discards its output.
    fn finish(
        &self,
        _partition: usize,
        _num_partitions: usize,
        _reduced: &[Self::Key],
    ) -> Result<()> {
        Ok(())
    }
}

/// Where a job reads, where it writes, and how wide it runs
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Input record files; one map task each
    pub inputs: Vec<PathBuf>,
    /// Output directory; must not exist yet
    pub output_dir: PathBuf,
    /// Number of reduce partitions
    pub num_partitions: usize,
    /// Layout of the part files
    pub output_format: OutputFormat,
}

impl JobSpec {
    pub fn new(inputs: Vec<PathBuf>, output_dir: impl Into<PathBuf>, num_partitions: usize) -> Self {
        Self {
            inputs,
            output_dir: output_dir.into(),
            num_partitions,
            output_format: OutputFormat::Records,
        }
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}

/// A service that runs map/reduce jobs to completion
pub trait BatchExecutor {
    /// Run `job` as described by `spec`, blocking until it finishes
    ///
    /// On success the output directory holds one part file per partition and
    /// a `_SUCCESS` marker. On failure the output directory is removed and
    /// the first fatal task error is returned.
    fn execute<J: Job>(&self, job: &J, spec: &JobSpec) -> Result<JobReport>;
}
