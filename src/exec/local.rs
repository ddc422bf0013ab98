//! Local Executor
//!
//! Runs map/reduce jobs on a pool of OS threads over local files.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crossbeam::channel;
use parking_lot::Mutex;

use crate::config::{Config, OutputFormat};
use crate::error::{NumberError, Result};
use crate::record::{part_file_name, RawWriter, RecordReader, RecordSink, RecordWriter};

use super::{BatchExecutor, Job, JobReport, JobSpec};

/// Scratch directory inside a job's output directory
const TEMP_DIR: &str = "_temporary";

/// Values buffered per key before the combiner runs
const COMBINE_BATCH: usize = 64;

/// One partition's intermediate data: key → values, sorted by key
type Partition<J> = BTreeMap<<J as Job>::Key, Vec<<J as Job>::Value>>;

/// Output of one map task
struct MapOutput<J: Job> {
    partitions: Vec<Partition<J>>,
    input_records: u64,
    output_records: u64,
}

/// In-process batch executor
///
/// ## Concurrency:
/// - Tasks are fed to `worker_threads` scoped threads through a crossbeam channel
/// - Results land in per-task slots behind a parking_lot Mutex
/// - The first fatal task error stops the remaining workers
///
/// Intermediate data is held in memory between the map and reduce phases.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    worker_threads: usize,
    max_task_attempts: u32,
}

impl LocalExecutor {
    pub fn new(worker_threads: usize, max_task_attempts: u32) -> Self {
        Self {
            worker_threads: worker_threads.max(1),
            max_task_attempts: max_task_attempts.max(1),
        }
    }

    /// Executor sized from a run configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.worker_threads, config.max_task_attempts)
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn max_task_attempts(&self) -> u32 {
        self.max_task_attempts
    }

    // =========================================================================
    // Task Pool
    // =========================================================================

    /// Run `count` tasks on the pool; results are returned in task order
    ///
    /// The task closure receives the task index and the 1-based attempt.
    fn run_tasks<T, F>(&self, job: &str, phase: &str, count: usize, task: F) -> Result<(Vec<T>, u32)>
    where
        T: Send,
        F: Fn(usize, u32) -> Result<T> + Sync,
    {
        if count == 0 {
            return Ok((Vec::new(), 0));
        }

        let (task_tx, task_rx) = channel::unbounded::<usize>();
        for index in 0..count {
            // Receiver is alive; send cannot fail
            let _ = task_tx.send(index);
        }
        drop(task_tx);

        let slots: Mutex<Vec<Option<T>>> = Mutex::new((0..count).map(|_| None).collect());
        let failure: Mutex<Option<NumberError>> = Mutex::new(None);
        let retries = AtomicU32::new(0);
        let abort = AtomicBool::new(false);

        std::thread::scope(|scope| {
            for _ in 0..self.worker_threads.min(count) {
                scope.spawn(|| {
                    while let Ok(index) = task_rx.recv() {
                        if abort.load(Ordering::Relaxed) {
                            break;
                        }
                        match self.run_attempts(job, phase, index, &task, &retries) {
                            Ok(value) => slots.lock()[index] = Some(value),
                            Err(e) => {
                                abort.store(true, Ordering::Relaxed);
                                failure.lock().get_or_insert(e);
                                break;
                            }
                        }
                    }
                });
            }
        });

        if let Some(e) = failure.into_inner() {
            return Err(e);
        }

        let results = slots
            .into_inner()
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    NumberError::Io(std::io::Error::other(format!(
                        "{} task {} of job '{}' produced no result",
                        phase, index, job
                    )))
                })
            })
            .collect::<Result<Vec<T>>>()?;

        Ok((results, retries.into_inner()))
    }

    /// Run one task, re-running it while it fails with a retryable error
    fn run_attempts<T, F>(
        &self,
        job: &str,
        phase: &str,
        index: usize,
        task: &F,
        retries: &AtomicU32,
    ) -> Result<T>
    where
        F: Fn(usize, u32) -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            match task(index, attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_task_attempts => {
                    tracing::warn!(
                        "Job '{}' {} task {} attempt {} failed, retrying: {}",
                        job,
                        phase,
                        index,
                        attempt,
                        e
                    );
                    retries.fetch_add(1, Ordering::Relaxed);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(NumberError::TaskFailed {
                        job: job.to_string(),
                        task: format!("{}-{:05}", phase, index),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    // =========================================================================
    // Phases
    // =========================================================================

    /// Map one input file into per-partition, combined intermediate data
    fn map_task<J: Job>(&self, job: &J, input: &Path, num_partitions: usize) -> Result<MapOutput<J>> {
        let mut partitions: Vec<Partition<J>> = (0..num_partitions).map(|_| BTreeMap::new()).collect();
        let mut input_records = 0u64;
        let mut misrouted: Option<usize> = None;

        for record in RecordReader::open(input)? {
            let record = record?;
            input_records += 1;

            job.map(record, &mut |key, value| {
                let p = job.partition(&key, num_partitions);
                let Some(partition) = partitions.get_mut(p) else {
                    misrouted.get_or_insert(p);
                    return;
                };
                match partition.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(vec![value]);
                    }
                    Entry::Occupied(mut slot) => {
                        slot.get_mut().push(value);
                        if slot.get().len() % COMBINE_BATCH == 0 {
                            let values = std::mem::take(slot.get_mut());
                            let combined = job.combine(slot.key(), values);
                            *slot.get_mut() = combined;
                        }
                    }
                }
            })?;

            if let Some(p) = misrouted {
                return Err(NumberError::Config(format!(
                    "job '{}' routed a key to partition {} of {}",
                    job.name(),
                    p,
                    num_partitions
                )));
            }
        }

        let mut output_records = 0u64;
        for partition in partitions.iter_mut() {
            for (key, values) in partition.iter_mut() {
                let combined = job.combine(key, std::mem::take(values));
                output_records += combined.len() as u64;
                *values = combined;
            }
        }

        tracing::debug!(
            "Job '{}' mapped {}: {} records in, {} pairs out",
            job.name(),
            input.display(),
            input_records,
            output_records
        );

        Ok(MapOutput {
            partitions,
            input_records,
            output_records,
        })
    }

    /// Reduce one partition into its part file
    ///
    /// Output goes to `_temporary/part-N.attempt-K` and is renamed into place
    /// only after every key reduced, `Job::finish` passed and the file synced.
    fn reduce_task<J: Job>(
        &self,
        job: &J,
        spec: &JobSpec,
        index: usize,
        attempt: u32,
        partition: &Partition<J>,
    ) -> Result<u64> {
        job.setup()?;

        let name = part_file_name(index);
        let temp_path = spec
            .output_dir
            .join(TEMP_DIR)
            .join(format!("{}.attempt-{}", name, attempt));
        let final_path = spec.output_dir.join(&name);

        let result = Self::write_partition(job, spec.output_format, &temp_path, partition)
            .and_then(|written| {
                let reduced: Vec<J::Key> = partition.keys().cloned().collect();
                job.finish(index, spec.num_partitions, &reduced)?;
                Ok(written)
            });
        let written = match result {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };

        fs::rename(&temp_path, &final_path)?;

        tracing::debug!(
            "Job '{}' reduced partition {}: {} keys, {} pairs written",
            job.name(),
            index,
            partition.len(),
            written
        );
        Ok(written)
    }

    fn write_partition<J: Job>(
        job: &J,
        format: OutputFormat,
        path: &Path,
        partition: &Partition<J>,
    ) -> Result<u64> {
        let mut sink: Box<dyn RecordSink> = match format {
            OutputFormat::Records => Box::new(RecordWriter::create(path)?),
            OutputFormat::Raw => Box::new(RawWriter::create(path)?),
        };

        for (key, values) in partition {
            job.reduce(key.clone(), values.clone(), sink.as_mut())?;
        }

        sink.finish()
    }

    fn execute_phases<J: Job>(&self, job: &J, spec: &JobSpec) -> Result<JobReport> {
        let name = job.name();
        let n = spec.num_partitions;

        // Map phase
        let (map_outputs, map_retries) = self.run_tasks(name, "map", spec.inputs.len(), |i, _| {
            self.map_task(job, &spec.inputs[i], n)
        })?;

        // Shuffle: concatenate map outputs per partition in map-task order
        let mut input_records = 0u64;
        let mut map_output_records = 0u64;
        let mut shuffled: Vec<Partition<J>> = (0..n).map(|_| BTreeMap::new()).collect();
        for output in map_outputs {
            input_records += output.input_records;
            map_output_records += output.output_records;
            for (target, partition) in shuffled.iter_mut().zip(output.partitions) {
                for (key, mut values) in partition {
                    target.entry(key).or_default().append(&mut values);
                }
            }
        }

        tracing::info!(
            "Job '{}' map phase done: {} tasks, {} records, {} intermediate pairs",
            name,
            spec.inputs.len(),
            input_records,
            map_output_records
        );

        // Reduce phase
        let (written, reduce_retries) = self.run_tasks(name, "reduce", n, |i, attempt| {
            self.reduce_task(job, spec, i, attempt, &shuffled[i])
        })?;

        Ok(JobReport {
            job: name.to_string(),
            map_tasks: spec.inputs.len(),
            reduce_tasks: n,
            input_records,
            map_output_records,
            output_records: written.iter().sum(),
            retried_attempts: map_retries + reduce_retries,
        })
    }
}

impl BatchExecutor for LocalExecutor {
    fn execute<J: Job>(&self, job: &J, spec: &JobSpec) -> Result<JobReport> {
        if spec.num_partitions == 0 {
            return Err(NumberError::Config("num_partitions must be at least 1".into()));
        }
        if spec.output_dir.exists() {
            return Err(NumberError::Argument(format!(
                "output directory already exists: {}",
                spec.output_dir.display()
            )));
        }

        tracing::info!(
            "Starting job '{}': {} input file(s), {} partition(s), {} worker(s)",
            job.name(),
            spec.inputs.len(),
            spec.num_partitions,
            self.worker_threads
        );

        fs::create_dir_all(spec.output_dir.join(TEMP_DIR))?;

        let report = self
            .execute_phases(job, spec)
            .and_then(|report| {
                fs::remove_dir_all(spec.output_dir.join(TEMP_DIR))?;
                report.write_marker(&spec.output_dir)?;
                Ok(report)
            });

        match report {
            Ok(report) => {
                tracing::info!(
                    "Job '{}' finished: {} records in, {} records out, {} retried attempt(s)",
                    report.job,
                    report.input_records,
                    report.output_records,
                    report.retried_attempts
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Job '{}' failed: {}", job.name(), e);
                let _ = fs::remove_dir_all(&spec.output_dir);
                Err(e)
            }
        }
    }
}
