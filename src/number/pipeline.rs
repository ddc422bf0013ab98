//! Numbering pipeline
//!
//! Coordinates both passes and the sequential offset barrier between them.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{NumberError, Result};
use crate::exec::{BatchExecutor, JobReport, JobSpec, LocalExecutor};
use crate::offsets::{build_offsets, read_bucket_counts, OffsetTable};
use crate::partition::PrefixBucketer;
use crate::record::{list_input_files, write_atomic};

use super::{AssignJob, CountJob};

/// Outcome of a full numbering run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Records numbered; ids are `0..total`
    pub total: u64,
    /// Buckets that received at least one record
    pub nonempty_buckets: usize,
    /// Pass 1 statistics
    pub count_report: JobReport,
    /// Pass 2 statistics
    pub assign_report: JobReport,
}

/// `<output>.size`, the sidecar holding the record total
pub fn size_sidecar_path(output: &Path) -> PathBuf {
    // Normalizes away a trailing separator
    let mut name = OsString::from(output.components().as_path().as_os_str());
    name.push(".size");
    PathBuf::from(name)
}

/// Read the record total from an output's size sidecar, if present
pub fn read_size_sidecar(output: &Path) -> Result<Option<u64>> {
    let path = size_sidecar_path(output);
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    text.trim().parse().map(Some).map_err(|_| {
        NumberError::Corruption(format!(
            "{}: not a record count: {:?}",
            path.display(),
            text.trim()
        ))
    })
}

/// Runs the two-pass numbering pipeline on a batch executor
///
/// ## Stages
/// 1. Count records per bucket (distributed)
/// 2. Build and persist the offset table (this thread, must finish first)
/// 3. Assign ids (distributed), each reducer checking its bucket ranges
/// 4. Write `<output>.size`
pub struct Numberer<E: BatchExecutor = LocalExecutor> {
    config: Config,
    executor: E,
    bucketer: PrefixBucketer,
}

impl Numberer<LocalExecutor> {
    /// Pipeline running on the in-process executor
    pub fn new(config: Config) -> Result<Self> {
        let executor = LocalExecutor::from_config(&config);
        Self::with_executor(config, executor)
    }
}

impl<E: BatchExecutor> Numberer<E> {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const STAGE1_DIR: &'static str = "number.stage1";
    const STAGE2_FILE: &'static str = "number.stage2";

    /// Pipeline running on a caller-supplied executor
    pub fn with_executor(config: Config, executor: E) -> Result<Self> {
        config.validate()?;
        let bucketer = PrefixBucketer::new(config.bucket_count)?;
        Ok(Self {
            config,
            executor,
            bucketer,
        })
    }

    /// Run every stage from `input` to `output`
    pub fn run(&self, input: &Path, output: &Path) -> Result<RunSummary> {
        let inputs = list_input_files(input)?;
        if output.exists() {
            return Err(NumberError::Argument(format!(
                "output already exists: {}",
                output.display()
            )));
        }
        let sidecar = size_sidecar_path(output);
        if sidecar.exists() {
            return Err(NumberError::Argument(format!(
                "size file already exists: {}",
                sidecar.display()
            )));
        }

        tracing::info!(
            "Numbering {} input file(s) from {} into {} ({} buckets, {} partitions)",
            inputs.len(),
            input.display(),
            output.display(),
            self.config.bucket_count,
            self.config.num_partitions
        );

        let created_temp_dir = !self.config.temp_dir.exists();
        fs::create_dir_all(&self.config.temp_dir)?;
        self.clear_intermediate()?;

        let result = self.run_stages(&inputs, output);
        if let Err(e) = self.clear_intermediate() {
            tracing::warn!("Failed to remove intermediate files: {}", e);
        }
        if created_temp_dir {
            let _ = fs::remove_dir(&self.config.temp_dir);
        }

        result
    }

    fn run_stages(&self, inputs: &[PathBuf], output: &Path) -> Result<RunSummary> {
        let stage1 = self.stage1_dir();
        let table_path = self.table_path();

        tracing::info!("Stage 1: counting records per bucket");
        let count_report = self.count_buckets(inputs, &stage1)?;

        tracing::info!("Stage 2: building offset table");
        let table = self.build_offset_table(&stage1)?;
        table.write_to(&table_path)?;
        let total = table.total();
        tracing::info!(
            "Offset table ready: {} records in {} nonempty bucket(s)",
            total,
            table.nonempty_buckets()
        );

        tracing::info!("Stage 3: assigning ids");
        let assign_report = self.assign_ids(inputs, &table_path, output)?;

        write_atomic(&size_sidecar_path(output), format!("{}\n", total).as_bytes())?;

        Ok(RunSummary {
            total,
            nonempty_buckets: table.nonempty_buckets(),
            count_report,
            assign_report,
        })
    }

    // =========================================================================
    // Individual Stages
    // =========================================================================

    /// Pass 1: write per-bucket counts into `counts_dir`
    pub fn count_buckets(&self, inputs: &[PathBuf], counts_dir: &Path) -> Result<JobReport> {
        let job = CountJob::new(self.bucketer);
        let spec = JobSpec::new(inputs.to_vec(), counts_dir, self.config.num_partitions);
        self.executor.execute(&job, &spec)
    }

    /// Sequential barrier: fold pass 1 output into the offset table
    pub fn build_offset_table(&self, counts_dir: &Path) -> Result<OffsetTable> {
        let counts = read_bucket_counts(counts_dir)?;
        build_offsets(self.bucketer.bucket_count(), counts)
    }

    /// Pass 2: number every record using the table at `table_path`
    pub fn assign_ids(&self, inputs: &[PathBuf], table_path: &Path, output: &Path) -> Result<JobReport> {
        let job = AssignJob::new(self.bucketer, Some(table_path.to_path_buf()));
        let spec = JobSpec::new(inputs.to_vec(), output, self.config.num_partitions)
            .with_output_format(self.config.output_format);
        self.executor.execute(&job, &spec)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Directory holding pass 1 output
    pub fn stage1_dir(&self) -> PathBuf {
        self.config.temp_dir.join(Self::STAGE1_DIR)
    }

    /// Location of the persisted offset table
    pub fn table_path(&self) -> PathBuf {
        self.config.temp_dir.join(Self::STAGE2_FILE)
    }

    pub fn bucketer(&self) -> &PrefixBucketer {
        &self.bucketer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn clear_intermediate(&self) -> Result<()> {
        let stage1 = self.stage1_dir();
        if stage1.exists() {
            fs::remove_dir_all(&stage1)?;
        }
        let table_path = self.table_path();
        if table_path.exists() {
            fs::remove_file(&table_path)?;
        }
        Ok(())
    }
}
