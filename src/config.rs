//! Configuration for denseid
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{NumberError, Result};

/// Main configuration for a numbering run
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Bucketing Configuration
    // -------------------------------------------------------------------------
    /// Number of key-prefix buckets (B). The offset table has B+1 entries.
    pub bucket_count: u32,

    // -------------------------------------------------------------------------
    // Execution Configuration
    // -------------------------------------------------------------------------
    /// Number of reduce partitions (N) used by both passes
    pub num_partitions: usize,

    /// Worker threads used by the local executor
    pub worker_threads: usize,

    /// Attempts per task before the job fails (transient errors only)
    pub max_task_attempts: u32,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Scratch directory for intermediate state
    /// Internal structure:
    ///   {temp_dir}/
    ///     ├── number.stage1/   (pass 1 bucket counts)
    ///     └── number.stage2    (offset table)
    pub temp_dir: PathBuf,

    /// Layout of the numbered output files
    pub output_format: OutputFormat,
}

/// Layout of pass 2 output part files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Framed record files: key = 4-byte id, value = original value
    Records,

    /// Id bytes immediately followed by value bytes, no framing
    Raw,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_count: 1024,
            num_partitions: 1000,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_task_attempts: 2,
            temp_dir: PathBuf::from("_tmp"),
            output_format: OutputFormat::Records,
        }
    }
}

impl Config {
    /// Largest accepted bucket count; the offset table is held in memory
    pub const MAX_BUCKET_COUNT: u32 = 1 << 24;

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings no run can succeed with
    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(NumberError::Config("bucket_count must be at least 1".into()));
        }
        if self.bucket_count > Self::MAX_BUCKET_COUNT {
            return Err(NumberError::Config(format!(
                "bucket_count {} exceeds the maximum of {}",
                self.bucket_count,
                Self::MAX_BUCKET_COUNT
            )));
        }
        if self.num_partitions == 0 {
            return Err(NumberError::Config("num_partitions must be at least 1".into()));
        }
        if self.worker_threads == 0 {
            return Err(NumberError::Config("worker_threads must be at least 1".into()));
        }
        if self.max_task_attempts == 0 {
            return Err(NumberError::Config("max_task_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of key-prefix buckets
    pub fn bucket_count(mut self, count: u32) -> Self {
        self.config.bucket_count = count;
        self
    }

    /// Set the number of reduce partitions
    pub fn num_partitions(mut self, count: usize) -> Self {
        self.config.num_partitions = count;
        self
    }

    /// Set the number of local worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the per-task attempt limit
    pub fn max_task_attempts(mut self, attempts: u32) -> Self {
        self.config.max_task_attempts = attempts;
        self
    }

    /// Set the scratch directory
    pub fn temp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = path.into();
        self
    }

    /// Set the output layout
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
