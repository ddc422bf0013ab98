//! Job reports
//!
//! Statistics of a finished job, persisted as the `_SUCCESS` marker.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Statistics of one completed job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// Job name
    pub job: String,
    /// Map tasks run (one per input file)
    pub map_tasks: usize,
    /// Reduce tasks run (one per partition)
    pub reduce_tasks: usize,
    /// Records read by map tasks
    pub input_records: u64,
    /// Intermediate pairs after combining
    pub map_output_records: u64,
    /// Pairs written by reduce tasks
    pub output_records: u64,
    /// Task attempts that failed transiently and were re-run
    pub retried_attempts: u32,
}

impl JobReport {
    /// Marker file name written into a successful job's output directory
    pub const MARKER: &'static str = "_SUCCESS";

    /// Write the marker (bincode-encoded report) into `dir`
    pub fn write_marker(&self, dir: &Path) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        fs::write(dir.join(Self::MARKER), bytes)?;
        Ok(())
    }

    /// Read the marker of a completed job
    pub fn read_marker(dir: &Path) -> Result<Self> {
        let bytes = fs::read(dir.join(Self::MARKER))?;
        Ok(bincode::deserialize(&bytes)?)
    }
}
