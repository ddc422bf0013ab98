//! Output verification
//!
//! Re-reads a numbered output and checks the ids are exactly `0..total`.

use std::path::Path;

use crate::error::{NumberError, Result};
use crate::record::{list_part_files, RecordReader};

use super::{decode_id, read_size_sidecar};

/// What a successful verification saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Ids checked
    pub total: u64,
    /// Part files read
    pub part_files: usize,
    /// Whether a `<output>.size` sidecar was found and matched
    pub sidecar_checked: bool,
}

/// Check a record-format output directory
///
/// Raw output carries no framing to recover ids from and is rejected with an
/// `Argument` error.
///
/// Partitions hold ascending, contiguous bucket ranges and each bucket's ids
/// are consecutive, so reading part files in partition order must yield
/// `0, 1, 2, ...` with no gap or repeat.
pub fn verify_output(output: &Path) -> Result<VerifyReport> {
    if !output.is_dir() {
        return Err(NumberError::Argument(format!(
            "not an output directory: {}",
            output.display()
        )));
    }

    let parts = list_part_files(output)?;
    for part in &parts {
        if !RecordReader::has_header(part)? {
            return Err(NumberError::Argument(format!(
                "{} is not a record file; verify needs output written without --raw",
                part.display()
            )));
        }
    }

    let mut next_id = 0u64;

    for part in &parts {
        for (index, record) in RecordReader::open(part)?.enumerate() {
            let record = record?;
            let id = decode_id(&record.key).ok_or_else(|| {
                NumberError::Verification(format!(
                    "{} entry {}: key is {} bytes, not an id",
                    part.display(),
                    index,
                    record.key.len()
                ))
            })?;
            if id != next_id {
                return Err(NumberError::Verification(format!(
                    "{} entry {}: expected id {}, found {}",
                    part.display(),
                    index,
                    next_id,
                    id
                )));
            }
            next_id += 1;
        }
    }

    let sidecar = read_size_sidecar(output)?;
    if let Some(expected) = sidecar {
        if expected != next_id {
            return Err(NumberError::Verification(format!(
                "size sidecar says {} records, output holds {}",
                expected, next_id
            )));
        }
    }

    tracing::debug!(
        "Verified {}: {} ids across {} part file(s)",
        output.display(),
        next_id,
        parts.len()
    );

    Ok(VerifyReport {
        total: next_id,
        part_files: parts.len(),
        sidecar_checked: sidecar.is_some(),
    })
}
