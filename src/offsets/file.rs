//! Offset table persistence
//!
//! Fixed big-endian i32 encoding, atomic replace on write.

use std::fs;
use std::path::Path;

use crate::error::{NumberError, Result};
use crate::record::write_atomic;

use super::OffsetTable;

/// Width of one persisted offset
const ENTRY_SIZE: usize = 4;

impl OffsetTable {
    /// Largest total representable in the table file and in 4-byte ids
    pub const MAX_TOTAL: u64 = i32::MAX as u64;

    /// Encode as `B+1` big-endian i32 values
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.total() > Self::MAX_TOTAL {
            return Err(NumberError::Overflow(self.total()));
        }
        let mut bytes = Vec::with_capacity(self.offsets.len() * ENTRY_SIZE);
        for &offset in &self.offsets {
            bytes.extend_from_slice(&(offset as i32).to_be_bytes());
        }
        Ok(bytes)
    }

    /// Decode a table, inferring B from the byte length
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % ENTRY_SIZE != 0 || bytes.len() < 2 * ENTRY_SIZE {
            return Err(NumberError::Corruption(format!(
                "offset table length {} is not a multiple of {} covering at least one bucket",
                bytes.len(),
                ENTRY_SIZE
            )));
        }

        let offsets = bytes
            .chunks_exact(ENTRY_SIZE)
            .map(|chunk| {
                let value = i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                u64::try_from(value)
                    .map_err(|_| NumberError::Corruption(format!("negative offset {}", value)))
            })
            .collect::<Result<Vec<u64>>>()?;

        Self::from_offsets(offsets)
    }

    /// Write the table atomically: temporary sibling, fsync, rename
    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.encode()?)?;

        tracing::debug!(
            "Wrote offset table ({} buckets) to {}",
            self.bucket_count(),
            path.display()
        );
        Ok(())
    }

    /// Load a table written by `write_to`
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes).map_err(|e| match e {
            NumberError::Corruption(msg) => {
                NumberError::Corruption(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }
}
