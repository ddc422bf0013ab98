//! Record File Module
//!
//! Sequential key/value files read and written by both passes.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (6 bytes)                                        │
//! │   Magic: "DNID" (4) | Version: u16 (2)                  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry ...                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (12 bytes)                                       │
//! │   EntryCount: u64 (8) | DataCRC: u32 (4)                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. The CRC covers every byte of the data block.
//! Readers stream entries and check count and CRC once the data block ends.

mod files;
mod reader;
mod writer;

use bytes::Bytes;

pub(crate) use files::write_atomic;
pub use files::{list_input_files, list_part_files, parse_part_index, part_file_name};
pub use reader::RecordReader;
pub use writer::{RawWriter, RecordSink, RecordWriter};

// =============================================================================
// Shared Constants (used by writer and reader)
// =============================================================================

/// Magic bytes identifying a record file
pub(crate) const MAGIC: &[u8; 4] = b"DNID";

/// Current record file format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) = 6 bytes
pub(crate) const HEADER_SIZE: u64 = 6;

/// Footer size: EntryCount (8) + DataCRC (4) = 12 bytes
pub(crate) const FOOTER_SIZE: u64 = 12;

/// Per-entry framing: KeyLen (4) + ValLen (4)
pub(crate) const ENTRY_HEADER_SIZE: u64 = 8;

// =============================================================================
// Record
// =============================================================================

/// An opaque key/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
