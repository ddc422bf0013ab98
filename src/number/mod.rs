//! Number Module
//!
//! The two-pass numbering pipeline.
//!
//! ## Responsibilities
//! - Pass 1: count records per key-prefix bucket
//! - Sequential barrier: prefix-sum the counts into an offset table
//! - Pass 2: re-bucket every record and hand out consecutive ids from the
//!   bucket's offset, checking each bucket ends exactly on the next offset
//! - Verify a numbered output after the fact
//!
//! ## Flow
//! ```text
//!   records ──► CountJob ──► {temp}/number.stage1/part-*   (bucket, count)
//!                                      │
//!                         build_offsets (single thread)
//!                                      │
//!                                      ▼
//!                             {temp}/number.stage2          (B+1 offsets)
//!                                      │
//!   records ──► AssignJob ◄────────────┘
//!                  │
//!                  ▼
//!   {output}/part-*  (4-byte id, value)    {output}.size  (total)
//! ```

mod assign;
mod count;
mod pipeline;
mod verify;

pub use assign::{decode_id, encode_assigned, encode_id, AssignJob, ID_WIDTH};
pub use count::CountJob;
pub use pipeline::{read_size_sidecar, size_sidecar_path, Numberer, RunSummary};
pub use verify::{verify_output, VerifyReport};
