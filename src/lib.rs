//! # denseid
//!
//! Dense, prefix-ordered sequential ids for large key-value record sets:
//! - Key-prefix bucketing with a deterministic range repartitioner
//! - Distributed per-bucket counting (pass 1)
//! - Sequential prefix sum into a persisted offset table
//! - Distributed id assignment with per-bucket range checks (pass 2)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Numberer                              │
//! │             (coordinates stages, owns barrier)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌─────────────┐
//!   │  CountJob   │ │ OffsetTable │   │  AssignJob  │
//!   │  (pass 1)   │─▶  (prefix    │──▶│  (pass 2)   │
//!   └──────┬──────┘ │    sum)     │   └──────┬──────┘
//!          │        └─────────────┘          │
//!          ▼                                 ▼
//!   ┌─────────────────────────────────────────────┐
//!   │        BatchExecutor (LocalExecutor)         │
//!   │   map ─► combine ─► shuffle ─► reduce        │
//!   └──────────────────────┬──────────────────────┘
//!                          │
//!                          ▼
//!                   ┌─────────────┐
//!                   │ Record files│
//!                   └─────────────┘
//! ```
//!
//! Both passes route records through the same [`partition::PrefixBucketer`]
//! and [`partition::Repartitioner`]; the offset table is only valid for the
//! mapping that produced it.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod partition;
pub mod record;
pub mod offsets;
pub mod exec;
pub mod number;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{NumberError, Result};
pub use config::{Config, OutputFormat};
pub use number::{Numberer, RunSummary};
pub use offsets::OffsetTable;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of denseid
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
