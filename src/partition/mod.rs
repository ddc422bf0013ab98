//! Partition Module
//!
//! Deterministic routing of records to buckets and of buckets to workers.
//!
//! ## Responsibilities
//! - Map a record key to a bucket in `[0, B)` from its leading bytes
//! - Map a bucket to a reduce partition in `[0, N)`, monotone in the bucket
//!
//! Both functions must be byte-identical between the counting pass and the
//! assignment pass. The offset table is only valid for the mapping that
//! produced it.
//!
//! ## Routing
//! ```text
//!   key ──► first w bytes (big-endian, zero padded) mod B ──► bucket
//!   bucket ──► floor(bucket * N / B) ──► reduce partition
//! ```

mod bucketer;
mod repartitioner;

pub use bucketer::{Bucket, PrefixBucketer};
pub use repartitioner::Repartitioner;
