//! Deciding what to convert.
//!
//! Row groups are compared against the output tree ([`DiffResult`]) and turned
//! into per-row job lists ([`JobPlan`]).

mod diff;
mod jobs;

pub use diff::{
    canonical_id, canonical_ids, orphaned_ids, pending_ids, restrict_to_pending,
    symmetric_difference, DiffResult, ExistingOutputs,
};
pub use jobs::{ConversionJob, JobPlan};
