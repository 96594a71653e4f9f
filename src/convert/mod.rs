//! Running conversions.
//!
//! [`ConversionEngine`] converts a single tile through a codec.
//! [`Dispatcher`] runs a [`JobPlan`](crate::plan::JobPlan) row by row on a
//! bounded worker pool, waiting for every job of a row before the next row
//! starts, and folds the outcomes into a [`RunSummary`].

mod dispatcher;
mod engine;
mod summary;

pub use dispatcher::Dispatcher;
pub use engine::ConversionEngine;
pub use summary::{FailureRecord, RunSummary, TileOutcome};
