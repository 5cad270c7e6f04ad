//! Run summary types and helpers.

mod failure;
mod report;
mod run_summary;

pub use failure::{failure_channel, EntityFailure, EntityKind, FailureLog, FailureSink};
pub use report::RepositoryReport;
pub use run_summary::RunSummary;
