//! Run summary types.

use super::{EntityFailure, RepositoryReport};
use crate::import::ImportOutcome;
use crate::wiki::WikiOutcome;

/// Summary of a complete run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Whether the destination was the in-memory fake.
    pub dry_run: bool,

    /// Source repositories listed.
    pub repositories_discovered: usize,

    /// Forks, empty repositories, and repositories not processed for the scope.
    pub repositories_skipped: usize,

    pub repositories_created: usize,
    pub imports_started: usize,
    pub imports_completed: usize,

    /// Imports still running when polling gave up.
    pub imports_incomplete: usize,

    /// Imports whose polling was stopped by cancellation.
    pub imports_cancelled: usize,

    pub labels_created: usize,
    pub issues_created: usize,
    pub comments_created: usize,
    pub wikis_transferred: usize,

    /// Every failure recorded during the run.
    pub failures: Vec<EntityFailure>,

    /// Dispatch was stopped by a cancellation request.
    pub cancelled: bool,
}

impl RunSummary {
    /// Creates a new empty summary.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Adds a repository's report to the totals.
    pub fn record_report(&mut self, report: &RepositoryReport) {
        if report.skipped {
            self.repositories_skipped += 1;
        }
        if report.created {
            self.repositories_created += 1;
        }
        if report.import_started {
            self.imports_started += 1;
        }
        self.labels_created += report.labels_created;
        self.issues_created += report.issues_created;
        self.comments_created += report.comments_created;
        if matches!(report.wiki, Some(WikiOutcome::Transferred)) {
            self.wikis_transferred += 1;
        }
    }

    /// Adds an import tracker's outcome to the totals.
    pub fn record_import(&mut self, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Complete { .. } => self.imports_completed += 1,
            ImportOutcome::Exhausted { .. } => self.imports_incomplete += 1,
            ImportOutcome::Cancelled => self.imports_cancelled += 1,
            ImportOutcome::Failed { .. } => {}
        }
    }

    /// Returns true if any failures occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Returns true if every operation succeeded.
    #[must_use]
    pub fn all_success(&self) -> bool {
        self.failures.is_empty()
    }
}
