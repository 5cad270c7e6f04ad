//! Tracks destination-side repository imports until they finish.
//!
//! A tracker polls [`GitProvider::get_import_progress`] on a bounded
//! exponential schedule. Running out of attempts is only a warning: the
//! import may still complete after the run ends.

mod policy;

pub use policy::ImportPolicy;

use crate::provider::{GitProvider, ImportStatus};
use crate::summary::{EntityKind, FailureSink};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Final state of one tracked import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The provider reported `complete`.
    Complete { attempts: u32 },
    /// The provider reported a terminal failure state.
    Failed { status: ImportStatus },
    /// Attempts ran out before completion.
    Exhausted { last_status: Option<ImportStatus> },
    /// The run was cancelled while polling.
    Cancelled,
}

/// Polls imports on the destination provider.
#[derive(Clone)]
pub struct ImportTracker {
    destination: Arc<dyn GitProvider>,
    policy: ImportPolicy,
    cancel: CancellationToken,
    failures: FailureSink,
}

impl ImportTracker {
    #[must_use]
    pub fn new(
        destination: Arc<dyn GitProvider>,
        policy: ImportPolicy,
        cancel: CancellationToken,
        failures: FailureSink,
    ) -> Self {
        Self {
            destination,
            policy,
            cancel,
            failures,
        }
    }

    /// Tracks `repository` on its own task.
    pub fn spawn(&self, repository: String) -> JoinHandle<ImportOutcome> {
        let tracker = self.clone();
        let span = info_span!("import", repo = %repository);
        tokio::spawn(async move { tracker.track(&repository).await }.instrument(span))
    }

    /// Polls until the import completes, fails, or attempts run out.
    pub async fn track(&self, repository: &str) -> ImportOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_status = None;
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if self.cancel.is_cancelled() {
                return ImportOutcome::Cancelled;
            }

            match self.destination.get_import_progress(repository).await {
                Ok(status) if status.is_complete() => {
                    info!(attempts = attempt + 1, "Import complete");
                    return ImportOutcome::Complete {
                        attempts: attempt + 1,
                    };
                }
                Ok(status) if status.is_failed() => {
                    self.failures.record(
                        EntityKind::Import,
                        repository,
                        repository,
                        format!("import ended with status '{status}'"),
                    );
                    return ImportOutcome::Failed { status };
                }
                Ok(status) => {
                    debug!(status = %status, attempt, "Import in progress");
                    last_status = Some(status);
                    last_error = None;
                }
                Err(e) => {
                    warn!(error = %e, attempt, "Failed to poll import progress");
                    last_error = Some(e);
                }
            }

            if attempt + 1 < max_attempts {
                let delay = self.policy.delay_for_attempt(attempt);
                tokio::select! {
                    () = self.cancel.cancelled() => return ImportOutcome::Cancelled,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        if let Some(e) = last_error {
            self.failures
                .record(EntityKind::Import, repository, repository, e);
        }
        warn!(
            attempts = max_attempts,
            last_status = last_status.as_ref().map(ImportStatus::as_str).unwrap_or("unknown"),
            "Import did not complete in time, leaving it running"
        );
        ImportOutcome::Exhausted { last_status }
    }
}
