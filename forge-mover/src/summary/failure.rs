//! Per-entity failures collected during a run.

use std::fmt;
use tokio::sync::mpsc;
use tracing::warn;

/// Kind of entity a failure relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Repository,
    Import,
    Label,
    Issue,
    Comment,
    Wiki,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Import => "import",
            Self::Label => "label",
            Self::Issue => "issue",
            Self::Comment => "comment",
            Self::Wiki => "wiki",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure recorded against one entity. Recording never halts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub kind: EntityKind,
    /// Repository the entity belongs to.
    pub repository: String,
    /// Entity identifier within the repository (label name, `#12`, ...).
    pub entity: String,
    pub error: String,
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in {}: {}",
            self.kind, self.entity, self.repository, self.error
        )
    }
}

/// Sending half of the run's shared failure channel.
#[derive(Debug, Clone)]
pub struct FailureSink {
    tx: mpsc::UnboundedSender<EntityFailure>,
}

impl FailureSink {
    /// Logs and records a failure.
    pub fn record(
        &self,
        kind: EntityKind,
        repository: &str,
        entity: impl Into<String>,
        error: impl fmt::Display,
    ) {
        let failure = EntityFailure {
            kind,
            repository: repository.to_string(),
            entity: entity.into(),
            error: error.to_string(),
        };
        warn!(
            kind = %failure.kind,
            repo = %failure.repository,
            entity = %failure.entity,
            error = %failure.error,
            "Entity migration failed"
        );
        // The receiver lives as long as the run; a send can only fail once it is over.
        let _ = self.tx.send(failure);
    }
}

/// Receiving half of the failure channel, read once all work has joined.
#[derive(Debug)]
pub struct FailureLog {
    rx: mpsc::UnboundedReceiver<EntityFailure>,
}

impl FailureLog {
    /// Takes every failure recorded so far.
    pub fn drain(&mut self) -> Vec<EntityFailure> {
        let mut failures = Vec::new();
        while let Ok(failure) = self.rx.try_recv() {
            failures.push(failure);
        }
        failures
    }
}

/// Creates the shared failure channel.
#[must_use]
pub fn failure_channel() -> (FailureSink, FailureLog) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FailureSink { tx }, FailureLog { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_failures_from_all_clones() {
        let (sink, mut log) = failure_channel();
        let other = sink.clone();

        sink.record(EntityKind::Label, "app", "bug", "422 Validation Failed");
        other.record(EntityKind::Issue, "app", "#3", "boom");

        let failures = log.drain();
        assert_eq!(failures.len(), 2);
        assert_eq!(
            failures[0].to_string(),
            "label bug in app: 422 Validation Failed"
        );
        assert!(log.drain().is_empty());
    }
}
