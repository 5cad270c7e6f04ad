#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod cache;
pub mod config;
pub mod github;
pub mod gitlab;
pub mod import;
pub mod provider;
pub mod rate_limit;
pub mod reconcile;
pub mod retry;
pub mod runner;
pub mod summary;
pub mod templates;
pub mod wiki;

pub use cache::{CacheError, CachedIssue, CachedRepository, DestinationCache};
pub use config::{ConfigError, ImportSettings, Settings, TemplateSettings};
pub use github::GithubProvider;
pub use gitlab::GitlabProvider;
pub use import::{ImportOutcome, ImportPolicy, ImportTracker};
pub use provider::{
    AuthId, FakeCall, FakeFailure, FakeProvider, GitIssue, GitIssueComment, GitLabel, GitProvider,
    GitRepository, GitUser, ImportStatus, IssueState, ProviderError,
};
pub use rate_limit::{check_core_rate_limit, ensure_core_rate_limit, wait_if_needed, RateLimitInfo};
pub use reconcile::{Reconciler, RepositoryStatus};
pub use runner::{RunScope, Runner, RunnerConfig, RunnerError};
pub use summary::{EntityFailure, EntityKind, RepositoryReport, RunSummary};
pub use templates::{TemplateError, TemplateRenderer};
pub use wiki::{DryRunWikiTransfer, GitWikiTransfer, WikiError, WikiOutcome, WikiTransfer};
