//! In-memory provider used for dry runs and tests.

use super::{
    AuthId, GitIssue, GitIssueComment, GitLabel, GitProvider, GitRepository, ImportStatus,
    IssueState, ProviderError,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A mutating call observed by [`FakeProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    CreateRepository(String),
    CreateLabel { repository: String, name: String },
    CreateIssue { repository: String, title: String },
    CreateIssueComment { repository: String, issue_number: u64 },
    MigrateRepo { repository: String, auth_token: String },
    GetImportProgress(String),
}

impl FakeCall {
    /// Returns true for calls that create destination entities.
    #[must_use]
    pub fn is_create(&self) -> bool {
        !matches!(self, Self::MigrateRepo { .. } | Self::GetImportProgress(_))
    }
}

/// A failure to inject into a [`FakeProvider`] operation.
///
/// Injected failures persist for every matching call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeFailure {
    ListRepositories,
    ListIssues(String),
    ListLabels(String),
    ListComments { repository: String, issue_number: u64 },
    CreateRepository(String),
    CreateLabel { repository: String, name: String },
    CreateIssue { repository: String, title: String },
    /// The issue is created but stays open.
    CloseIssue { repository: String, title: String },
    CreateIssueComment { repository: String, issue_number: u64 },
    MigrateRepo(String),
    ImportProgress(String),
}

#[derive(Debug, Default)]
struct FakeRepository {
    repository: GitRepository,
    labels: Vec<GitLabel>,
    issues: Vec<GitIssue>,
    comments: Vec<GitIssueComment>,
}

#[derive(Debug, Default)]
struct FakeState {
    repositories: BTreeMap<String, FakeRepository>,
    calls: Vec<FakeCall>,
    failures: Vec<FakeFailure>,
    import_statuses: HashMap<String, VecDeque<ImportStatus>>,
    next_pid: u64,
}

impl FakeState {
    fn repository(&self, name: &str) -> Result<&FakeRepository, ProviderError> {
        self.repositories
            .get(name)
            .ok_or_else(|| ProviderError::RepositoryNotFound(name.to_string()))
    }

    fn repository_mut(&mut self, name: &str) -> Result<&mut FakeRepository, ProviderError> {
        self.repositories
            .get_mut(name)
            .ok_or_else(|| ProviderError::RepositoryNotFound(name.to_string()))
    }

    fn check(&self, failure: &FakeFailure) -> Result<(), ProviderError> {
        if self.failures.contains(failure) {
            return Err(ProviderError::api(format!("injected failure: {failure:?}")));
        }
        Ok(())
    }

    fn insert_repository(&mut self, mut repository: GitRepository) -> GitRepository {
        self.next_pid += 1;
        if repository.pid == 0 {
            repository.pid = self.next_pid;
        }
        self.repositories.insert(
            repository.name.clone(),
            FakeRepository {
                repository: repository.clone(),
                ..Default::default()
            },
        );
        repository
    }
}

/// Provider backed entirely by process memory.
///
/// Issue numbers are assigned sequentially per repository. Imports report
/// `complete` unless a status script was queued with
/// [`FakeProvider::script_import`].
#[derive(Debug)]
pub struct FakeProvider {
    name: String,
    auth: AuthId,
    state: Mutex<FakeState>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProvider {
    /// Creates an empty fake with placeholder credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::with_auth(AuthId::new(
            "https://git.example.com",
            "test-token",
            "fakeorg",
        ))
    }

    /// Creates an empty fake acting as `auth`.
    #[must_use]
    pub fn with_auth(auth: AuthId) -> Self {
        Self {
            name: "fake".to_string(),
            auth,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Overrides the name reported in logs.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a repository without recording a call.
    pub fn seed_repository(&self, repository: GitRepository) -> GitRepository {
        self.state().insert_repository(repository)
    }

    /// Adds a label to a seeded repository.
    pub fn seed_label(&self, label: GitLabel) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.repository_mut(&label.repository)?.labels.push(label);
        Ok(())
    }

    /// Adds an issue, keeping its number.
    pub fn seed_issue(&self, issue: GitIssue) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.repository_mut(&issue.repository)?.issues.push(issue);
        Ok(())
    }

    /// Adds a comment to an existing issue.
    pub fn seed_comment(&self, comment: GitIssueComment) -> Result<(), ProviderError> {
        let mut state = self.state();
        let repo = state.repository_mut(&comment.repository)?;
        if !repo.issues.iter().any(|i| i.number == comment.issue_number) {
            return Err(ProviderError::IssueNotFound {
                repository: comment.repository.clone(),
                number: comment.issue_number,
            });
        }
        repo.comments.push(comment);
        Ok(())
    }

    /// Makes every matching call fail.
    pub fn inject_failure(&self, failure: FakeFailure) {
        self.state().failures.push(failure);
    }

    /// Queues statuses returned by successive progress polls of `repository`.
    pub fn script_import<I>(&self, repository: &str, statuses: I)
    where
        I: IntoIterator<Item = ImportStatus>,
    {
        self.state()
            .import_statuses
            .entry(repository.to_string())
            .or_default()
            .extend(statuses);
    }

    /// Returns every mutating call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<FakeCall> {
        self.state().calls.clone()
    }

    /// Returns only entity-creating calls.
    #[must_use]
    pub fn create_calls(&self) -> Vec<FakeCall> {
        self.calls().into_iter().filter(FakeCall::is_create).collect()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Returns the names of all stored repositories.
    #[must_use]
    pub fn repository_names(&self) -> Vec<String> {
        self.state().repositories.keys().cloned().collect()
    }

    /// Returns the stored issues of a repository.
    #[must_use]
    pub fn issues(&self, repository: &str) -> Vec<GitIssue> {
        self.state()
            .repositories
            .get(repository)
            .map(|r| r.issues.clone())
            .unwrap_or_default()
    }

    /// Returns the stored labels of a repository.
    #[must_use]
    pub fn labels(&self, repository: &str) -> Vec<GitLabel> {
        self.state()
            .repositories
            .get(repository)
            .map(|r| r.labels.clone())
            .unwrap_or_default()
    }

    /// Returns the stored comments of one issue.
    #[must_use]
    pub fn comments(&self, repository: &str, issue_number: u64) -> Vec<GitIssueComment> {
        self.state()
            .repositories
            .get(repository)
            .map(|r| {
                r.comments
                    .iter()
                    .filter(|c| c.issue_number == issue_number)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl GitProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn auth(&self) -> &AuthId {
        &self.auth
    }

    async fn get_repositories(&self) -> Result<Vec<GitRepository>, ProviderError> {
        let state = self.state();
        state.check(&FakeFailure::ListRepositories)?;
        Ok(state
            .repositories
            .values()
            .map(|r| r.repository.clone())
            .collect())
    }

    async fn get_issues(
        &self,
        _repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssue>, ProviderError> {
        let state = self.state();
        state.check(&FakeFailure::ListIssues(repository_name.to_string()))?;
        Ok(state.repository(repository_name)?.issues.clone())
    }

    async fn get_comments(
        &self,
        _repository_id: u64,
        issue_number: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssueComment>, ProviderError> {
        let state = self.state();
        state.check(&FakeFailure::ListComments {
            repository: repository_name.to_string(),
            issue_number,
        })?;
        Ok(state
            .repository(repository_name)?
            .comments
            .iter()
            .filter(|c| c.issue_number == issue_number)
            .cloned()
            .collect())
    }

    async fn get_labels(
        &self,
        _repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitLabel>, ProviderError> {
        let state = self.state();
        state.check(&FakeFailure::ListLabels(repository_name.to_string()))?;
        Ok(state.repository(repository_name)?.labels.clone())
    }

    async fn create_repository(
        &self,
        repository: &GitRepository,
    ) -> Result<GitRepository, ProviderError> {
        let mut state = self.state();
        let name = repository.name.trim().to_string();
        state.calls.push(FakeCall::CreateRepository(name.clone()));
        state.check(&FakeFailure::CreateRepository(name.clone()))?;
        if state.repositories.contains_key(&name) {
            return Err(ProviderError::RepositoryExists(name));
        }
        debug!(repo = %name, "Fake repository created");
        let created = GitRepository {
            name,
            description: repository.description.trim().to_string(),
            owner: self.auth.owner.clone(),
            archived: repository.archived,
            pid: 0,
            ..Default::default()
        };
        Ok(state.insert_repository(created))
    }

    async fn create_issue(&self, issue: &GitIssue) -> Result<GitIssue, ProviderError> {
        let mut state = self.state();
        state.calls.push(FakeCall::CreateIssue {
            repository: issue.repository.clone(),
            title: issue.title.clone(),
        });
        state.check(&FakeFailure::CreateIssue {
            repository: issue.repository.clone(),
            title: issue.title.clone(),
        })?;
        let close_fails = state
            .check(&FakeFailure::CloseIssue {
                repository: issue.repository.clone(),
                title: issue.title.clone(),
            })
            .is_err();
        let repo = state.repository_mut(&issue.repository)?;
        let number = repo.issues.iter().map(|i| i.number).max().unwrap_or(0) + 1;
        let mut created = GitIssue {
            number,
            repository_id: repo.repository.pid,
            ..issue.clone()
        };
        if close_fails {
            created.state = IssueState::Open;
        }
        repo.issues.push(created.clone());
        Ok(created)
    }

    async fn create_issue_comment(&self, comment: &GitIssueComment) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.calls.push(FakeCall::CreateIssueComment {
            repository: comment.repository.clone(),
            issue_number: comment.issue_number,
        });
        state.check(&FakeFailure::CreateIssueComment {
            repository: comment.repository.clone(),
            issue_number: comment.issue_number,
        })?;
        let repo = state.repository_mut(&comment.repository)?;
        if !repo.issues.iter().any(|i| i.number == comment.issue_number) {
            return Err(ProviderError::IssueNotFound {
                repository: comment.repository.clone(),
                number: comment.issue_number,
            });
        }
        repo.comments.push(comment.clone());
        Ok(())
    }

    async fn create_label(&self, label: &GitLabel) -> Result<GitLabel, ProviderError> {
        let mut state = self.state();
        state.calls.push(FakeCall::CreateLabel {
            repository: label.repository.clone(),
            name: label.name.clone(),
        });
        state.check(&FakeFailure::CreateLabel {
            repository: label.repository.clone(),
            name: label.name.clone(),
        })?;
        let repo = state.repository_mut(&label.repository)?;
        let created = GitLabel {
            color: label.color.trim_start_matches('#').to_string(),
            ..label.clone()
        };
        repo.labels.push(created.clone());
        Ok(created)
    }

    async fn migrate_repo(
        &self,
        repository: &GitRepository,
        auth_token: &str,
    ) -> Result<ImportStatus, ProviderError> {
        let mut state = self.state();
        state.calls.push(FakeCall::MigrateRepo {
            repository: repository.name.clone(),
            auth_token: auth_token.to_string(),
        });
        state.check(&FakeFailure::MigrateRepo(repository.name.clone()))?;
        state.repository(&repository.name)?;
        Ok(ImportStatus::new("importing"))
    }

    async fn get_import_progress(
        &self,
        repository_name: &str,
    ) -> Result<ImportStatus, ProviderError> {
        let mut state = self.state();
        state
            .calls
            .push(FakeCall::GetImportProgress(repository_name.to_string()));
        state.check(&FakeFailure::ImportProgress(repository_name.to_string()))?;
        let scripted = state
            .import_statuses
            .get_mut(repository_name)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or_else(ImportStatus::complete))
    }
}
