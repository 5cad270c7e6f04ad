//! Wiki transfer between providers.
//!
//! Wikis are plain Git repositories next to the main one. The transfer mirrors
//! every branch of the source wiki into the destination wiki over SSH.

mod error;

pub use error::WikiError;

use crate::provider::{AuthId, GitRepository};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

/// Result of one wiki transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WikiOutcome {
    /// Branches were pushed to the destination wiki.
    Transferred,
    /// The source wiki has no content.
    Empty,
    /// The destination refused the push; its wiki must be initialized once by hand.
    NeedsInitialization { remote: String },
    /// Nothing was transferred (dry run).
    Skipped,
}

/// Moves a repository's wiki from source to destination.
#[async_trait]
pub trait WikiTransfer: Send + Sync {
    async fn transfer(
        &self,
        repository: &GitRepository,
        source: &AuthId,
        destination: &AuthId,
    ) -> Result<WikiOutcome, WikiError>;
}

/// Source wiki remote: the repository's SSH URL with `.wiki.git` in place of `.git`.
pub fn source_wiki_url(repository: &GitRepository) -> Result<String, WikiError> {
    let ssh_url = repository.ssh_url.trim();
    if ssh_url.is_empty() {
        return Err(WikiError::InvalidRemote(repository.name.clone()));
    }
    Ok(format!("{}.wiki.git", ssh_url.trim_end_matches(".git")))
}

/// Destination wiki remote, `git@{host}:{owner}/{name}.wiki.git`.
#[must_use]
pub fn destination_wiki_url(destination: &AuthId, repository_name: &str) -> String {
    let host = Url::parse(&destination.url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .unwrap_or_else(|| "github.com".to_string());
    format!(
        "git@{host}:{}/{}.wiki.git",
        destination.owner, repository_name
    )
}

/// Transfers wikis with the `git` command line client.
///
/// Each side authenticates with the SSH key of its [`AuthId`], or the
/// user's own SSH setup when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitWikiTransfer;

impl GitWikiTransfer {
    fn git(dir: &Path, ssh_key: Option<&Path>) -> Command {
        let mut command = Command::new("git");
        command
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(key) = ssh_key {
            command.env(
                "GIT_SSH_COMMAND",
                format!(
                    "ssh -i '{}' -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
                    key.display()
                ),
            );
        }
        command
    }

    /// Runs git and returns its stdout.
    async fn run_git(
        dir: &Path,
        ssh_key: Option<&Path>,
        args: &[&str],
    ) -> Result<String, WikiError> {
        let command = args.join(" ");
        let output = Self::git(dir, ssh_key)
            .args(args)
            .output()
            .await
            .map_err(|source| WikiError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(WikiError::Git {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl WikiTransfer for GitWikiTransfer {
    async fn transfer(
        &self,
        repository: &GitRepository,
        source: &AuthId,
        destination: &AuthId,
    ) -> Result<WikiOutcome, WikiError> {
        let source_url = source_wiki_url(repository)?;
        let destination_url = destination_wiki_url(destination, &repository.name);
        let workdir = tempfile::tempdir().map_err(WikiError::TempDir)?;
        let mirror = workdir.path().join("wiki.git");
        let mirror_arg = mirror.to_string_lossy().into_owned();

        debug!(from = %source_url, "Cloning wiki");
        Self::run_git(
            workdir.path(),
            source.ssh_key_path.as_deref(),
            &["clone", "--bare", "--quiet", &source_url, &mirror_arg],
        )
        .await?;

        let heads = Self::run_git(
            &mirror,
            None,
            &["for-each-ref", "--format=%(refname)", "refs/heads"],
        )
        .await?;
        if heads.trim().is_empty() {
            debug!("Source wiki is empty");
            return Ok(WikiOutcome::Empty);
        }

        match Self::run_git(
            &mirror,
            destination.ssh_key_path.as_deref(),
            &[
                "push",
                "--quiet",
                &destination_url,
                "+refs/heads/*:refs/heads/*",
            ],
        )
        .await
        {
            Ok(_) => {
                info!(to = %destination_url, "Wiki transferred");
                Ok(WikiOutcome::Transferred)
            }
            Err(WikiError::Git { stderr, .. }) => {
                warn!(
                    remote = %destination_url,
                    error = %stderr,
                    "Destination wiki must be created once before it can be pushed"
                );
                Ok(WikiOutcome::NeedsInitialization {
                    remote: destination_url,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Logs the transfer that would happen without touching any remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunWikiTransfer;

#[async_trait]
impl WikiTransfer for DryRunWikiTransfer {
    async fn transfer(
        &self,
        repository: &GitRepository,
        _source: &AuthId,
        destination: &AuthId,
    ) -> Result<WikiOutcome, WikiError> {
        let source_url = source_wiki_url(repository)?;
        info!(
            from = %source_url,
            to = %destination_wiki_url(destination, &repository.name),
            "[dry run] Would transfer wiki"
        );
        Ok(WikiOutcome::Skipped)
    }
}
