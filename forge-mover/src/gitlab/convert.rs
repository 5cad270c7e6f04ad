//! Conversions from GitLab payloads to provider entities.

use super::types::{GitLabIssue, GitLabLabel, GitLabNote, GitLabProject, GitLabUser};
use crate::provider::{GitIssue, GitIssueComment, GitLabel, GitRepository, GitUser, IssueState};

pub(crate) fn to_repository(project: GitLabProject) -> GitRepository {
    let owner = project
        .owner
        .map(|o| o.username)
        .or_else(|| project.namespace.map(|n| n.path))
        .unwrap_or_default();
    let empty = match &project.statistics {
        Some(stats) => project.empty_repo || stats.commit_count == 0,
        None => project.empty_repo,
    };

    GitRepository {
        name: project.path,
        description: project.description.unwrap_or_default(),
        clone_url: project.http_url_to_repo.unwrap_or_default(),
        ssh_url: project.ssh_url_to_repo.unwrap_or_default(),
        owner,
        archived: project.archived,
        fork: project.forked_from_project.is_some(),
        empty,
        pid: project.id,
    }
}

pub(crate) fn to_user(user: GitLabUser) -> GitUser {
    GitUser {
        login: user.username,
        name: user.name,
        email: user.public_email.filter(|e| !e.is_empty()),
    }
}

pub(crate) fn to_issue(issue: GitLabIssue, repository: &str, repository_id: u64) -> GitIssue {
    GitIssue {
        repository: repository.to_string(),
        repository_id,
        number: issue.iid,
        title: issue.title,
        body: issue.description.unwrap_or_default(),
        state: IssueState::from_provider(&issue.state),
        labels: issue.labels,
        author: issue.author.map(to_user),
        assignees: issue.assignees.into_iter().map(to_user).collect(),
    }
}

pub(crate) fn to_comment(note: GitLabNote, repository: &str, issue_number: u64) -> GitIssueComment {
    GitIssueComment {
        repository: repository.to_string(),
        issue_number,
        author: Some(to_user(note.author)),
        body: note.body,
        created_at: note.created_at,
        updated_at: note.updated_at.unwrap_or(note.created_at),
    }
}

pub(crate) fn to_label(label: GitLabLabel, repository: &str) -> GitLabel {
    GitLabel {
        repository: repository.to_string(),
        name: label.name,
        color: label.color,
        description: label.description.unwrap_or_default(),
    }
}
