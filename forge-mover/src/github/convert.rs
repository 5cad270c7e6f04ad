//! Conversions from octocrab models to provider entities.

use crate::provider::{GitIssue, GitIssueComment, GitLabel, GitRepository, GitUser, IssueState};
use octocrab::models;

pub(crate) fn to_repository(repo: models::Repository) -> GitRepository {
    GitRepository {
        name: repo.name,
        description: repo.description.unwrap_or_default(),
        clone_url: repo.clone_url.map(|u| u.to_string()).unwrap_or_default(),
        ssh_url: repo.ssh_url.unwrap_or_default(),
        owner: repo.owner.map(|o| o.login).unwrap_or_default(),
        archived: repo.archived.unwrap_or(false),
        fork: repo.fork.unwrap_or(false),
        empty: repo.size == Some(0),
        pid: repo.id.into_inner(),
    }
}

pub(crate) fn to_user(author: models::Author) -> GitUser {
    GitUser {
        login: author.login,
        name: None,
        email: None,
    }
}

pub(crate) fn to_issue(
    issue: models::issues::Issue,
    repository: &str,
    repository_id: u64,
) -> GitIssue {
    let state = match issue.state {
        models::IssueState::Closed => IssueState::Closed,
        _ => IssueState::Open,
    };

    GitIssue {
        repository: repository.to_string(),
        repository_id,
        number: issue.number,
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        state,
        labels: issue.labels.into_iter().map(|l| l.name).collect(),
        author: Some(to_user(issue.user)),
        assignees: issue.assignees.into_iter().map(to_user).collect(),
    }
}

pub(crate) fn to_comment(
    comment: models::issues::Comment,
    repository: &str,
    issue_number: u64,
) -> GitIssueComment {
    GitIssueComment {
        repository: repository.to_string(),
        issue_number,
        author: Some(to_user(comment.user)),
        body: comment.body.unwrap_or_default(),
        created_at: comment.created_at,
        updated_at: comment.updated_at.unwrap_or(comment.created_at),
    }
}

pub(crate) fn to_label(label: models::Label, repository: &str) -> GitLabel {
    GitLabel {
        repository: repository.to_string(),
        name: label.name,
        color: label.color,
        description: label.description.unwrap_or_default(),
    }
}

/// Strips the `#` prefix and surrounding whitespace GitHub rejects in colors.
pub(crate) fn normalize_color(color: &str) -> String {
    color
        .trim_matches(|c: char| c == '#' || c.is_whitespace())
        .to_string()
}
