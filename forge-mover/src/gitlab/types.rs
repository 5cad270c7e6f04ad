//! GitLab REST payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Project as returned by `GET /projects?statistics=true`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitLabProject {
    pub id: u64,
    pub path: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ssh_url_to_repo: Option<String>,
    #[serde(default)]
    pub http_url_to_repo: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub owner: Option<GitLabUser>,
    #[serde(default)]
    pub namespace: Option<GitLabNamespace>,
    #[serde(default)]
    pub forked_from_project: Option<serde_json::Value>,
    #[serde(default)]
    pub empty_repo: bool,
    #[serde(default)]
    pub statistics: Option<GitLabStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitLabStatistics {
    #[serde(default)]
    pub commit_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitLabNamespace {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitLabUser {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitLabIssue {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub author: Option<GitLabUser>,
    #[serde(default)]
    pub assignees: Vec<GitLabUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitLabNote {
    pub body: String,
    pub author: GitLabUser,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Notes generated by GitLab itself ("changed the description", ...).
    #[serde(default)]
    pub system: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitLabLabel {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}
