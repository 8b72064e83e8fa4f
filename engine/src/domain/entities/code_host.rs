//! Code-host domain entities
//!
//! The fetched graph for one repository: metadata, collaborators, branches,
//! commits, pull requests with their reviews, and issues with their comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`.
    pub full_name: String,
    pub description: Option<String>,
    pub default_branch: String,
    pub is_private: bool,
}

/// A user who contributes to the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub sha: String,
    pub is_protected: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub authored_at: DateTime<Utc>,
    pub committed_at: Option<DateTime<Utc>>,
    /// Line counters are zero when the host's listing omits them.
    pub additions: i64,
    pub deletions: i64,
    pub files_changed: i64,
}

/// Pull request state as displayed: merged takes precedence over closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub state: PrState,
    /// Username of the PR author.
    pub creator: String,
    pub head_ref: String,
    pub base_ref: String,
    pub additions: i64,
    pub deletions: i64,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub reviews: Vec<CodeReview>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.state == PrState::Merged
    }
}

/// A review submitted on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeReview {
    pub id: i64,
    /// Username of the reviewer.
    pub reviewer: String,
    /// Host-native review state ("APPROVED", "CHANGES_REQUESTED", ...).
    pub state: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueState::Open => write!(f, "open"),
            IssueState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub state: IssueState,
    /// Username of the issue author.
    pub creator: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub comments: Vec<Comment>,
}

/// A comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Username of the comment author.
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
