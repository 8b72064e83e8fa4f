//! Fetch-source identity and job lifecycle types.

use serde::{Deserialize, Serialize};

/// Which external service a batch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    CodeHost,
    Tracker,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::CodeHost => write!(f, "code_host"),
            SourceKind::Tracker => write!(f, "tracker"),
        }
    }
}

/// Opaque identifier for one unit of fetch work within a batch: an
/// `owner/repo` slug for the code host, a project slug for the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Parsed `owner/name` repository slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    /// Parse a bare `owner/repo` slug or a full GitHub URL
    /// (`https://github.com/owner/repo`, optional `.git` suffix and
    /// trailing path segments).
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let stripped = input
            .strip_prefix("https://")
            .or_else(|| input.strip_prefix("http://"))
            .map(|rest| rest.strip_prefix("www.").unwrap_or(rest));

        let (path, from_url) = match stripped {
            Some(rest) => (rest.strip_prefix("github.com/")?, true),
            None => (input, false),
        };

        let mut parts = path.split('/');
        let owner = parts.next()?.trim();
        let name = parts.next()?.trim();
        let name = name.strip_suffix(".git").unwrap_or(name);

        // Bare slugs must be exactly owner/name; URLs may carry extra
        // path segments (tree/branch links and the like).
        if !from_url && parts.next().is_some() {
            return None;
        }
        if owner.is_empty() || name.is_empty() {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Lifecycle of one fetch job within a batch.
///
/// A job moves Pending -> Running -> Succeeded | Failed; a terminal state is
/// set exactly once and never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Pipeline stage of a fetch job.
///
/// Variant order matches execution order within each source kind, so the
/// derived `Ord` reflects the per-job event ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStage {
    Metadata,
    Collaborators,
    Branches,
    Commits,
    PullRequests,
    Issues,
    Members,
    Sprints,
    UserStories,
    Tasks,
}

impl FetchStage {
    /// Stages of a fetch pipeline for the given source kind, in order.
    pub fn pipeline(kind: SourceKind) -> &'static [FetchStage] {
        match kind {
            SourceKind::CodeHost => &[
                FetchStage::Metadata,
                FetchStage::Collaborators,
                FetchStage::Branches,
                FetchStage::Commits,
                FetchStage::PullRequests,
                FetchStage::Issues,
            ],
            SourceKind::Tracker => &[
                FetchStage::Metadata,
                FetchStage::Members,
                FetchStage::Sprints,
                FetchStage::UserStories,
                FetchStage::Tasks,
            ],
        }
    }
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FetchStage::Metadata => "metadata",
            FetchStage::Collaborators => "collaborators",
            FetchStage::Branches => "branches",
            FetchStage::Commits => "commits",
            FetchStage::PullRequests => "pull_requests",
            FetchStage::Issues => "issues",
            FetchStage::Members => "members",
            FetchStage::Sprints => "sprints",
            FetchStage::UserStories => "user_stories",
            FetchStage::Tasks => "tasks",
        };
        write!(f, "{}", name)
    }
}
