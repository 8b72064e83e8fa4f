//! Immutable fetched-entity snapshots.
//!
//! A snapshot is built incrementally by exactly one fetch job and never
//! mutated after the job reports completion. Analytics reads it; the
//! storage collaborator receives it whole.

use serde::{Deserialize, Serialize};

use super::code_host::{Branch, Collaborator, Commit, Issue, PullRequest, Repository};
use super::source::SourceKind;
use super::tracker::{Member, Project, Sprint, TaskRecord, UserStory};

/// The fetched graph for one code-host repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub repository: Repository,
    pub collaborators: Vec<Collaborator>,
    pub branches: Vec<Branch>,
    pub commits: Vec<Commit>,
    pub pull_requests: Vec<PullRequest>,
    pub issues: Vec<Issue>,
}

/// The fetched graph for one tracker project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project: Project,
    pub members: Vec<Member>,
    pub sprints: Vec<Sprint>,
    pub user_stories: Vec<UserStory>,
    pub tasks: Vec<TaskRecord>,
}

/// Snapshot of either source kind, keyed by natural identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntitySnapshot {
    CodeHost(RepoSnapshot),
    Tracker(ProjectSnapshot),
}

impl EntitySnapshot {
    pub fn kind(&self) -> SourceKind {
        match self {
            EntitySnapshot::CodeHost(_) => SourceKind::CodeHost,
            EntitySnapshot::Tracker(_) => SourceKind::Tracker,
        }
    }

    pub fn as_repo(&self) -> Option<&RepoSnapshot> {
        match self {
            EntitySnapshot::CodeHost(snapshot) => Some(snapshot),
            EntitySnapshot::Tracker(_) => None,
        }
    }

    pub fn as_project(&self) -> Option<&ProjectSnapshot> {
        match self {
            EntitySnapshot::Tracker(snapshot) => Some(snapshot),
            EntitySnapshot::CodeHost(_) => None,
        }
    }

    pub fn commit_count(&self) -> usize {
        self.as_repo().map_or(0, |s| s.commits.len())
    }

    pub fn pull_request_count(&self) -> usize {
        self.as_repo().map_or(0, |s| s.pull_requests.len())
    }

    pub fn issue_count(&self) -> usize {
        self.as_repo().map_or(0, |s| s.issues.len())
    }
}
