//! Tracker domain entities
//!
//! The fetched graph for one tracker project: members, sprints, user
//! stories, and tasks with their change history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Tracker project metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

/// A member of the project team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
}

/// A sprint (milestone) with its planned window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: i64,
    pub name: String,
    pub estimated_start: Option<NaiveDate>,
    pub estimated_finish: Option<NaiveDate>,
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStory {
    pub id: i64,
    /// Human-facing story number within the project.
    pub reference: i64,
    pub subject: String,
    /// Sprint the story is scheduled in, if any.
    pub sprint_id: Option<i64>,
    pub status: String,
    pub is_closed: bool,
    pub points: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    /// Human-facing task number within the project.
    pub reference: i64,
    pub subject: String,
    pub user_story_id: Option<i64>,
    pub sprint_id: Option<i64>,
    pub status: String,
    pub is_closed: bool,
    /// Member id of the assignee, if any.
    pub assigned_to: Option<i64>,
    pub points: Option<f64>,
    pub finished_date: Option<DateTime<Utc>>,
    pub history: Vec<TaskHistoryEntry>,
}

/// One field change from a task's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    pub changed_at: DateTime<Utc>,
    pub field: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
}
