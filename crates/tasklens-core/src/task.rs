use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Explicit display rank: high sorts before medium before low.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "high" | "h" => Some(Priority::High),
            "medium" | "med" | "m" => Some(Priority::Medium),
            "low" | "l" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Todo,
    InProgress,
    Completed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
        }
    }
}

/// A single task record. Field names serialize in camelCase so exported
/// data matches the JSON shape the companion web client exchanges with its
/// API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub priority: Priority,

    pub status: Status,

    #[serde(default)]
    pub category_id: Option<u64>,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub parent_task_id: Option<u64>,

    #[serde(default)]
    pub ai_generated: bool,

    pub user_id: u64,
}

impl Task {
    pub fn new(id: u64, title: String, user_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            description: None,
            priority: Priority::Medium,
            status: Status::Todo,
            category_id: None,
            due_date: None,
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: None,
            parent_task_id: None,
            ai_generated: false,
            user_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// Status transitions go through here so that the `completed` flag and
    /// `completed_at` can never disagree with `status`.
    pub fn set_status(&mut self, status: Status, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = Some(now);
        match status {
            Status::Completed => {
                self.completed = true;
                self.completed_at = Some(now);
            }
            Status::Todo | Status::InProgress => {
                self.completed = false;
                self.completed_at = None;
            }
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.set_status(Status::Completed, now);
    }

    pub fn reopen(&mut self, now: DateTime<Utc>) {
        self.set_status(Status::Todo, now);
    }
}

/// A user-defined task category. Tasks reference categories by id only;
/// deleting a category leaves its tasks in place with a dangling reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Updated,
    Completed,
    Reopened,
    Deleted,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::Updated => "updated",
            HistoryAction::Completed => "completed",
            HistoryAction::Reopened => "reopened",
            HistoryAction::Deleted => "deleted",
        }
    }
}

/// One audit row per task mutation, newest consulted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistory {
    pub id: u64,
    pub task_id: u64,
    pub user_id: u64,
    pub action: HistoryAction,
    #[serde(default)]
    pub previous_status: Option<Status>,
    #[serde(default)]
    pub new_status: Option<Status>,
    pub timestamp: DateTime<Utc>,
}
