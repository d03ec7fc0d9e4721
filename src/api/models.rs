use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Account role, as served by `/api/profile/`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "Project Manager")]
    ProjectManager,
    #[serde(rename = "Team Member")]
    TeamMember,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectManager => "Project Manager",
            Self::TeamMember => "Team Member",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Project Manager" => Ok(Self::ProjectManager),
            "Team Member" => Ok(Self::TeamMember),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// One of the five fixed board lanes a card occupies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Backlog,
    Todo,
    Doing,
    Review,
    Done,
}

impl Column {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    /// Board heading for the lane.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::Todo => "TODO",
            Self::Doing => "In Progress",
            Self::Review => "Review",
            Self::Done => "Done",
        }
    }

    /// All lanes in board order.
    pub const ALL: [Column; 5] = [
        Column::Backlog,
        Column::Todo,
        Column::Doing,
        Column::Review,
        Column::Done,
    ];
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "doing" => Ok(Self::Doing),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid column: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" | "low" => Ok(Self::Low),
            "Medium" | "medium" => Ok(Self::Medium),
            "High" | "high" => Ok(Self::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// The signed-in user's profile record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A member of a team (subset of fields we care about).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

/// A unit of work on the board. `progress` tolerates absent and null server
/// values, both normalized to 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: i64,
    pub team: i64,
    pub title: String,
    pub column: Column,
    pub priority: Priority,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub assigned_to_name: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_to_zero")]
    pub progress: u8,
    #[serde(default)]
    pub sprint_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sprint_finish: Option<DateTime<Utc>>,
}

impl Card {
    /// Whether the card's sprint window has already closed.
    pub fn sprint_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.sprint_finish, Some(finish) if finish < now)
    }
}

fn null_to_zero<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u8>::deserialize(deserializer)?.unwrap_or(0))
}

/// A single start/end work interval for the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkDay {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub working_hours: Option<String>,
}

// ── Request payloads ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct NewCard {
    pub team: i64,
    pub title: String,
    pub column: Column,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_finish: Option<DateTime<Utc>>,
}

/// Partial card update; only the populated fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<Column>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_finish: Option<DateTime<Utc>>,
}

impl CardPatch {
    pub fn column(column: Column) -> Self {
        Self {
            column: Some(column),
            ..Self::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn assigned_to(member_id: i64) -> Self {
        Self {
            assigned_to: Some(member_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub role: Role,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic_data: Option<String>,
}
