//! Domain types for teams, members, projects, tasks, and reassignment logs.
//!
//! These are the engine's internal shapes. The HTTP layer maps them to the
//! client wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::capacity::{Capacity, Load};
use crate::ids::{LogId, MemberId, ProjectId, TaskId, TeamId, UserId};

/// Display label for a task with no assignee.
pub const UNASSIGNED_LABEL: &str = "Unassigned";

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Task priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Medium priority.
    #[default]
    Medium,
    /// High priority.
    High,
}

impl TaskPriority {
    /// Storage representation.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse the storage representation.
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

impl FromStr for TaskPriority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(format!("unknown task priority: {other}")),
        }
    }
}

/// Task workflow status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Pending,
    /// Being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Storage representation.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parse the storage representation.
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        };
        f.write_str(label)
    }
}

impl FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "In Progress" => Ok(Self::InProgress),
            "Done" => Ok(Self::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────────────────────────

/// A team member. `current_tasks` is derived from the tasks table when the
/// member is loaded; it is never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member ID.
    pub id: MemberId,
    /// Owning team.
    pub team_id: TeamId,
    /// Display name.
    pub name: String,
    /// Free-text role.
    pub role: String,
    /// Maximum tasks before overload.
    pub capacity: Capacity,
    /// Tasks currently assigned (derived).
    pub current_tasks: u32,
    /// Creation timestamp.
    pub created_at: String,
}

impl Member {
    /// Current load snapshot.
    pub fn load(&self) -> Load {
        Load::new(self.current_tasks, self.capacity)
    }

    /// `current_tasks > capacity`.
    pub fn is_overloaded(&self) -> bool {
        self.load().is_overloaded()
    }

    /// `current_tasks / capacity` (`+inf` for capacity 0).
    pub fn load_ratio(&self) -> f64 {
        self.load().load_ratio()
    }
}

/// A team with its members in insertion order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Team ID.
    pub id: TeamId,
    /// Team name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Members, oldest first.
    pub members: Vec<Member>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl Team {
    /// Find a member of this team.
    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    /// Members currently over capacity.
    pub fn overloaded_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| m.is_overloaded())
    }
}

/// A project owned by a team.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project ID.
    pub id: ProjectId,
    /// Project name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Owning team; `None` once the team has been deleted.
    pub team_id: Option<TeamId>,
    /// Number of tasks referencing this project.
    pub task_count: u32,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A unit of work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task ID.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Owning project; `None` once the project has been deleted.
    pub project_id: Option<ProjectId>,
    /// Assignee; `None` means unassigned.
    pub assigned_member_id: Option<MemberId>,
    /// Priority.
    pub priority: TaskPriority,
    /// Status.
    pub status: TaskStatus,
    /// Monotonic sequence of the current assignment (higher = more recent).
    pub assign_seq: Option<i64>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Immutable audit record of one rebalancing move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReassignmentLog {
    /// Log ID.
    pub id: LogId,
    /// Moved task.
    pub task_id: TaskId,
    /// Task title at the time of the move.
    pub task_title: String,
    /// Team the move happened in.
    pub team_id: Option<TeamId>,
    /// Previous assignee.
    pub from_member_id: Option<MemberId>,
    /// Previous assignee's name at the time of the move.
    pub from_member_name: Option<String>,
    /// New assignee.
    pub to_member_id: MemberId,
    /// New assignee's name at the time of the move.
    pub to_member_name: String,
    /// When the move was committed.
    pub created_at: String,
}

/// A registered user (without credentials).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email (stored lowercase).
    pub email: String,
    /// Registration timestamp.
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for creating a team.
#[derive(Clone, Debug, Default)]
pub struct TeamCreateParams {
    /// Team name (required).
    pub name: String,
    /// Description.
    pub description: Option<String>,
}

/// Partial team update.
#[derive(Clone, Debug, Default)]
pub struct TeamUpdateParams {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// Parameters for adding a member to a team.
#[derive(Clone, Debug, Default)]
pub struct MemberCreateParams {
    /// Member name (required).
    pub name: String,
    /// Role.
    pub role: Option<String>,
    /// Raw capacity; validated to 0–5. Defaults to 3.
    pub capacity: Option<i64>,
}

/// Partial member update.
#[derive(Clone, Debug, Default)]
pub struct MemberUpdateParams {
    /// New name.
    pub name: Option<String>,
    /// New role.
    pub role: Option<String>,
    /// New raw capacity.
    pub capacity: Option<i64>,
}

/// Parameters for creating a project.
#[derive(Clone, Debug, Default)]
pub struct ProjectCreateParams {
    /// Project name (required).
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Owning team (required, must exist).
    pub team_id: TeamId,
}

/// Partial project update.
#[derive(Clone, Debug, Default)]
pub struct ProjectUpdateParams {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Move the project to another team.
    pub team_id: Option<TeamId>,
}

/// Parameters for creating a task.
#[derive(Clone, Debug, Default)]
pub struct TaskCreateParams {
    /// Task title (required).
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Owning project (required, must exist).
    pub project_id: ProjectId,
    /// Initial assignee.
    pub assigned_member_id: Option<MemberId>,
    /// Priority (default Medium).
    pub priority: Option<TaskPriority>,
    /// Status (default Pending).
    pub status: Option<TaskStatus>,
    /// Proceed even if the assignee would exceed capacity.
    pub override_capacity: bool,
}

/// Partial task update.
///
/// `assignment` is tri-state: `None` leaves the assignee alone,
/// `Some(None)` unassigns, `Some(Some(id))` assigns.
#[derive(Clone, Debug, Default)]
pub struct TaskUpdateParams {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Move to another project.
    pub project_id: Option<ProjectId>,
    /// Assignment change.
    pub assignment: Option<Option<MemberId>>,
    /// New priority.
    pub priority: Option<TaskPriority>,
    /// New status.
    pub status: Option<TaskStatus>,
    /// Proceed even if the assignee would exceed capacity.
    pub override_capacity: bool,
}

/// Filters for listing tasks.
#[derive(Clone, Debug, Default)]
pub struct TaskFilter {
    /// Only tasks of this project.
    pub project_id: Option<ProjectId>,
    /// Only tasks assigned to this member.
    pub member_id: Option<MemberId>,
    /// Only tasks with this status.
    pub status: Option<TaskStatus>,
    /// Only tasks with this priority.
    pub priority: Option<TaskPriority>,
}
