//! Read models returned by engine operations.

use crewboard_core::{
    Capacity, Member, MemberId, Project, ProjectId, ReassignmentLog, Task, Team, TeamId,
};
use serde::Serialize;

/// A member's load as reported to clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberLoad {
    /// Member ID.
    pub member_id: MemberId,
    /// Display name.
    pub name: String,
    /// Free-text role.
    pub role: String,
    /// Tasks currently assigned.
    pub current_tasks: u32,
    /// Maximum tasks before overload.
    pub capacity: Capacity,
    /// `current_tasks > capacity`.
    pub is_overloaded: bool,
}

impl From<&Member> for MemberLoad {
    fn from(m: &Member) -> Self {
        Self {
            member_id: m.id.clone(),
            name: m.name.clone(),
            role: m.role.clone(),
            current_tasks: m.current_tasks,
            capacity: m.capacity,
            is_overloaded: m.is_overloaded(),
        }
    }
}

/// A task with its assignee and project resolved for display.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskView {
    /// The task.
    pub task: Task,
    /// Current assignee name (`None` when unassigned).
    pub assignee_name: Option<String>,
    /// Owning project name (`None` when the project was deleted).
    pub project_name: Option<String>,
}

/// Result of a task mutation.
#[derive(Clone, Debug)]
pub struct TaskMutation {
    /// The task after the change (`None` after a delete).
    pub task: Option<TaskView>,
    /// Members whose task count changed, after the change.
    pub affected_members: Vec<MemberLoad>,
}

/// Result of an auto-assignment.
#[derive(Clone, Debug)]
pub struct AutoAssignOutcome {
    /// The task after the change.
    pub task: TaskView,
    /// Chosen member (`None` when the team has no members).
    pub member: Option<MemberLoad>,
    /// The chosen member is now over capacity.
    pub capacity_exceeded: bool,
    /// Members whose task count changed.
    pub affected_members: Vec<MemberLoad>,
}

/// A project with its owning team embedded.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectDetail {
    /// The project.
    pub project: Project,
    /// Owning team with members (`None` when orphaned).
    pub team: Option<Team>,
}

/// Result of a project update.
#[derive(Clone, Debug)]
pub struct ProjectMutation {
    /// The project after the change.
    pub project: ProjectDetail,
    /// Tasks unassigned because their assignee is not in the new team.
    pub unassigned_tasks: usize,
    /// Members whose task count changed.
    pub affected_members: Vec<MemberLoad>,
}

/// Result of deleting a project.
#[derive(Clone, Debug)]
pub struct ProjectDeletion {
    /// Deleted project.
    pub project_id: ProjectId,
    /// Tasks left without project and assignee.
    pub unassigned_tasks: usize,
    /// Members whose task count changed.
    pub affected_members: Vec<MemberLoad>,
}

/// Result of deleting a team.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDeletion {
    /// Deleted team.
    pub team_id: TeamId,
    /// Members deleted with the team.
    pub removed_members: usize,
    /// Tasks left without assignee.
    pub unassigned_tasks: usize,
    /// Projects that no longer have a team.
    pub orphaned_projects: Vec<ProjectId>,
}

/// Result of removing a member.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRemoval {
    /// Removed member.
    pub member_id: MemberId,
    /// Tasks left without assignee.
    pub unassigned_tasks: usize,
}

/// Per-team load summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    /// Team ID.
    pub team_id: TeamId,
    /// Team name.
    pub name: String,
    /// Members in insertion order.
    pub members: Vec<MemberLoad>,
    /// Sum of the members' task counts.
    pub total_tasks: u32,
    /// Members over capacity.
    pub overloaded_count: u32,
}

/// Dashboard statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    /// Number of projects.
    pub total_projects: u32,
    /// Number of tasks.
    pub total_tasks: u32,
    /// One entry per team, creation order.
    pub team_summary: Vec<TeamSummary>,
    /// Most recent reassignments, newest first.
    pub recent_logs: Vec<ReassignmentLog>,
}

/// A member still overloaded after rebalancing.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedMember {
    /// Team of the member.
    pub team_id: TeamId,
    /// Load after the sweep.
    pub member: MemberLoad,
}

/// A team whose sweep was aborted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceFailure {
    /// Team being swept.
    pub team_id: TeamId,
    /// What went wrong.
    pub message: String,
}

/// Result of a rebalancing sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RebalanceReport {
    /// Number of committed moves.
    pub moved_count: usize,
    /// One entry per committed move, in commit order.
    pub log: Vec<ReassignmentLog>,
    /// Members left overloaded.
    pub unresolved: Vec<UnresolvedMember>,
    /// Teams whose sweep stopped on an error.
    pub errors: Vec<RebalanceFailure>,
    /// Loads of every member a committed move touched.
    pub affected_members: Vec<MemberLoad>,
}
