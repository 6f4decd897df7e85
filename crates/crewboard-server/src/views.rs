//! Wire format.
//!
//! Entity ids go out as `_id`, everything else is camelCase. A task's
//! assignee is always an object: `{memberId: null, name: "Unassigned"}`
//! when nobody holds it.

use crewboard_core::{
    Capacity, LogId, Member, MemberId, Project, ProjectId, ReassignmentLog, TaskId, TaskPriority,
    TaskStatus, Team, TeamId, UNASSIGNED_LABEL, User, UserId,
};
use crewboard_engine::{
    AutoAssignOutcome, MemberLoad, MemberRemoval, ProjectDeletion, ProjectDetail, ProjectMutation,
    RebalanceFailure, RebalanceReport, Stats, TaskMutation, TaskView, TeamDeletion, TeamSummary,
    UnresolvedMember,
};
use serde::Serialize;

// ─────────────────────────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────────────────────────

/// A team member.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    #[serde(rename = "_id")]
    id: MemberId,
    team_id: TeamId,
    name: String,
    role: String,
    capacity: Capacity,
    current_tasks: u32,
    is_overloaded: bool,
    created_at: String,
}

impl From<&Member> for MemberDto {
    fn from(m: &Member) -> Self {
        Self {
            id: m.id.clone(),
            team_id: m.team_id.clone(),
            name: m.name.clone(),
            role: m.role.clone(),
            capacity: m.capacity,
            current_tasks: m.current_tasks,
            is_overloaded: m.is_overloaded(),
            created_at: m.created_at.clone(),
        }
    }
}

/// A team with its members.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDto {
    #[serde(rename = "_id")]
    id: TeamId,
    name: String,
    description: String,
    members: Vec<MemberDto>,
    created_at: String,
    updated_at: String,
}

impl From<&Team> for TeamDto {
    fn from(t: &Team) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            description: t.description.clone(),
            members: t.members.iter().map(MemberDto::from).collect(),
            created_at: t.created_at.clone(),
            updated_at: t.updated_at.clone(),
        }
    }
}

/// A project with its owning team embedded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    #[serde(rename = "_id")]
    id: ProjectId,
    name: String,
    description: String,
    team: Option<TeamDto>,
    task_count: u32,
    created_at: String,
    updated_at: String,
}

impl From<&ProjectDetail> for ProjectDto {
    fn from(detail: &ProjectDetail) -> Self {
        let Project {
            id,
            name,
            description,
            task_count,
            created_at,
            updated_at,
            ..
        } = &detail.project;
        Self {
            id: id.clone(),
            name: name.clone(),
            description: description.clone(),
            team: detail.team.as_ref().map(TeamDto::from),
            task_count: *task_count,
            created_at: created_at.clone(),
            updated_at: updated_at.clone(),
        }
    }
}

/// Project reference embedded in a task.
#[derive(Debug, Serialize)]
pub struct ProjectRef {
    #[serde(rename = "_id")]
    id: ProjectId,
    name: String,
}

/// Assignee reference embedded in a task.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedMemberDto {
    member_id: Option<MemberId>,
    name: String,
}

/// A task.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    #[serde(rename = "_id")]
    id: TaskId,
    title: String,
    description: String,
    project: Option<ProjectRef>,
    assigned_member: AssignedMemberDto,
    priority: TaskPriority,
    status: TaskStatus,
    created_at: String,
    updated_at: String,
}

impl From<TaskView> for TaskDto {
    fn from(view: TaskView) -> Self {
        let TaskView {
            task,
            assignee_name,
            project_name,
        } = view;
        let project = match (task.project_id, project_name) {
            (Some(id), Some(name)) => Some(ProjectRef { id, name }),
            _ => None,
        };
        let assigned_member = match task.assigned_member_id {
            Some(id) => AssignedMemberDto {
                member_id: Some(id),
                name: assignee_name.unwrap_or_default(),
            },
            None => AssignedMemberDto {
                member_id: None,
                name: UNASSIGNED_LABEL.to_string(),
            },
        };
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            project,
            assigned_member,
            priority: task.priority,
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// A registered user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(rename = "_id")]
    id: UserId,
    name: String,
    email: String,
    created_at: String,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

/// Register/login response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Bearer token.
    pub token: String,
    /// The authenticated user.
    pub user: UserDto,
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutation results
// ─────────────────────────────────────────────────────────────────────────────

/// A changed task plus the members whose counts moved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMutationDto {
    #[serde(flatten)]
    task: Option<TaskDto>,
    affected_members: Vec<MemberLoad>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl TaskMutationDto {
    /// Response for a create or update.
    pub fn changed(mutation: TaskMutation) -> Self {
        Self {
            task: mutation.task.map(TaskDto::from),
            affected_members: mutation.affected_members,
            message: None,
        }
    }

    /// Response for a delete.
    pub fn deleted(mutation: TaskMutation) -> Self {
        Self {
            task: None,
            affected_members: mutation.affected_members,
            message: Some("Task deleted"),
        }
    }
}

/// Auto-assignment result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignDto {
    message: String,
    task: TaskDto,
    member: Option<MemberLoad>,
    capacity_exceeded: bool,
    affected_members: Vec<MemberLoad>,
}

impl From<AutoAssignOutcome> for AutoAssignDto {
    fn from(outcome: AutoAssignOutcome) -> Self {
        let message = match &outcome.member {
            Some(m) if outcome.capacity_exceeded => {
                format!("Task assigned to {}, who is now over capacity", m.name)
            }
            Some(m) => format!("Task assigned to {}", m.name),
            None => "The project's team has no members".to_string(),
        };
        Self {
            message,
            task: TaskDto::from(outcome.task),
            member: outcome.member,
            capacity_exceeded: outcome.capacity_exceeded,
            affected_members: outcome.affected_members,
        }
    }
}

/// Project update result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMutationDto {
    #[serde(flatten)]
    project: ProjectDto,
    unassigned_tasks: usize,
    affected_members: Vec<MemberLoad>,
}

impl From<ProjectMutation> for ProjectMutationDto {
    fn from(m: ProjectMutation) -> Self {
        Self {
            project: ProjectDto::from(&m.project),
            unassigned_tasks: m.unassigned_tasks,
            affected_members: m.affected_members,
        }
    }
}

/// Project deletion result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDeletionDto {
    message: &'static str,
    project_id: ProjectId,
    unassigned_tasks: usize,
    affected_members: Vec<MemberLoad>,
}

impl From<ProjectDeletion> for ProjectDeletionDto {
    fn from(d: ProjectDeletion) -> Self {
        Self {
            message: "Project deleted",
            project_id: d.project_id,
            unassigned_tasks: d.unassigned_tasks,
            affected_members: d.affected_members,
        }
    }
}

/// Deletion result with a confirmation message.
#[derive(Debug, Serialize)]
pub struct Deleted<T> {
    message: &'static str,
    #[serde(flatten)]
    detail: T,
}

impl From<TeamDeletion> for Deleted<TeamDeletion> {
    fn from(detail: TeamDeletion) -> Self {
        Self {
            message: "Team deleted",
            detail,
        }
    }
}

impl From<MemberRemoval> for Deleted<MemberRemoval> {
    fn from(detail: MemberRemoval) -> Self {
        Self {
            message: "Member removed",
            detail,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────────────────────────

/// Member reference in a log entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    member_id: MemberId,
    name: String,
}

/// A reassignment log entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDto {
    #[serde(rename = "_id")]
    id: LogId,
    task_id: TaskId,
    task_title: String,
    team_id: Option<TeamId>,
    from_member: Option<MemberRef>,
    to_member: MemberRef,
    created_at: String,
}

impl From<ReassignmentLog> for LogDto {
    fn from(log: ReassignmentLog) -> Self {
        let from_member = log.from_member_id.map(|member_id| MemberRef {
            member_id,
            name: log.from_member_name.unwrap_or_default(),
        });
        Self {
            id: log.id,
            task_id: log.task_id,
            task_title: log.task_title,
            team_id: log.team_id,
            from_member,
            to_member: MemberRef {
                member_id: log.to_member_id,
                name: log.to_member_name,
            },
            created_at: log.created_at,
        }
    }
}

/// One team in the dashboard summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummaryDto {
    team_id: TeamId,
    team_name: String,
    members: Vec<MemberLoad>,
    total_tasks: u32,
    overloaded_count: u32,
}

impl From<TeamSummary> for TeamSummaryDto {
    fn from(s: TeamSummary) -> Self {
        Self {
            team_id: s.team_id,
            team_name: s.name,
            members: s.members,
            total_tasks: s.total_tasks,
            overloaded_count: s.overloaded_count,
        }
    }
}

/// Dashboard statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    total_projects: u32,
    total_tasks: u32,
    team_summary: Vec<TeamSummaryDto>,
    recent_logs: Vec<LogDto>,
}

impl From<Stats> for StatsDto {
    fn from(s: Stats) -> Self {
        Self {
            total_projects: s.total_projects,
            total_tasks: s.total_tasks,
            team_summary: s.team_summary.into_iter().map(TeamSummaryDto::from).collect(),
            recent_logs: s.recent_logs.into_iter().map(LogDto::from).collect(),
        }
    }
}

/// Rebalancing result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceDto {
    message: String,
    moved_count: usize,
    log: Vec<LogDto>,
    unresolved: Vec<UnresolvedMember>,
    errors: Vec<RebalanceFailure>,
    affected_members: Vec<MemberLoad>,
}

impl From<RebalanceReport> for RebalanceDto {
    fn from(r: RebalanceReport) -> Self {
        let message = match r.moved_count {
            0 => "No tasks needed reassignment".to_string(),
            1 => "Reassigned 1 task".to_string(),
            n => format!("Reassigned {n} tasks"),
        };
        Self {
            message,
            moved_count: r.moved_count,
            log: r.log.into_iter().map(LogDto::from).collect(),
            unresolved: r.unresolved,
            errors: r.errors,
            affected_members: r.affected_members,
        }
    }
}
