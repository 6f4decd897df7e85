//! Task CRUD and assignment.
//!
//! Every assignment change goes through [`check_assignment`] inside a
//! transaction that holds the lock of the task's team, so the load the
//! decision was based on is the load the write applies to.

use crewboard_core::{
    Member, MemberId, Task, TaskCreateParams, TaskFilter, TaskId, TaskUpdateParams, TeamId,
};
use crewboard_store::{MemberRepository, ProjectRepository, TaskRepository};
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

use crate::engine::{Engine, member_loads, required_name, task_view};
use crate::errors::{EngineError, Result};
use crate::projects::project_team;
use crate::resolver::{AssignDecision, check_assignment, load_without_task, pick_auto_assignee};
use crate::views::{AutoAssignOutcome, MemberLoad, TaskMutation, TaskView};

impl Engine {
    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Load a task with display names resolved.
    pub fn get_task(&self, id: &TaskId) -> Result<TaskView> {
        self.read(|conn| {
            let task = TaskRepository::get(conn, id)?.ok_or_else(|| EngineError::task_not_found(id.as_str()))?;
            task_view(conn, task)
        })
    }

    /// List tasks matching a filter, in creation order.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskView>> {
        self.read(|conn| {
            TaskRepository::list(conn, filter)?
                .into_iter()
                .map(|task| task_view(conn, task))
                .collect()
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────

    /// Create a task, optionally assigned.
    ///
    /// An assignment that would exceed the member's capacity fails with
    /// [`EngineError::CapacityWarning`] unless `override_capacity` is set.
    #[instrument(skip(self, params), fields(project_id = %params.project_id))]
    pub fn create_task(&self, params: &TaskCreateParams) -> Result<TaskMutation> {
        let title = required_name("title", &params.title)?;

        let mutation = self.locked_write(
            |conn| project_team(conn, &params.project_id),
            |tx| {
                let project = ProjectRepository::get(tx, &params.project_id)?
                    .ok_or_else(|| EngineError::project_not_found(params.project_id.as_str()))?;

                if let Some(member_id) = &params.assigned_member_id {
                    let member = load_member(tx, member_id)?;
                    let _ = check_assignment(
                        None,
                        Some(&member),
                        project.team_id.as_ref(),
                        params.override_capacity,
                    )?;
                }

                let task = TaskRepository::create(
                    tx,
                    &TaskCreateParams {
                        title: title.clone(),
                        ..params.clone()
                    },
                )?;
                let affected: Vec<MemberId> = task.assigned_member_id.iter().cloned().collect();
                Ok(TaskMutation {
                    affected_members: member_loads(tx, &affected)?,
                    task: Some(task_view(tx, task)?),
                })
            },
        )?;

        log_overloads(&mutation.affected_members);
        if let Some(view) = &mutation.task {
            info!(task_id = %view.task.id, assignee = ?view.task.assigned_member_id, "task created");
        }
        Ok(mutation)
    }

    /// Update a task. Assignment changes and project moves are validated
    /// against the team that owns the (new) project.
    #[instrument(skip(self, updates), fields(task_id = %id))]
    pub fn update_task(&self, id: &TaskId, updates: &TaskUpdateParams) -> Result<TaskMutation> {
        let title = updates.title.as_deref().map(|t| required_name("title", t)).transpose()?;

        let mutation = self.locked_write(
            |conn| {
                let mut teams = task_team(conn, id)?;
                if let Some(project_id) = &updates.project_id {
                    teams.extend(project_team(conn, project_id)?);
                }
                Ok(teams)
            },
            |tx| {
                let current = TaskRepository::get(tx, id)?.ok_or_else(|| EngineError::task_not_found(id.as_str()))?;

                let team_id = match &updates.project_id {
                    Some(project_id) => ProjectRepository::get(tx, project_id)?
                        .ok_or_else(|| EngineError::project_not_found(project_id.as_str()))?
                        .team_id,
                    None => owning_team(tx, &current)?,
                };

                let project_changed = updates
                    .project_id
                    .as_ref()
                    .is_some_and(|p| current.project_id.as_ref() != Some(p));
                let decision = match (&updates.assignment, project_changed) {
                    (Some(target), _) => decide(tx, &current, target.as_ref(), team_id.as_ref(), updates.override_capacity)?,
                    (None, true) => decide(
                        tx,
                        &current,
                        current.assigned_member_id.as_ref(),
                        team_id.as_ref(),
                        updates.override_capacity,
                    )?,
                    (None, false) => AssignDecision::NoOp,
                };

                let _ = TaskRepository::update_fields(
                    tx,
                    id,
                    &TaskUpdateParams {
                        title: title.clone(),
                        ..updates.clone()
                    },
                )?;
                let affected = apply_decision(tx, &current, decision, updates.assignment.as_ref())?;

                let task = TaskRepository::get(tx, id)?.ok_or_else(|| EngineError::task_not_found(id.as_str()))?;
                Ok(TaskMutation {
                    affected_members: member_loads(tx, &affected)?,
                    task: Some(task_view(tx, task)?),
                })
            },
        )?;

        log_overloads(&mutation.affected_members);
        Ok(mutation)
    }

    /// Assign a task to a member, or unassign it with `None`.
    pub fn assign_task(
        &self,
        id: &TaskId,
        member_id: Option<MemberId>,
        override_capacity: bool,
    ) -> Result<TaskMutation> {
        self.update_task(
            id,
            &TaskUpdateParams {
                assignment: Some(member_id),
                override_capacity,
                ..Default::default()
            },
        )
    }

    /// Delete a task, freeing its assignee's slot.
    #[instrument(skip(self), fields(task_id = %id))]
    pub fn delete_task(&self, id: &TaskId) -> Result<TaskMutation> {
        self.locked_write(
            |conn| task_team(conn, id),
            |tx| {
                let task = TaskRepository::get(tx, id)?.ok_or_else(|| EngineError::task_not_found(id.as_str()))?;
                let _ = TaskRepository::delete(tx, id)?;
                let affected: Vec<MemberId> = task.assigned_member_id.into_iter().collect();
                debug!("task deleted");
                Ok(TaskMutation {
                    task: None,
                    affected_members: member_loads(tx, &affected)?,
                })
            },
        )
    }

    /// Assign a task to the least-loaded member of its project's team.
    ///
    /// Capacity is not enforced: when every member is full the least-loaded
    /// one still gets the task and `capacity_exceeded` is set. A team
    /// without members leaves the task unchanged with `member: None`.
    #[instrument(skip(self), fields(task_id = %id))]
    pub fn auto_assign(&self, id: &TaskId) -> Result<AutoAssignOutcome> {
        let outcome = self.locked_write(
            |conn| task_team(conn, id),
            |tx| {
                let task = TaskRepository::get(tx, id)?.ok_or_else(|| EngineError::task_not_found(id.as_str()))?;
                let members = match owning_team(tx, &task)? {
                    Some(team_id) => MemberRepository::list_for_team(tx, &team_id)?,
                    None => Vec::new(),
                };
                let current = task.assigned_member_id.clone();

                let Some(chosen) = pick_auto_assignee(&members, current.as_ref()) else {
                    debug!("no members to choose from");
                    return Ok(AutoAssignOutcome {
                        task: task_view(tx, task)?,
                        member: None,
                        capacity_exceeded: false,
                        affected_members: Vec::new(),
                    });
                };
                let capacity_exceeded = load_without_task(chosen, current.as_ref())
                    .with_added()
                    .is_overloaded();
                let chosen_id = chosen.id.clone();

                let mut affected = Vec::new();
                if current.as_ref() != Some(&chosen_id) {
                    let _ = TaskRepository::set_assignee(tx, id, Some(&chosen_id))?;
                    affected.extend(current);
                    affected.push(chosen_id.clone());
                }

                let task = TaskRepository::get(tx, id)?.ok_or_else(|| EngineError::task_not_found(id.as_str()))?;
                let member = MemberRepository::get(tx, &chosen_id)?.map(|m| MemberLoad::from(&m));
                Ok(AutoAssignOutcome {
                    task: task_view(tx, task)?,
                    member,
                    capacity_exceeded,
                    affected_members: member_loads(tx, &affected)?,
                })
            },
        )?;

        if let Some(member) = &outcome.member {
            info!(member_id = %member.member_id, capacity_exceeded = outcome.capacity_exceeded, "task auto-assigned");
        }
        Ok(outcome)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Team of a task's project as a lock set.
fn task_team(conn: &Connection, id: &TaskId) -> Result<Vec<TeamId>> {
    match TaskRepository::get(conn, id)?.and_then(|t| t.project_id) {
        Some(project_id) => project_team(conn, &project_id),
        None => Ok(Vec::new()),
    }
}

/// Team owning the task's current project.
fn owning_team(conn: &Connection, task: &Task) -> Result<Option<TeamId>> {
    match &task.project_id {
        Some(project_id) => Ok(ProjectRepository::get(conn, project_id)?.and_then(|p| p.team_id)),
        None => Ok(None),
    }
}

fn load_member(conn: &Connection, id: &MemberId) -> Result<Member> {
    MemberRepository::get(conn, id)?.ok_or_else(|| EngineError::member_not_found(id.as_str()))
}

fn decide(
    conn: &Connection,
    task: &Task,
    target: Option<&MemberId>,
    team_id: Option<&TeamId>,
    override_capacity: bool,
) -> Result<AssignDecision> {
    let member = target.map(|id| load_member(conn, id)).transpose()?;
    check_assignment(
        task.assigned_member_id.as_ref(),
        member.as_ref(),
        team_id,
        override_capacity,
    )
}

/// Write the assignment outcome; returns the members whose count changed.
fn apply_decision(
    conn: &Connection,
    task: &Task,
    decision: AssignDecision,
    requested: Option<&Option<MemberId>>,
) -> Result<Vec<MemberId>> {
    let mut affected: Vec<MemberId> = Vec::new();
    match decision {
        AssignDecision::NoOp => {}
        AssignDecision::Unassign => {
            let _ = TaskRepository::set_assignee(conn, &task.id, None)?;
            affected.extend(task.assigned_member_id.iter().cloned());
        }
        AssignDecision::Assign => {
            if let Some(Some(target)) = requested {
                let _ = TaskRepository::set_assignee(conn, &task.id, Some(target))?;
                affected.extend(task.assigned_member_id.iter().cloned());
                affected.push(target.clone());
            }
        }
    }
    Ok(affected)
}

fn log_overloads(members: &[MemberLoad]) {
    for m in members.iter().filter(|m| m.is_overloaded) {
        warn!(
            member_id = %m.member_id,
            current_tasks = m.current_tasks,
            capacity = %m.capacity,
            "member over capacity"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support;
    use assert_matches::assert_matches;
    use crewboard_core::{
        MemberCreateParams, ProjectCreateParams, ProjectId, TaskPriority, TaskStatus,
        TeamCreateParams,
    };

    struct Fixture {
        engine: Engine,
        team: TeamId,
        project: ProjectId,
    }

    fn fixture() -> Fixture {
        let engine = test_support::engine();
        let team = engine
            .create_team(&TeamCreateParams {
                name: "Core".into(),
                description: None,
            })
            .unwrap()
            .id;
        let project = engine
            .create_project(&ProjectCreateParams {
                name: "App".into(),
                description: None,
                team_id: team.clone(),
            })
            .unwrap()
            .project
            .id;
        Fixture { engine, team, project }
    }

    impl Fixture {
        fn member(&self, name: &str, capacity: i64) -> MemberId {
            self.engine
                .add_member(
                    &self.team,
                    &MemberCreateParams {
                        name: name.into(),
                        role: None,
                        capacity: Some(capacity),
                    },
                )
                .unwrap()
                .id
        }

        fn task(&self, assignee: Option<&MemberId>) -> Result<TaskMutation> {
            self.engine.create_task(&TaskCreateParams {
                title: "Task".into(),
                project_id: self.project.clone(),
                assigned_member_id: assignee.cloned(),
                override_capacity: true,
                ..Default::default()
            })
        }

        fn task_id(&self, assignee: Option<&MemberId>) -> TaskId {
            self.task(assignee).unwrap().task.unwrap().task.id
        }

        fn load(&self, id: &MemberId) -> u32 {
            self.engine
                .get_team(&self.team)
                .unwrap()
                .member(id)
                .unwrap()
                .current_tasks
        }

        /// currentTasks of every member equals the number of tasks pointing at them.
        fn assert_counts_consistent(&self) {
            let tasks = self.engine.list_tasks(&TaskFilter::default()).unwrap();
            for team in self.engine.list_teams().unwrap() {
                for m in &team.members {
                    let held = tasks
                        .iter()
                        .filter(|t| t.task.assigned_member_id.as_ref() == Some(&m.id))
                        .count();
                    assert_eq!(m.current_tasks as usize, held, "count drift for {}", m.name);
                }
            }
        }
    }

    #[test]
    fn create_with_assignment_reports_affected_member() {
        let f = fixture();
        let ann = f.member("Ann", 3);
        let mutation = f.task(Some(&ann)).unwrap();
        let view = mutation.task.unwrap();
        assert_eq!(view.assignee_name.as_deref(), Some("Ann"));
        assert_eq!(view.project_name.as_deref(), Some("App"));
        assert_eq!(mutation.affected_members.len(), 1);
        assert_eq!(mutation.affected_members[0].current_tasks, 1);
    }

    #[test]
    fn create_requires_title_and_project() {
        let f = fixture();
        let blank = f.engine.create_task(&TaskCreateParams {
            title: " ".into(),
            project_id: f.project.clone(),
            ..Default::default()
        });
        assert_matches!(blank, Err(EngineError::Validation(_)));

        let missing = f.engine.create_task(&TaskCreateParams {
            title: "t".into(),
            project_id: ProjectId::from("proj-x"),
            ..Default::default()
        });
        assert_matches!(missing, Err(EngineError::NotFound { entity: "Project", .. }));
    }

    #[test]
    fn create_over_capacity_warns_without_override() {
        let f = fixture();
        let ann = f.member("Ann", 1);
        let _ = f.task_id(Some(&ann));
        let result = f.engine.create_task(&TaskCreateParams {
            title: "second".into(),
            project_id: f.project.clone(),
            assigned_member_id: Some(ann.clone()),
            ..Default::default()
        });
        assert_matches!(result, Err(EngineError::CapacityWarning { member }) if member.current_tasks == 1);
        assert_eq!(f.load(&ann), 1);
    }

    #[test]
    fn zero_capacity_member_requires_override() {
        let f = fixture();
        let zed = f.member("Zed", 0);
        let task = f.task_id(None);
        assert_matches!(
            f.engine.assign_task(&task, Some(zed.clone()), false),
            Err(EngineError::CapacityWarning { .. })
        );
        let mutation = f.engine.assign_task(&task, Some(zed.clone()), true).unwrap();
        assert_eq!(mutation.task.unwrap().task.assigned_member_id, Some(zed.clone()));
        assert_eq!(f.load(&zed), 1);
    }

    #[test]
    fn reassign_moves_the_count() {
        let f = fixture();
        let ann = f.member("Ann", 3);
        let bob = f.member("Bob", 3);
        let task = f.task_id(Some(&ann));

        let mutation = f.engine.assign_task(&task, Some(bob.clone()), false).unwrap();
        let mut affected: Vec<(MemberId, u32)> = mutation
            .affected_members
            .iter()
            .map(|m| (m.member_id.clone(), m.current_tasks))
            .collect();
        affected.sort();
        let mut expected = vec![(ann.clone(), 0), (bob.clone(), 1)];
        expected.sort();
        assert_eq!(affected, expected);
        f.assert_counts_consistent();
    }

    #[test]
    fn reassign_to_same_member_is_noop() {
        let f = fixture();
        let ann = f.member("Ann", 1);
        let task = f.task_id(Some(&ann));
        let _ = f.task_id(Some(&ann));
        // Ann is over capacity (2/1); re-assigning her own task must not warn.
        let mutation = f.engine.assign_task(&task, Some(ann.clone()), false).unwrap();
        assert!(mutation.affected_members.is_empty());
        assert_eq!(f.load(&ann), 2);
    }

    #[test]
    fn unassign_always_succeeds() {
        let f = fixture();
        let ann = f.member("Ann", 0);
        let task = f.task_id(Some(&ann));
        let mutation = f.engine.assign_task(&task, None, false).unwrap();
        let view = mutation.task.unwrap();
        assert!(view.task.assigned_member_id.is_none());
        assert!(view.assignee_name.is_none());
        assert_eq!(mutation.affected_members[0].current_tasks, 0);
    }

    #[test]
    fn member_of_other_team_is_rejected() {
        let f = fixture();
        let other = f
            .engine
            .create_team(&TeamCreateParams {
                name: "Other".into(),
                description: None,
            })
            .unwrap()
            .id;
        let outsider = f
            .engine
            .add_member(
                &other,
                &MemberCreateParams {
                    name: "Out".into(),
                    ..Default::default()
                },
            )
            .unwrap()
            .id;
        let task = f.task_id(None);
        assert_matches!(
            f.engine.assign_task(&task, Some(outsider), true),
            Err(EngineError::Validation(_))
        );
        assert_matches!(
            f.engine.assign_task(&task, Some(MemberId::from("mem-x")), true),
            Err(EngineError::NotFound { entity: "Member", .. })
        );
    }

    #[test]
    fn moving_task_to_project_of_other_team_revalidates_assignee() {
        let f = fixture();
        let ann = f.member("Ann", 3);
        let task = f.task_id(Some(&ann));
        let other = f
            .engine
            .create_team(&TeamCreateParams {
                name: "Other".into(),
                description: None,
            })
            .unwrap()
            .id;
        let foreign = f
            .engine
            .create_project(&ProjectCreateParams {
                name: "Foreign".into(),
                description: None,
                team_id: other,
            })
            .unwrap()
            .project
            .id;

        let result = f.engine.update_task(
            &task,
            &TaskUpdateParams {
                project_id: Some(foreign.clone()),
                ..Default::default()
            },
        );
        assert_matches!(result, Err(EngineError::Validation(_)));

        // Moving and unassigning in the same request is fine.
        let moved = f
            .engine
            .update_task(
                &task,
                &TaskUpdateParams {
                    project_id: Some(foreign.clone()),
                    assignment: Some(None),
                    ..Default::default()
                },
            )
            .unwrap()
            .task
            .unwrap();
        assert_eq!(moved.task.project_id, Some(foreign));
        assert!(moved.task.assigned_member_id.is_none());
        f.assert_counts_consistent();
    }

    #[test]
    fn update_plain_fields() {
        let f = fixture();
        let task = f.task_id(None);
        let view = f
            .engine
            .update_task(
                &task,
                &TaskUpdateParams {
                    title: Some("Renamed".into()),
                    status: Some(TaskStatus::InProgress),
                    priority: Some(TaskPriority::High),
                    ..Default::default()
                },
            )
            .unwrap()
            .task
            .unwrap();
        assert_eq!(view.task.title, "Renamed");
        assert_eq!(view.task.status, TaskStatus::InProgress);
        assert_eq!(view.task.priority, TaskPriority::High);
    }

    #[test]
    fn failed_assignment_leaves_no_partial_update() {
        let f = fixture();
        let ann = f.member("Ann", 0);
        let task = f.task_id(None);
        let result = f.engine.update_task(
            &task,
            &TaskUpdateParams {
                title: Some("Changed".into()),
                assignment: Some(Some(ann)),
                ..Default::default()
            },
        );
        assert_matches!(result, Err(EngineError::CapacityWarning { .. }));
        assert_eq!(f.engine.get_task(&task).unwrap().task.title, "Task");
    }

    #[test]
    fn delete_frees_slot() {
        let f = fixture();
        let ann = f.member("Ann", 1);
        let task = f.task_id(Some(&ann));
        let mutation = f.engine.delete_task(&task).unwrap();
        assert!(mutation.task.is_none());
        assert_eq!(mutation.affected_members[0].current_tasks, 0);
        assert_matches!(f.engine.get_task(&task), Err(EngineError::NotFound { .. }));
    }

    #[test]
    fn auto_assign_picks_least_loaded() {
        let f = fixture();
        let a = f.member("A", 5);
        let b = f.member("B", 5);
        for _ in 0..2 {
            let _ = f.task_id(Some(&a));
        }
        for _ in 0..4 {
            let _ = f.task_id(Some(&b));
        }
        let task = f.task_id(None);

        let outcome = f.engine.auto_assign(&task).unwrap();
        assert_eq!(outcome.member.as_ref().map(|m| m.member_id.clone()), Some(a.clone()));
        assert!(!outcome.capacity_exceeded);
        assert_eq!(outcome.task.task.assigned_member_id, Some(a.clone()));
        assert_eq!(f.load(&a), 3);
    }

    #[test]
    fn auto_assign_without_members_returns_none() {
        let f = fixture();
        let task = f.task_id(None);
        let outcome = f.engine.auto_assign(&task).unwrap();
        assert!(outcome.member.is_none());
        assert!(outcome.task.task.assigned_member_id.is_none());
        assert!(outcome.affected_members.is_empty());
    }

    #[test]
    fn auto_assign_when_everyone_is_full_reports_exceeded() {
        let f = fixture();
        let a = f.member("A", 1);
        let _ = f.task_id(Some(&a));
        let task = f.task_id(None);
        let outcome = f.engine.auto_assign(&task).unwrap();
        assert_eq!(outcome.member.map(|m| m.member_id), Some(a.clone()));
        assert!(outcome.capacity_exceeded);
        assert_eq!(f.load(&a), 2);
    }

    #[test]
    fn auto_assign_keeps_best_current_assignee() {
        let f = fixture();
        let a = f.member("A", 3);
        let _b = f.member("B", 1);
        let task = f.task_id(Some(&a));
        let outcome = f.engine.auto_assign(&task).unwrap();
        assert_eq!(outcome.member.map(|m| m.member_id), Some(a.clone()));
        assert!(outcome.affected_members.is_empty());
        assert_eq!(f.load(&a), 1);
    }

    #[test]
    fn list_filters_by_member_and_status() {
        let f = fixture();
        let ann = f.member("Ann", 5);
        let t1 = f.task_id(Some(&ann));
        let _ = f.task_id(None);
        let _ = f
            .engine
            .update_task(
                &t1,
                &TaskUpdateParams {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .unwrap();

        let mine = f
            .engine
            .list_tasks(&TaskFilter {
                member_id: Some(ann),
                status: Some(TaskStatus::Done),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].task.id, t1);
        assert_eq!(f.engine.list_tasks(&TaskFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn concurrent_assignments_respect_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_support::file_engine(dir.path());
        let team = engine
            .create_team(&TeamCreateParams {
                name: "T".into(),
                description: None,
            })
            .unwrap()
            .id;
        let project = engine
            .create_project(&ProjectCreateParams {
                name: "P".into(),
                description: None,
                team_id: team.clone(),
            })
            .unwrap()
            .project
            .id;
        let ann = engine
            .add_member(
                &team,
                &MemberCreateParams {
                    name: "Ann".into(),
                    role: None,
                    capacity: Some(2),
                },
            )
            .unwrap()
            .id;

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let engine = engine.clone();
                let project = project.clone();
                let ann = ann.clone();
                std::thread::spawn(move || {
                    engine
                        .create_task(&TaskCreateParams {
                            title: format!("t{i}"),
                            project_id: project,
                            assigned_member_id: Some(ann),
                            ..Default::default()
                        })
                        .is_ok()
                })
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(created, 2);
        let member = engine.get_team(&team).unwrap().members.remove(0);
        assert_eq!(member.current_tasks, 2);
    }
}
