use crewboard_core::{
    MemberId, ProjectId, Task, TaskCreateParams, TaskFilter, TaskId, TaskPriority, TaskStatus,
    TaskUpdateParams, TeamId,
};
use rusqlite::{Connection, OptionalExtension, params};

use super::{DynParams, now_iso, param_refs};
use crate::errors::{Result, StoreError};

const TASK_COLUMNS: &str = "id, title, description, project_id, assigned_member_id, priority, status,
        assign_seq, created_at, updated_at";

/// Next assignment sequence number.
const NEXT_SEQ: &str = "(SELECT COALESCE(MAX(assign_seq), 0) + 1 FROM tasks)";

/// Task persistence.
///
/// Every assignment stamps `assign_seq` with a new maximum so the most
/// recently assigned task of a member can be found without timestamps.
pub struct TaskRepository;

impl TaskRepository {
    // ─────────────────────────────────────────────────────────────────────
    // CRUD
    // ─────────────────────────────────────────────────────────────────────

    /// Insert a task with its initial assignee (if any).
    pub fn create(conn: &Connection, params: &TaskCreateParams) -> Result<Task> {
        let id = TaskId::new();
        let now = now_iso();
        let priority = params.priority.unwrap_or_default();
        let status = params.status.unwrap_or_default();
        let description = params.description.clone().unwrap_or_default();
        let assignee = params.assigned_member_id.as_ref().map(MemberId::as_str);

        let _ = conn.execute(
            &format!(
                "INSERT INTO tasks (id, title, description, project_id, assigned_member_id,
                 priority, status, assign_seq, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                         CASE WHEN ?5 IS NULL THEN NULL ELSE {NEXT_SEQ} END, ?8, ?8)"
            ),
            params![
                id.as_str(),
                params.title,
                description,
                params.project_id.as_str(),
                assignee,
                priority.as_sql(),
                status.as_sql(),
                now,
            ],
        )?;

        Self::get(conn, &id)?.ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Load a task.
    pub fn get(conn: &Connection, id: &TaskId) -> Result<Option<Task>> {
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id.as_str()],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// List tasks matching a filter, in creation order.
    pub fn list(conn: &Connection, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: DynParams = Vec::new();

        if let Some(ref pid) = filter.project_id {
            conditions.push("project_id = ?");
            values.push(Box::new(pid.to_string()));
        }
        if let Some(ref mid) = filter.member_id {
            conditions.push("assigned_member_id = ?");
            values.push(Box::new(mid.to_string()));
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?");
            values.push(Box::new(status.as_sql()));
        }
        if let Some(priority) = filter.priority {
            conditions.push("priority = ?");
            values.push(Box::new(priority.as_sql()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks {where_clause} ORDER BY rowid");
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(param_refs(&values).as_slice(), task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Update the non-assignment fields. Returns `None` if not found.
    ///
    /// `assignment` in `updates` is ignored; use [`Self::set_assignee`].
    pub fn update_fields(conn: &Connection, id: &TaskId, updates: &TaskUpdateParams) -> Result<Option<Task>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: DynParams = Vec::new();

        if let Some(ref title) = updates.title {
            sets.push("title = ?");
            values.push(Box::new(title.clone()));
        }
        if let Some(ref desc) = updates.description {
            sets.push("description = ?");
            values.push(Box::new(desc.clone()));
        }
        if let Some(ref pid) = updates.project_id {
            sets.push("project_id = ?");
            values.push(Box::new(pid.to_string()));
        }
        if let Some(priority) = updates.priority {
            sets.push("priority = ?");
            values.push(Box::new(priority.as_sql()));
        }
        if let Some(status) = updates.status {
            sets.push("status = ?");
            values.push(Box::new(status.as_sql()));
        }

        if sets.is_empty() {
            return Self::get(conn, id);
        }

        sets.push("updated_at = ?");
        values.push(Box::new(now_iso()));
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let changed = conn.execute(&sql, param_refs(&values).as_slice())?;
        if changed == 0 {
            return Ok(None);
        }
        Self::get(conn, id)
    }

    /// Set or clear the assignee. Returns true if the task exists.
    pub fn set_assignee(conn: &Connection, id: &TaskId, member_id: Option<&MemberId>) -> Result<bool> {
        let changed = match member_id {
            Some(member_id) => conn.execute(
                &format!(
                    "UPDATE tasks SET assigned_member_id = ?1, assign_seq = {NEXT_SEQ}, updated_at = ?2
                     WHERE id = ?3"
                ),
                params![member_id.as_str(), now_iso(), id.as_str()],
            )?,
            None => conn.execute(
                "UPDATE tasks SET assigned_member_id = NULL, assign_seq = NULL, updated_at = ?1
                 WHERE id = ?2",
                params![now_iso(), id.as_str()],
            )?,
        };
        Ok(changed > 0)
    }

    /// Delete a task. Returns true if a row was deleted.
    pub fn delete(conn: &Connection, id: &TaskId) -> Result<bool> {
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }

    /// Number of tasks.
    pub fn count(conn: &Connection) -> Result<u32> {
        Ok(conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Assignment queries
    // ─────────────────────────────────────────────────────────────────────

    /// A member's tasks, most recently assigned first (ties by id, descending).
    pub fn list_for_member(conn: &Connection, member_id: &MemberId) -> Result<Vec<Task>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_member_id = ?1
             ORDER BY assign_seq DESC, id DESC"
        ))?;
        let tasks = stmt
            .query_map(params![member_id.as_str()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Distinct assignees of a project's tasks.
    pub fn assignees_for_project(conn: &Connection, project_id: &ProjectId) -> Result<Vec<MemberId>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT assigned_member_id FROM tasks
             WHERE project_id = ?1 AND assigned_member_id IS NOT NULL
             ORDER BY assigned_member_id",
        )?;
        let ids = stmt
            .query_map(params![project_id.as_str()], |row| row.get::<_, String>(0).map(MemberId::from))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Unassign every task of a member. Returns the number of tasks changed.
    pub fn unassign_for_member(conn: &Connection, member_id: &MemberId) -> Result<usize> {
        Ok(conn.execute(
            "UPDATE tasks SET assigned_member_id = NULL, assign_seq = NULL, updated_at = ?1
             WHERE assigned_member_id = ?2",
            params![now_iso(), member_id.as_str()],
        )?)
    }

    /// Unassign every task held by a member of the team.
    pub fn unassign_for_team(conn: &Connection, team_id: &TeamId) -> Result<usize> {
        Ok(conn.execute(
            "UPDATE tasks SET assigned_member_id = NULL, assign_seq = NULL, updated_at = ?1
             WHERE assigned_member_id IN (SELECT id FROM members WHERE team_id = ?2)",
            params![now_iso(), team_id.as_str()],
        )?)
    }

    /// Unassign every task of a project.
    pub fn unassign_for_project(conn: &Connection, project_id: &ProjectId) -> Result<usize> {
        Ok(conn.execute(
            "UPDATE tasks SET assigned_member_id = NULL, assign_seq = NULL, updated_at = ?1
             WHERE project_id = ?2 AND assigned_member_id IS NOT NULL",
            params![now_iso(), project_id.as_str()],
        )?)
    }

    /// Unassign a project's tasks whose assignee is not in `team_id`.
    ///
    /// Returns the number of tasks changed and the distinct previous assignees.
    pub fn unassign_outside_team(
        conn: &Connection,
        project_id: &ProjectId,
        team_id: &TeamId,
    ) -> Result<(usize, Vec<MemberId>)> {
        const OUTSIDE: &str = "project_id = ?1 AND assigned_member_id IS NOT NULL
             AND assigned_member_id NOT IN (SELECT id FROM members WHERE team_id = ?2)";

        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT assigned_member_id FROM tasks WHERE {OUTSIDE} ORDER BY assigned_member_id"
        ))?;
        let previous = stmt
            .query_map(params![project_id.as_str(), team_id.as_str()], |row| {
                row.get::<_, String>(0).map(MemberId::from)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if previous.is_empty() {
            return Ok((0, previous));
        }
        let changed = conn.execute(
            &format!(
                "UPDATE tasks SET assigned_member_id = NULL, assign_seq = NULL, updated_at = ?3
                 WHERE {OUTSIDE}"
            ),
            params![project_id.as_str(), team_id.as_str(), now_iso()],
        )?;
        Ok((changed, previous))
    }
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get("priority")?;
    let status: String = row.get("status")?;
    Ok(Task {
        id: TaskId::from(row.get::<_, String>("id")?),
        title: row.get("title")?,
        description: row.get("description")?,
        project_id: row.get::<_, Option<String>>("project_id")?.map(ProjectId::from),
        assigned_member_id: row
            .get::<_, Option<String>>("assigned_member_id")?
            .map(MemberId::from),
        priority: TaskPriority::from_sql(&priority).unwrap_or_default(),
        status: TaskStatus::from_sql(&status).unwrap_or_default(),
        assign_seq: row.get("assign_seq")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MemberRepository, ProjectRepository, TeamRepository, test_support};
    use crewboard_core::{Capacity, ProjectCreateParams, TeamCreateParams};

    struct Fixture {
        conn: Connection,
        team: TeamId,
        project: ProjectId,
        ann: MemberId,
        bob: MemberId,
    }

    fn fixture() -> Fixture {
        let conn = test_support::conn();
        let team = TeamRepository::create(
            &conn,
            &TeamCreateParams {
                name: "T".into(),
                description: None,
            },
        )
        .unwrap()
        .id;
        let project = ProjectRepository::create(
            &conn,
            &ProjectCreateParams {
                name: "P".into(),
                description: None,
                team_id: team.clone(),
            },
        )
        .unwrap()
        .id;
        let ann = MemberRepository::create(&conn, &team, "Ann", "", Capacity::default()).unwrap().id;
        let bob = MemberRepository::create(&conn, &team, "Bob", "", Capacity::default()).unwrap().id;
        Fixture {
            conn,
            team,
            project,
            ann,
            bob,
        }
    }

    fn task(f: &Fixture, title: &str, assignee: Option<&MemberId>) -> Task {
        TaskRepository::create(
            &f.conn,
            &TaskCreateParams {
                title: title.into(),
                project_id: f.project.clone(),
                assigned_member_id: assignee.cloned(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn create_defaults() {
        let f = fixture();
        let t = task(&f, "Write docs", None);
        assert!(t.id.starts_with("task-"));
        assert_eq!(t.priority, TaskPriority::Medium);
        assert_eq!(t.status, TaskStatus::Pending);
        assert!(t.assigned_member_id.is_none());
        assert!(t.assign_seq.is_none());
        assert_eq!(t.project_id, Some(f.project.clone()));
    }

    #[test]
    fn assignment_sequence_increases() {
        let f = fixture();
        let a = task(&f, "a", Some(&f.ann));
        let b = task(&f, "b", Some(&f.ann));
        assert!(b.assign_seq > a.assign_seq);

        assert!(TaskRepository::set_assignee(&f.conn, &a.id, Some(&f.ann)).unwrap());
        let a = TaskRepository::get(&f.conn, &a.id).unwrap().unwrap();
        assert!(a.assign_seq > b.assign_seq);

        let ordered: Vec<TaskId> = TaskRepository::list_for_member(&f.conn, &f.ann)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ordered, vec![a.id, b.id]);
    }

    #[test]
    fn unassign_clears_sequence() {
        let f = fixture();
        let t = task(&f, "a", Some(&f.ann));
        assert!(TaskRepository::set_assignee(&f.conn, &t.id, None).unwrap());
        let t = TaskRepository::get(&f.conn, &t.id).unwrap().unwrap();
        assert!(t.assigned_member_id.is_none());
        assert!(t.assign_seq.is_none());
        assert!(!TaskRepository::set_assignee(&f.conn, &TaskId::from("task-x"), None).unwrap());
    }

    #[test]
    fn list_filters() {
        let f = fixture();
        let a = task(&f, "a", Some(&f.ann));
        let _ = task(&f, "b", Some(&f.bob));
        let _ = TaskRepository::update_fields(
            &f.conn,
            &a.id,
            &TaskUpdateParams {
                status: Some(TaskStatus::Done),
                priority: Some(TaskPriority::High),
                ..Default::default()
            },
        )
        .unwrap();

        let by_member = TaskRepository::list(
            &f.conn,
            &TaskFilter {
                member_id: Some(f.ann.clone()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_member.len(), 1);

        let done_high = TaskRepository::list(
            &f.conn,
            &TaskFilter {
                status: Some(TaskStatus::Done),
                priority: Some(TaskPriority::High),
                project_id: Some(f.project.clone()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(done_high.len(), 1);
        assert_eq!(done_high[0].id, a.id);

        assert_eq!(TaskRepository::list(&f.conn, &TaskFilter::default()).unwrap().len(), 2);
        assert_eq!(TaskRepository::count(&f.conn).unwrap(), 2);
    }

    #[test]
    fn update_fields_ignores_assignment() {
        let f = fixture();
        let t = task(&f, "a", Some(&f.ann));
        let updated = TaskRepository::update_fields(
            &f.conn,
            &t.id,
            &TaskUpdateParams {
                title: Some("renamed".into()),
                assignment: Some(None),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.assigned_member_id, Some(f.ann.clone()));
    }

    #[test]
    fn bulk_unassign() {
        let f = fixture();
        let _ = task(&f, "a", Some(&f.ann));
        let _ = task(&f, "b", Some(&f.ann));
        let _ = task(&f, "c", Some(&f.bob));
        assert_eq!(
            TaskRepository::assignees_for_project(&f.conn, &f.project).unwrap(),
            {
                let mut ids = vec![f.ann.clone(), f.bob.clone()];
                ids.sort();
                ids
            }
        );
        assert_eq!(TaskRepository::unassign_for_member(&f.conn, &f.ann).unwrap(), 2);
        assert_eq!(TaskRepository::unassign_for_team(&f.conn, &f.team).unwrap(), 1);
        assert_eq!(TaskRepository::unassign_for_project(&f.conn, &f.project).unwrap(), 0);
    }

    #[test]
    fn unassign_outside_team_only_touches_foreign_assignees() {
        let f = fixture();
        let other = TeamRepository::create(
            &f.conn,
            &TeamCreateParams {
                name: "Other".into(),
                description: None,
            },
        )
        .unwrap()
        .id;
        let carl = MemberRepository::create(&f.conn, &other, "Carl", "", Capacity::default())
            .unwrap()
            .id;
        let kept = task(&f, "kept", Some(&carl));
        let dropped = task(&f, "dropped", Some(&f.ann));

        let (changed, previous) =
            TaskRepository::unassign_outside_team(&f.conn, &f.project, &other).unwrap();
        assert_eq!(changed, 1);
        assert_eq!(previous, vec![f.ann.clone()]);
        assert_eq!(
            TaskRepository::get(&f.conn, &kept.id).unwrap().unwrap().assigned_member_id,
            Some(carl)
        );
        assert!(
            TaskRepository::get(&f.conn, &dropped.id)
                .unwrap()
                .unwrap()
                .assigned_member_id
                .is_none()
        );
    }

    #[test]
    fn delete_task() {
        let f = fixture();
        let t = task(&f, "a", None);
        assert!(TaskRepository::delete(&f.conn, &t.id).unwrap());
        assert!(TaskRepository::get(&f.conn, &t.id).unwrap().is_none());
    }
}
