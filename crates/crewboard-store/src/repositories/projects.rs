use crewboard_core::{Project, ProjectCreateParams, ProjectId, TeamId};
use rusqlite::{Connection, OptionalExtension, params};

use super::{DynParams, now_iso, param_refs};
use crate::errors::Result;

const PROJECT_SELECT: &str = "SELECT p.id, p.name, p.description, p.team_id, p.created_at, p.updated_at,
        (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count
   FROM projects p";

/// Project persistence.
pub struct ProjectRepository;

impl ProjectRepository {
    /// Insert a project. The team must exist (foreign key).
    pub fn create(conn: &Connection, params: &ProjectCreateParams) -> Result<Project> {
        let id = ProjectId::new();
        let now = now_iso();
        let description = params.description.clone().unwrap_or_default();
        let _ = conn.execute(
            "INSERT INTO projects (id, name, description, team_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id.as_str(), params.name, description, params.team_id.as_str(), now],
        )?;
        Ok(Project {
            id,
            name: params.name.clone(),
            description,
            team_id: Some(params.team_id.clone()),
            task_count: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Load a project.
    pub fn get(conn: &Connection, id: &ProjectId) -> Result<Option<Project>> {
        let project = conn
            .query_row(
                &format!("{PROJECT_SELECT} WHERE p.id = ?1"),
                params![id.as_str()],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    /// All projects in creation order.
    pub fn list(conn: &Connection) -> Result<Vec<Project>> {
        let mut stmt = conn.prepare(&format!("{PROJECT_SELECT} ORDER BY p.rowid"))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Ids of the projects owned by a team.
    pub fn ids_for_team(conn: &Connection, team_id: &TeamId) -> Result<Vec<ProjectId>> {
        let mut stmt = conn.prepare("SELECT id FROM projects WHERE team_id = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![team_id.as_str()], |row| row.get::<_, String>(0).map(ProjectId::from))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Apply a partial update. Returns `None` if the project does not exist.
    pub fn update(
        conn: &Connection,
        id: &ProjectId,
        name: Option<&str>,
        description: Option<&str>,
        team_id: Option<&TeamId>,
    ) -> Result<Option<Project>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: DynParams = Vec::new();

        if let Some(name) = name {
            sets.push("name = ?");
            values.push(Box::new(name.to_string()));
        }
        if let Some(description) = description {
            sets.push("description = ?");
            values.push(Box::new(description.to_string()));
        }
        if let Some(team_id) = team_id {
            sets.push("team_id = ?");
            values.push(Box::new(team_id.to_string()));
        }

        if sets.is_empty() {
            return Self::get(conn, id);
        }

        sets.push("updated_at = ?");
        values.push(Box::new(now_iso()));
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE projects SET {} WHERE id = ?", sets.join(", "));
        let changed = conn.execute(&sql, param_refs(&values).as_slice())?;
        if changed == 0 {
            return Ok(None);
        }
        Self::get(conn, id)
    }

    /// Delete a project (its tasks keep existing with no project).
    pub fn delete(conn: &Connection, id: &ProjectId) -> Result<bool> {
        let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }

    /// Number of projects.
    pub fn count(conn: &Connection) -> Result<u32> {
        Ok(conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?)
    }
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId::from(row.get::<_, String>("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        team_id: row.get::<_, Option<String>>("team_id")?.map(TeamId::from),
        task_count: row.get("task_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
