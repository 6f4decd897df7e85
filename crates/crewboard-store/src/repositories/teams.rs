use crewboard_core::{Team, TeamCreateParams, TeamId, TeamUpdateParams};
use rusqlite::{Connection, OptionalExtension, params};

use super::{DynParams, MemberRepository, now_iso, param_refs};
use crate::errors::Result;

const TEAM_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Team persistence.
pub struct TeamRepository;

impl TeamRepository {
    /// Insert a team. The returned team has no members.
    pub fn create(conn: &Connection, params: &TeamCreateParams) -> Result<Team> {
        let id = TeamId::new();
        let now = now_iso();
        let description = params.description.clone().unwrap_or_default();
        let _ = conn.execute(
            "INSERT INTO teams (id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id.as_str(), params.name, description, now],
        )?;
        Ok(Team {
            id,
            name: params.name.clone(),
            description,
            members: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Load a team with its members.
    pub fn get(conn: &Connection, id: &TeamId) -> Result<Option<Team>> {
        let team = conn
            .query_row(
                &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?1"),
                params![id.as_str()],
                team_from_row,
            )
            .optional()?;
        match team {
            Some(mut team) => {
                team.members = MemberRepository::list_for_team(conn, &team.id)?;
                Ok(Some(team))
            }
            None => Ok(None),
        }
    }

    /// Whether a team exists.
    pub fn exists(conn: &Connection, id: &TeamId) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM teams WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// All teams with members, in creation order.
    pub fn list(conn: &Connection) -> Result<Vec<Team>> {
        let mut stmt = conn.prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY rowid"))?;
        let teams = stmt
            .query_map([], team_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        teams
            .into_iter()
            .map(|mut team| {
                team.members = MemberRepository::list_for_team(conn, &team.id)?;
                Ok(team)
            })
            .collect()
    }

    /// Team ids in creation order.
    pub fn list_ids(conn: &Connection) -> Result<Vec<TeamId>> {
        let mut stmt = conn.prepare("SELECT id FROM teams ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0).map(TeamId::from))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Apply a partial update. Returns `None` if the team does not exist.
    pub fn update(conn: &Connection, id: &TeamId, updates: &TeamUpdateParams) -> Result<Option<Team>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: DynParams = Vec::new();

        if let Some(ref name) = updates.name {
            sets.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(ref desc) = updates.description {
            sets.push("description = ?");
            values.push(Box::new(desc.clone()));
        }

        if sets.is_empty() {
            return Self::get(conn, id);
        }

        sets.push("updated_at = ?");
        values.push(Box::new(now_iso()));
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE teams SET {} WHERE id = ?", sets.join(", "));
        let changed = conn.execute(&sql, param_refs(&values).as_slice())?;
        if changed == 0 {
            return Ok(None);
        }
        Self::get(conn, id)
    }

    /// Delete a team (members cascade). Returns true if a row was deleted.
    pub fn delete(conn: &Connection, id: &TeamId) -> Result<bool> {
        let changed = conn.execute("DELETE FROM teams WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }

    /// Number of teams.
    pub fn count(conn: &Connection) -> Result<u32> {
        Ok(conn.query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?)
    }
}

fn team_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: TeamId::from(row.get::<_, String>("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        members: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
