use crewboard_core::{Capacity, Member, MemberId, TeamId};
use rusqlite::{Connection, OptionalExtension, params};

use super::{DynParams, capacity_column, now_iso, param_refs};
use crate::errors::Result;

/// Member columns plus the derived task count.
const MEMBER_SELECT: &str = "SELECT m.id, m.team_id, m.name, m.role, m.capacity, m.created_at,
        (SELECT COUNT(*) FROM tasks t WHERE t.assigned_member_id = m.id) AS current_tasks
   FROM members m";

/// Member persistence. `current_tasks` is counted on every read.
pub struct MemberRepository;

impl MemberRepository {
    /// Add a member to a team.
    pub fn create(
        conn: &Connection,
        team_id: &TeamId,
        name: &str,
        role: &str,
        capacity: Capacity,
    ) -> Result<Member> {
        let id = MemberId::new();
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO members (id, team_id, name, role, capacity, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id.as_str(), team_id.as_str(), name, role, capacity.get(), now],
        )?;
        Ok(Member {
            id,
            team_id: team_id.clone(),
            name: name.to_string(),
            role: role.to_string(),
            capacity,
            current_tasks: 0,
            created_at: now,
        })
    }

    /// Load a member with its current task count.
    pub fn get(conn: &Connection, id: &MemberId) -> Result<Option<Member>> {
        let member = conn
            .query_row(
                &format!("{MEMBER_SELECT} WHERE m.id = ?1"),
                params![id.as_str()],
                member_from_row,
            )
            .optional()?;
        Ok(member)
    }

    /// Members of a team in insertion order.
    pub fn list_for_team(conn: &Connection, team_id: &TeamId) -> Result<Vec<Member>> {
        let mut stmt = conn.prepare(&format!("{MEMBER_SELECT} WHERE m.team_id = ?1 ORDER BY m.rowid"))?;
        let members = stmt
            .query_map(params![team_id.as_str()], member_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    /// Load several members by id (unknown ids are skipped).
    pub fn get_many(conn: &Connection, ids: &[MemberId]) -> Result<Vec<Member>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(member) = Self::get(conn, id)? {
                out.push(member);
            }
        }
        Ok(out)
    }

    /// Apply a partial update. Returns `None` if the member does not exist.
    pub fn update(
        conn: &Connection,
        id: &MemberId,
        name: Option<&str>,
        role: Option<&str>,
        capacity: Option<Capacity>,
    ) -> Result<Option<Member>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: DynParams = Vec::new();

        if let Some(name) = name {
            sets.push("name = ?");
            values.push(Box::new(name.to_string()));
        }
        if let Some(role) = role {
            sets.push("role = ?");
            values.push(Box::new(role.to_string()));
        }
        if let Some(capacity) = capacity {
            sets.push("capacity = ?");
            values.push(Box::new(capacity.get()));
        }

        if sets.is_empty() {
            return Self::get(conn, id);
        }

        values.push(Box::new(id.to_string()));
        let sql = format!("UPDATE members SET {} WHERE id = ?", sets.join(", "));
        let changed = conn.execute(&sql, param_refs(&values).as_slice())?;
        if changed == 0 {
            return Ok(None);
        }
        Self::get(conn, id)
    }

    /// Delete a member. Returns true if a row was deleted.
    pub fn delete(conn: &Connection, id: &MemberId) -> Result<bool> {
        let changed = conn.execute("DELETE FROM members WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }
}

fn member_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: MemberId::from(row.get::<_, String>("id")?),
        team_id: TeamId::from(row.get::<_, String>("team_id")?),
        name: row.get("name")?,
        role: row.get("role")?,
        capacity: capacity_column(row, "capacity")?,
        current_tasks: row.get("current_tasks")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{TeamRepository, test_support};
    use crewboard_core::TeamCreateParams;

    fn team(conn: &Connection) -> TeamId {
        TeamRepository::create(
            conn,
            &TeamCreateParams {
                name: "T".into(),
                description: None,
            },
        )
        .unwrap()
        .id
    }

    fn cap(v: i64) -> Capacity {
        Capacity::new(v).unwrap()
    }

    #[test]
    fn create_and_get() {
        let conn = test_support::conn();
        let team_id = team(&conn);
        let member = MemberRepository::create(&conn, &team_id, "Ann", "dev", cap(4)).unwrap();
        assert!(member.id.starts_with("mem-"));

        let loaded = MemberRepository::get(&conn, &member.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Ann");
        assert_eq!(loaded.role, "dev");
        assert_eq!(loaded.capacity.get(), 4);
        assert_eq!(loaded.current_tasks, 0);
        assert_eq!(loaded.team_id, team_id);
    }

    #[test]
    fn current_tasks_counts_assigned_tasks() {
        let conn = test_support::conn();
        let team_id = team(&conn);
        let member = MemberRepository::create(&conn, &team_id, "Ann", "", cap(3)).unwrap();
        conn.execute(
            "INSERT INTO tasks (id, title, assigned_member_id, created_at, updated_at)
             VALUES ('task-1', 'a', ?1, '', ''), ('task-2', 'b', ?1, '', ''), ('task-3', 'c', NULL, '', '')",
            params![member.id.as_str()],
        )
        .unwrap();
        let loaded = MemberRepository::get(&conn, &member.id).unwrap().unwrap();
        assert_eq!(loaded.current_tasks, 2);
    }

    #[test]
    fn list_in_insertion_order() {
        let conn = test_support::conn();
        let team_id = team(&conn);
        let names = ["Zed", "Amy", "Bob"];
        for name in names {
            let _ = MemberRepository::create(&conn, &team_id, name, "", cap(3)).unwrap();
        }
        let listed: Vec<String> = MemberRepository::list_for_team(&conn, &team_id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(listed, names);
    }

    #[test]
    fn update_fields() {
        let conn = test_support::conn();
        let team_id = team(&conn);
        let member = MemberRepository::create(&conn, &team_id, "Ann", "dev", cap(3)).unwrap();
        let updated = MemberRepository::update(&conn, &member.id, None, Some("lead"), Some(cap(0)))
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Ann");
        assert_eq!(updated.role, "lead");
        assert_eq!(updated.capacity.get(), 0);
    }

    #[test]
    fn get_many_skips_unknown() {
        let conn = test_support::conn();
        let team_id = team(&conn);
        let a = MemberRepository::create(&conn, &team_id, "A", "", cap(3)).unwrap();
        let found = MemberRepository::get_many(&conn, &[a.id.clone(), MemberId::from("mem-x")]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }

    #[test]
    fn delete_unassigns_tasks() {
        let conn = test_support::conn();
        let team_id = team(&conn);
        let member = MemberRepository::create(&conn, &team_id, "Ann", "", cap(3)).unwrap();
        conn.execute(
            "INSERT INTO tasks (id, title, assigned_member_id, created_at, updated_at)
             VALUES ('task-1', 'a', ?1, '', '')",
            params![member.id.as_str()],
        )
        .unwrap();
        assert!(MemberRepository::delete(&conn, &member.id).unwrap());
        let assignee: Option<String> = conn
            .query_row("SELECT assigned_member_id FROM tasks WHERE id = 'task-1'", [], |row| row.get(0))
            .unwrap();
        assert!(assignee.is_none());
    }
}
