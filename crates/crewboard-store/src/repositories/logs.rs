use crewboard_core::{LogId, MemberId, ReassignmentLog, TaskId, TeamId};
use rusqlite::{Connection, params};

use crate::errors::Result;

/// Append-only reassignment audit log.
pub struct LogRepository;

impl LogRepository {
    /// Append an entry.
    pub fn append(conn: &Connection, entry: &ReassignmentLog) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO reassignment_logs (id, task_id, task_title, team_id, from_member_id,
             from_member_name, to_member_id, to_member_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.id.as_str(),
                entry.task_id.as_str(),
                entry.task_title,
                entry.team_id.as_ref().map(TeamId::as_str),
                entry.from_member_id.as_ref().map(MemberId::as_str),
                entry.from_member_name,
                entry.to_member_id.as_str(),
                entry.to_member_name,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    /// Most recent entries, newest first.
    pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<ReassignmentLog>> {
        let mut stmt = conn.prepare(
            "SELECT id, task_id, task_title, team_id, from_member_id, from_member_name,
                    to_member_id, to_member_name, created_at
               FROM reassignment_logs ORDER BY seq DESC LIMIT ?1",
        )?;
        let logs = stmt
            .query_map(params![limit], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    /// Total number of entries.
    pub fn count(conn: &Connection) -> Result<u32> {
        Ok(conn.query_row("SELECT COUNT(*) FROM reassignment_logs", [], |row| row.get(0))?)
    }
}

fn log_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReassignmentLog> {
    Ok(ReassignmentLog {
        id: LogId::from(row.get::<_, String>("id")?),
        task_id: TaskId::from(row.get::<_, String>("task_id")?),
        task_title: row.get("task_title")?,
        team_id: row.get::<_, Option<String>>("team_id")?.map(TeamId::from),
        from_member_id: row.get::<_, Option<String>>("from_member_id")?.map(MemberId::from),
        from_member_name: row.get("from_member_name")?,
        to_member_id: MemberId::from(row.get::<_, String>("to_member_id")?),
        to_member_name: row.get("to_member_name")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{now_iso, test_support};

    fn entry(title: &str) -> ReassignmentLog {
        ReassignmentLog {
            id: LogId::new(),
            task_id: TaskId::new(),
            task_title: title.into(),
            team_id: Some(TeamId::from("team-1")),
            from_member_id: Some(MemberId::from("mem-a")),
            from_member_name: Some("Ann".into()),
            to_member_id: MemberId::from("mem-b"),
            to_member_name: "Bob".into(),
            created_at: now_iso(),
        }
    }

    #[test]
    fn append_and_read_back() {
        let conn = test_support::conn();
        let e = entry("Fix login");
        LogRepository::append(&conn, &e).unwrap();
        let logs = LogRepository::recent(&conn, 10).unwrap();
        assert_eq!(logs, vec![e]);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let conn = test_support::conn();
        for i in 0..7 {
            LogRepository::append(&conn, &entry(&format!("t{i}"))).unwrap();
        }
        let logs = LogRepository::recent(&conn, 5).unwrap();
        let titles: Vec<&str> = logs.iter().map(|l| l.task_title.as_str()).collect();
        assert_eq!(titles, vec!["t6", "t5", "t4", "t3", "t2"]);
        assert_eq!(LogRepository::count(&conn).unwrap(), 7);
    }

    #[test]
    fn entries_survive_task_deletion() {
        let conn = test_support::conn();
        let e = entry("gone");
        LogRepository::append(&conn, &e).unwrap();
        let _ = conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![e.task_id.as_str()])
            .unwrap();
        assert_eq!(LogRepository::count(&conn).unwrap(), 1);
    }
}
