//! SQL DDL for the crewboard tables.
//!
//! `currentTasks` has no column: it is always computed from `tasks`.
//! Foreign keys encode the deletion rules:
//! - members cascade with their team
//! - projects lose their team (`team_id` → NULL)
//! - tasks lose their project or assignee (→ NULL)
//!
//! Reassignment logs carry no foreign keys; they outlive the rows they
//! describe.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::errors::Result;
use crate::repositories::now_iso;

/// Schema version written by [`run_migrations`].
pub const SCHEMA_VERSION: i64 = 1;

/// Run all migrations.
///
/// Idempotent (uses `IF NOT EXISTS`).
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![SCHEMA_VERSION, now_iso()],
    )?;
    if inserted > 0 {
        debug!(version = SCHEMA_VERSION, "applied schema");
    }
    Ok(())
}

/// Highest applied schema version, if any.
pub fn current_version(conn: &Connection) -> Result<Option<i64>> {
    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version)
}

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS members (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT '',
    capacity INTEGER NOT NULL CHECK(capacity BETWEEN 0 AND 5),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_team ON members(team_id);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    team_id TEXT REFERENCES teams(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_team ON projects(team_id);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    project_id TEXT REFERENCES projects(id) ON DELETE SET NULL,
    assigned_member_id TEXT REFERENCES members(id) ON DELETE SET NULL,
    priority TEXT NOT NULL DEFAULT 'medium'
        CHECK(priority IN ('low', 'medium', 'high')),
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK(status IN ('pending', 'in_progress', 'done')),
    assign_seq INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assigned_member_id);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

CREATE TABLE IF NOT EXISTS reassignment_logs (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    task_id TEXT NOT NULL,
    task_title TEXT NOT NULL,
    team_id TEXT,
    from_member_id TEXT,
    from_member_name TEXT,
    to_member_id TEXT NOT NULL,
    to_member_name TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";
