//! The [`Engine`] service and its transaction/locking helpers.

use std::sync::Arc;

use crewboard_core::{Capacity, MemberId, Task, TeamId};
use crewboard_settings::EngineSettings;
use crewboard_store::{
    ConnectionPool, MemberRepository, PooledConnection, ProjectRepository, StoreError,
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::errors::{EngineError, Result};
use crate::locks::TeamLocks;
use crate::views::{MemberLoad, TaskView};

/// Attempts at settling the set of teams to lock before giving up.
const MAX_LOCK_ATTEMPTS: usize = 8;

/// Engine tuning values.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Reassignment log entries in dashboard stats.
    pub recent_logs_limit: u32,
    /// Reassignment log entries in the activity feed.
    pub activity_log_limit: u32,
    /// Capacity for members created without one.
    pub default_capacity: Capacity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for EngineConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            recent_logs_limit: settings.recent_logs_limit,
            activity_log_limit: settings.activity_log_limit,
            default_capacity: Capacity::new(i64::from(settings.default_capacity)).unwrap_or_default(),
        }
    }
}

/// Capacity-aware task assignment service.
///
/// All operations are synchronous; async callers run them on a blocking
/// thread. Cloning is cheap and clones share the pool and team locks.
#[derive(Clone)]
pub struct Engine {
    pool: ConnectionPool,
    locks: Arc<TeamLocks>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine over a migrated pool.
    pub fn new(pool: ConnectionPool, config: EngineConfig) -> Self {
        Self {
            pool,
            locks: Arc::new(TeamLocks::new()),
            config,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub(crate) fn locks(&self) -> &TeamLocks {
        &self.locks
    }

    pub(crate) fn conn(&self) -> Result<PooledConnection> {
        self.pool.get().map_err(|e| EngineError::Store(StoreError::Pool(e)))
    }

    /// Run a read-only operation against one consistent snapshot.
    pub(crate) fn read<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        read_on(&mut *self.conn()?, op)
    }

    /// Run a write without team locks (no capacity decisions involved).
    pub(crate) fn write<T>(&self, op: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        write_on(&mut *self.conn()?, op)
    }

    /// Run a write while holding the locks of every team `resolve` names.
    ///
    /// `resolve` is evaluated once to pick the locks and again inside the
    /// transaction; if the answer changed in between, the locks are
    /// re-acquired for the new set.
    ///
    /// The pool connection is always taken before any team lock. Callers
    /// that lock a team themselves must follow the same order.
    pub(crate) fn locked_write<T>(
        &self,
        resolve: impl Fn(&Connection) -> Result<Vec<TeamId>>,
        op: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn()?;
        let mut teams = normalized(resolve(&*conn)?);

        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let _guard = self.locks.lock_all(&teams);
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = normalized(resolve(&*tx)?);
            if current == teams {
                let out = op(&tx)?;
                tx.commit()?;
                return Ok(out);
            }
            debug!(attempt, "team set changed while locking, retrying");
            drop(tx);
            teams = current;
        }

        Err(EngineError::Conflict(
            "teams changed concurrently; retry the request".into(),
        ))
    }
}

/// Read transaction on a connection the caller already holds.
pub(crate) fn read_on<T>(conn: &mut Connection, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    let tx = conn.transaction()?;
    let out = op(&*tx)?;
    tx.commit()?;
    Ok(out)
}

/// Immediate write transaction on a connection the caller already holds.
pub(crate) fn write_on<T>(
    conn: &mut Connection,
    op: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let out = op(&tx)?;
    tx.commit()?;
    Ok(out)
}

fn normalized(mut teams: Vec<TeamId>) -> Vec<TeamId> {
    teams.sort();
    teams.dedup();
    teams
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Trim a required name, rejecting blanks.
pub(crate) fn required_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Validate a raw capacity.
pub(crate) fn validate_capacity(raw: i64) -> Result<Capacity> {
    Capacity::new(raw).map_err(|e| EngineError::Validation(e.to_string()))
}

/// Current loads of the given members (deduplicated, unknown ids skipped).
pub(crate) fn member_loads(conn: &Connection, ids: &[MemberId]) -> Result<Vec<MemberLoad>> {
    let mut unique: Vec<MemberId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }
    Ok(MemberRepository::get_many(conn, &unique)?
        .iter()
        .map(MemberLoad::from)
        .collect())
}

/// Resolve the display names of a task's assignee and project.
pub(crate) fn task_view(conn: &Connection, task: Task) -> Result<TaskView> {
    let assignee_name = match &task.assigned_member_id {
        Some(id) => MemberRepository::get(conn, id)?.map(|m| m.name),
        None => None,
    };
    let project_name = match &task.project_id {
        Some(id) => ProjectRepository::get(conn, id)?.map(|p| p.name),
        None => None,
    };
    Ok(TaskView {
        task,
        assignee_name,
        project_name,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crewboard_store::{ConnectionConfig, new_in_memory, run_migrations};

    /// Engine over a fresh in-memory database.
    pub fn engine() -> Engine {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        Engine::new(pool, EngineConfig::default())
    }

    /// Engine over a file database (real multi-connection pool).
    pub fn file_engine(dir: &std::path::Path) -> Engine {
        let pool = crewboard_store::new_file(&dir.join("crewboard.db"), &ConnectionConfig::default()).unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        Engine::new(pool, EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn config_from_settings() {
        let settings = EngineSettings {
            recent_logs_limit: 7,
            activity_log_limit: 50,
            default_capacity: 2,
        };
        let config = EngineConfig::from(&settings);
        assert_eq!(config.recent_logs_limit, 7);
        assert_eq!(config.activity_log_limit, 50);
        assert_eq!(config.default_capacity.get(), 2);
    }

    #[test]
    fn required_name_trims() {
        assert_eq!(required_name("name", "  Core ").unwrap(), "Core");
        assert_matches!(required_name("name", "   "), Err(EngineError::Validation(msg)) if msg == "name is required");
    }

    #[test]
    fn capacity_validation() {
        assert_eq!(validate_capacity(5).unwrap().get(), 5);
        assert_matches!(validate_capacity(6), Err(EngineError::Validation(_)));
    }

    #[test]
    fn normalized_sorts_and_dedups() {
        let ids = vec![TeamId::from("b"), TeamId::from("a"), TeamId::from("b")];
        assert_eq!(normalized(ids), vec![TeamId::from("a"), TeamId::from("b")]);
    }

    #[test]
    fn read_uses_pool() {
        let engine = test_support::engine();
        let n = engine
            .read(|conn| Ok(crewboard_store::TeamRepository::count(conn)?))
            .unwrap();
        assert_eq!(n, 0);
    }
}
