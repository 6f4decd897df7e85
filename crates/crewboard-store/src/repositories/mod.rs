//! Stateless SQL repositories.
//!
//! Every method takes a `&Connection` (a `Transaction` derefs to one) and
//! translates between domain types and rows. Transactions and locking are
//! the caller's job.

mod logs;
mod members;
mod projects;
mod tasks;
mod teams;
mod users;

pub use logs::LogRepository;
pub use members::MemberRepository;
pub use projects::ProjectRepository;
pub use tasks::TaskRepository;
pub use teams::TeamRepository;
pub use users::{StoredUser, UserRepository};

use chrono::SecondsFormat;
use crewboard_core::Capacity;
use rusqlite::Row;
use rusqlite::types::Type;

/// Current UTC timestamp as ISO 8601 string with millisecond precision.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read a capacity column, rejecting out-of-range values.
fn capacity_column(row: &Row<'_>, name: &str) -> rusqlite::Result<Capacity> {
    let raw: i64 = row.get(name)?;
    Capacity::new(raw).map_err(|e| {
        let idx = row.as_ref().column_index(name).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e))
    })
}

/// Boxed positional parameters for dynamically built statements.
type DynParams = Vec<Box<dyn rusqlite::types::ToSql>>;

fn param_refs(values: &DynParams) -> Vec<&dyn rusqlite::types::ToSql> {
    values.iter().map(AsRef::as_ref).collect()
}
