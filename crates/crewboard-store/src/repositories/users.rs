use crewboard_core::{User, UserId};
use rusqlite::{Connection, OptionalExtension, params};

use super::now_iso;
use crate::errors::Result;

/// A user row including the password hash.
#[derive(Clone, Debug)]
pub struct StoredUser {
    /// Public user fields.
    pub user: User,
    /// Encoded salted hash.
    pub password_hash: String,
}

/// User persistence. Emails are stored lowercase and compared without case.
pub struct UserRepository;

impl UserRepository {
    /// Insert a user. A duplicate email surfaces as a unique violation
    /// (see [`crate::StoreError::is_unique_violation`]).
    pub fn create(conn: &Connection, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let id = UserId::new();
        let now = now_iso();
        let email = email.trim().to_lowercase();
        let _ = conn.execute(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id.as_str(), name, email, password_hash, now],
        )?;
        Ok(User {
            id,
            name: name.to_string(),
            email,
            created_at: now,
        })
    }

    /// Look up a user by email, with the password hash.
    pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<StoredUser>> {
        let user = conn
            .query_row(
                "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?1",
                params![email.trim().to_lowercase()],
                |row| {
                    Ok(StoredUser {
                        user: user_from_row(row)?,
                        password_hash: row.get("password_hash")?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Look up a user by id.
    pub fn get(conn: &Connection, id: &UserId) -> Result<Option<User>> {
        let user = conn
            .query_row(
                "SELECT id, name, email, created_at FROM users WHERE id = ?1",
                params![id.as_str()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::from(row.get::<_, String>("id")?),
        name: row.get("name")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
    })
}
