//! Branded ID newtypes for type safety.
//!
//! Every entity has a distinct ID type implemented as a newtype wrapper
//! around `String`. New IDs are `{prefix}-{uuid v7}` so they sort by
//! creation time and are recognisable in logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Entity prefix used by [`Self::new`].
            pub const PREFIX: &'static str = $prefix;

            /// Create a new time-ordered ID.
            #[must_use]
            pub fn new() -> Self {
                Self(format!("{}-{}", $prefix, Uuid::now_v7()))
            }

            /// Wrap an existing value (from the database or a request path).
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a team.
    TeamId, "team"
}

branded_id! {
    /// Unique identifier for a team member.
    MemberId, "mem"
}

branded_id! {
    /// Unique identifier for a project.
    ProjectId, "proj"
}

branded_id! {
    /// Unique identifier for a task.
    TaskId, "task"
}

branded_id! {
    /// Unique identifier for a reassignment log entry.
    LogId, "log"
}

branded_id! {
    /// Unique identifier for a registered user.
    UserId, "user"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_carry_prefix() {
        assert!(TeamId::new().starts_with("team-"));
        assert!(MemberId::new().starts_with("mem-"));
        assert!(ProjectId::new().starts_with("proj-"));
        assert!(TaskId::new().starts_with("task-"));
        assert!(LogId::new().starts_with("log-"));
        assert!(UserId::new().starts_with("user-"));
    }

    #[test]
    fn suffix_is_uuid_v7() {
        let id = TaskId::new();
        let raw = id.as_str().trim_start_matches("task-");
        let parsed = Uuid::parse_str(raw).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(MemberId::new(), MemberId::new());
    }

    #[test]
    fn ids_sort_by_creation() {
        let ids: Vec<TeamId> = (0..50).map(|_| TeamId::new()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "not monotonic: {} >= {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn from_str_ref_and_display() {
        let id = ProjectId::from("proj-abc");
        assert_eq!(id.as_str(), "proj-abc");
        assert_eq!(format!("{id}"), "proj-abc");
    }

    #[test]
    fn serde_is_transparent() {
        let id = MemberId::from("mem-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"mem-1\"");
        let back: MemberId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn into_inner() {
        let id = UserId::from("user-9");
        assert_eq!(id.into_inner(), "user-9");
    }
}
