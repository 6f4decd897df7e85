//! Capacity model: how many tasks a member may hold and how loaded they are.
//!
//! - A member is **overloaded** when `current_tasks > capacity`.
//! - The **load ratio** is `current_tasks / capacity`. A capacity of 0 marks
//!   an unavailable member; its ratio is `+inf` so load-minimising selection
//!   never prefers it over a member with room.
//! - Ranking for assignment: smallest ratio, then fewest tasks, then
//!   insertion order (the order candidates are supplied in).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest capacity a member can be given.
pub const MAX_CAPACITY: u8 = 5;

/// Capacity given to new members when the request omits it.
pub const DEFAULT_CAPACITY: u8 = 3;

/// Capacity value outside the accepted range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("capacity must be between 0 and {max}, got {value}")]
pub struct CapacityError {
    /// The rejected value.
    pub value: i64,
    /// Upper bound (inclusive).
    pub max: u8,
}

/// A validated member capacity in `0..=MAX_CAPACITY`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Capacity(u8);

impl Capacity {
    /// Validate a raw capacity.
    pub fn new(value: i64) -> Result<Self, CapacityError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_CAPACITY)
            .map(Self)
            .ok_or(CapacityError {
                value,
                max: MAX_CAPACITY,
            })
    }

    /// The raw value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self(DEFAULT_CAPACITY)
    }
}

impl TryFrom<i64> for Capacity {
    type Error = CapacityError;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Capacity> for u8 {
    fn from(c: Capacity) -> Self {
        c.0
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A member's current load against their capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Load {
    /// Tasks currently assigned.
    pub current_tasks: u32,
    /// Maximum tasks before overload.
    pub capacity: Capacity,
}

impl Load {
    /// Build a load snapshot.
    pub fn new(current_tasks: u32, capacity: Capacity) -> Self {
        Self {
            current_tasks,
            capacity,
        }
    }

    /// `current_tasks > capacity`.
    pub fn is_overloaded(&self) -> bool {
        self.current_tasks > u32::from(self.capacity.get())
    }

    /// `current_tasks < capacity`: one more task fits without overload.
    pub fn has_spare_capacity(&self) -> bool {
        self.current_tasks < u32::from(self.capacity.get())
    }

    /// `current_tasks / capacity`, or `+inf` when capacity is 0.
    pub fn load_ratio(&self) -> f64 {
        match self.capacity.get() {
            0 => f64::INFINITY,
            cap => f64::from(self.current_tasks) / f64::from(cap),
        }
    }

    /// Load after one more task is assigned.
    #[must_use]
    pub fn with_added(self) -> Self {
        Self {
            current_tasks: self.current_tasks.saturating_add(1),
            ..self
        }
    }

    /// Load after one task is taken away.
    #[must_use]
    pub fn with_removed(self) -> Self {
        Self {
            current_tasks: self.current_tasks.saturating_sub(1),
            ..self
        }
    }

    /// Assignment ranking: lower ratio first, then fewer tasks.
    pub fn rank(&self, other: &Self) -> Ordering {
        self.load_ratio()
            .total_cmp(&other.load_ratio())
            .then(self.current_tasks.cmp(&other.current_tasks))
    }
}

/// Pick the least-loaded candidate.
///
/// Candidates must be supplied in insertion order; among equally ranked
/// candidates the first one wins. Returns `None` for an empty input.
pub fn least_loaded<I, T, F>(candidates: I, load_of: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Load,
{
    let mut best: Option<(T, Load)> = None;
    for candidate in candidates {
        let load = load_of(&candidate);
        let better = match &best {
            Some((_, current)) => load.rank(current) == Ordering::Less,
            None => true,
        };
        if better {
            best = Some((candidate, load));
        }
    }
    best.map(|(candidate, _)| candidate)
}
