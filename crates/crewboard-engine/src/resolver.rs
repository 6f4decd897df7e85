//! Assignment resolver: pure decisions over already-loaded members.
//!
//! - [`check_assignment`] validates a manual (re)assignment
//! - [`pick_auto_assignee`] chooses the least-loaded member of a team
//!
//! Nothing here touches storage; the task operations load the data, call
//! these functions, and apply the outcome inside one transaction.

use crewboard_core::{Load, Member, MemberId, TeamId, least_loaded};

use crate::errors::{EngineError, Result};
use crate::views::MemberLoad;

/// What an assignment request amounts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignDecision {
    /// Target is the current state; nothing to write.
    NoOp,
    /// Assign to the target member.
    Assign,
    /// Clear the assignee.
    Unassign,
}

/// Validate assigning a task (currently held by `current`) to `target`.
///
/// `team_id` is the team that owns the task's project. The target must be a
/// member of that team. Adding the task must not push the target over
/// capacity unless `override_capacity` is set. Re-assigning to the current
/// assignee is a no-op and never warns; unassigning always succeeds.
pub fn check_assignment(
    current: Option<&MemberId>,
    target: Option<&Member>,
    team_id: Option<&TeamId>,
    override_capacity: bool,
) -> Result<AssignDecision> {
    let Some(member) = target else {
        return Ok(if current.is_some() {
            AssignDecision::Unassign
        } else {
            AssignDecision::NoOp
        });
    };

    if team_id != Some(&member.team_id) {
        return Err(EngineError::Validation(format!(
            "{} is not a member of the project's team",
            member.name
        )));
    }

    if current == Some(&member.id) {
        return Ok(AssignDecision::NoOp);
    }

    if member.load().with_added().is_overloaded() && !override_capacity {
        return Err(EngineError::CapacityWarning {
            member: MemberLoad::from(member),
        });
    }

    Ok(AssignDecision::Assign)
}

/// Least-loaded member: smallest load ratio, then fewest tasks, then
/// insertion order. `None` for an empty team.
///
/// `current` is the task's present assignee, whose load is counted without
/// the task being placed. Members at or over capacity are still eligible;
/// the caller reports whether the choice exceeds capacity.
pub fn pick_auto_assignee<'a>(members: &'a [Member], current: Option<&MemberId>) -> Option<&'a Member> {
    least_loaded(members, |m| load_without_task(m, current))
}

/// A member's load with the task under consideration taken away.
pub fn load_without_task(member: &Member, current: Option<&MemberId>) -> Load {
    if current == Some(&member.id) {
        member.load().with_removed()
    } else {
        member.load()
    }
}
