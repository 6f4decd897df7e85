//! Team and member management.
//!
//! Member removal and team deletion never delete tasks: the affected tasks
//! lose their assignee and stay in their projects.

use crewboard_core::{
    Member, MemberCreateParams, MemberId, MemberUpdateParams, Team, TeamCreateParams, TeamId,
    TeamUpdateParams,
};
use crewboard_store::{MemberRepository, ProjectRepository, TaskRepository, TeamRepository};
use rusqlite::Connection;
use tracing::{info, instrument, warn};

use crate::engine::{Engine, required_name, validate_capacity};
use crate::errors::{EngineError, Result};
use crate::views::{MemberRemoval, TeamDeletion};

impl Engine {
    // ─────────────────────────────────────────────────────────────────────
    // Teams
    // ─────────────────────────────────────────────────────────────────────

    /// Create a team.
    #[instrument(skip(self, params))]
    pub fn create_team(&self, params: &TeamCreateParams) -> Result<Team> {
        let params = TeamCreateParams {
            name: required_name("name", &params.name)?,
            description: params.description.clone(),
        };
        let team = self.write(|tx| Ok(TeamRepository::create(tx, &params)?))?;
        info!(team_id = %team.id, name = %team.name, "team created");
        Ok(team)
    }

    /// Load a team with its members and their loads.
    pub fn get_team(&self, id: &TeamId) -> Result<Team> {
        self.read(|conn| TeamRepository::get(conn, id)?.ok_or_else(|| EngineError::team_not_found(id.as_str())))
    }

    /// All teams in creation order.
    pub fn list_teams(&self) -> Result<Vec<Team>> {
        self.read(|conn| Ok(TeamRepository::list(conn)?))
    }

    /// Rename or re-describe a team.
    #[instrument(skip(self, updates), fields(team_id = %id))]
    pub fn update_team(&self, id: &TeamId, updates: &TeamUpdateParams) -> Result<Team> {
        let updates = TeamUpdateParams {
            name: updates.name.as_deref().map(|n| required_name("name", n)).transpose()?,
            description: updates.description.clone(),
        };
        self.write(|tx| {
            TeamRepository::update(tx, id, &updates)?.ok_or_else(|| EngineError::team_not_found(id.as_str()))
        })
    }

    /// Delete a team and its members.
    ///
    /// Tasks held by the members become unassigned; projects of the team
    /// keep existing without a team and are reported back.
    #[instrument(skip(self), fields(team_id = %id))]
    pub fn delete_team(&self, id: &TeamId) -> Result<TeamDeletion> {
        let team_id = id.clone();
        let deletion = self.locked_write(
            |_| Ok(vec![team_id.clone()]),
            |tx| {
                let team = TeamRepository::get(tx, id)?.ok_or_else(|| EngineError::team_not_found(id.as_str()))?;
                let orphaned_projects = ProjectRepository::ids_for_team(tx, id)?;
                let unassigned_tasks = TaskRepository::unassign_for_team(tx, id)?;
                let _ = TeamRepository::delete(tx, id)?;
                Ok(TeamDeletion {
                    team_id: team.id,
                    removed_members: team.members.len(),
                    unassigned_tasks,
                    orphaned_projects,
                })
            },
        )?;
        self.locks().forget(id);

        if deletion.orphaned_projects.is_empty() {
            info!(removed_members = deletion.removed_members, "team deleted");
        } else {
            warn!(
                removed_members = deletion.removed_members,
                unassigned_tasks = deletion.unassigned_tasks,
                orphaned_projects = deletion.orphaned_projects.len(),
                "team deleted; projects left without a team"
            );
        }
        Ok(deletion)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Members
    // ─────────────────────────────────────────────────────────────────────

    /// Add a member to a team. Capacity defaults to the configured value.
    #[instrument(skip(self, params), fields(team_id = %team_id))]
    pub fn add_member(&self, team_id: &TeamId, params: &MemberCreateParams) -> Result<Member> {
        let name = required_name("name", &params.name)?;
        let role = params.role.as_deref().map(str::trim).unwrap_or_default().to_string();
        let capacity = match params.capacity {
            Some(raw) => validate_capacity(raw)?,
            None => self.config().default_capacity,
        };

        let member = self.locked_write(
            |_| Ok(vec![team_id.clone()]),
            |tx| {
                if !TeamRepository::exists(tx, team_id)? {
                    return Err(EngineError::team_not_found(team_id.as_str()));
                }
                Ok(MemberRepository::create(tx, team_id, &name, &role, capacity)?)
            },
        )?;
        info!(member_id = %member.id, capacity = %member.capacity, "member added");
        Ok(member)
    }

    /// Update a member's name, role, or capacity.
    ///
    /// Lowering capacity below the current load is allowed; the member is
    /// simply overloaded afterwards.
    #[instrument(skip(self, updates), fields(team_id = %team_id, member_id = %member_id))]
    pub fn update_member(
        &self,
        team_id: &TeamId,
        member_id: &MemberId,
        updates: &MemberUpdateParams,
    ) -> Result<Member> {
        let name = updates.name.as_deref().map(|n| required_name("name", n)).transpose()?;
        let role = updates.role.as_deref().map(str::trim);
        let capacity = updates.capacity.map(validate_capacity).transpose()?;

        let member = self.locked_write(
            |_| Ok(vec![team_id.clone()]),
            |tx| {
                let _ = member_of_team(tx, team_id, member_id)?;
                MemberRepository::update(tx, member_id, name.as_deref(), role, capacity)?
                    .ok_or_else(|| EngineError::member_not_found(member_id.as_str()))
            },
        )?;
        if member.is_overloaded() {
            warn!(
                current_tasks = member.current_tasks,
                capacity = %member.capacity,
                "member is over capacity after update"
            );
        }
        Ok(member)
    }

    /// Remove a member; their tasks stay in place without an assignee.
    #[instrument(skip(self), fields(team_id = %team_id, member_id = %member_id))]
    pub fn remove_member(&self, team_id: &TeamId, member_id: &MemberId) -> Result<MemberRemoval> {
        let removal = self.locked_write(
            |_| Ok(vec![team_id.clone()]),
            |tx| {
                let _ = member_of_team(tx, team_id, member_id)?;
                let unassigned_tasks = TaskRepository::unassign_for_member(tx, member_id)?;
                let _ = MemberRepository::delete(tx, member_id)?;
                Ok(MemberRemoval {
                    member_id: member_id.clone(),
                    unassigned_tasks,
                })
            },
        )?;
        info!(unassigned_tasks = removal.unassigned_tasks, "member removed");
        Ok(removal)
    }
}

/// Load a member and check it belongs to `team_id`.
fn member_of_team(conn: &Connection, team_id: &TeamId, member_id: &MemberId) -> Result<Member> {
    if !TeamRepository::exists(conn, team_id)? {
        return Err(EngineError::team_not_found(team_id.as_str()));
    }
    match MemberRepository::get(conn, member_id)? {
        Some(member) if &member.team_id == team_id => Ok(member),
        _ => Err(EngineError::member_not_found(member_id.as_str())),
    }
}
