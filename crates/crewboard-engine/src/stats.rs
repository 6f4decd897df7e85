//! Dashboard aggregation.

use crewboard_core::ReassignmentLog;
use crewboard_store::{LogRepository, ProjectRepository, TaskRepository, TeamRepository};

use crate::engine::Engine;
use crate::errors::Result;
use crate::views::{MemberLoad, Stats, TeamSummary};

impl Engine {
    /// Totals, per-team load, and the latest reassignments.
    pub fn get_stats(&self) -> Result<Stats> {
        let limit = self.config().recent_logs_limit;
        self.read(|conn| {
            let team_summary = TeamRepository::list(conn)?
                .into_iter()
                .map(|team| {
                    let members: Vec<MemberLoad> = team.members.iter().map(MemberLoad::from).collect();
                    TeamSummary {
                        total_tasks: members.iter().map(|m| m.current_tasks).sum(),
                        overloaded_count: u32::try_from(members.iter().filter(|m| m.is_overloaded).count())
                            .unwrap_or(u32::MAX),
                        team_id: team.id,
                        name: team.name,
                        members,
                    }
                })
                .collect();

            Ok(Stats {
                total_projects: ProjectRepository::count(conn)?,
                total_tasks: TaskRepository::count(conn)?,
                team_summary,
                recent_logs: LogRepository::recent(conn, limit)?,
            })
        })
    }

    /// Reassignment history, newest first.
    pub fn activity_logs(&self) -> Result<Vec<ReassignmentLog>> {
        let limit = self.config().activity_log_limit;
        self.read(|conn| Ok(LogRepository::recent(conn, limit)?))
    }
}
