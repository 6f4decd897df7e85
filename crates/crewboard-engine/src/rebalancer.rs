//! Workload rebalancing.
//!
//! A sweep walks the teams in creation order. For each team the plan is
//! computed up front from one snapshot ([`plan_team`]) and then committed
//! move by move, each in its own transaction with its log entry, while the
//! team lock is held. The whole team runs on one pool connection, taken
//! before the lock like every other team-scoped write.
//!
//! Moves only ever consume spare capacity and a relieved source stops at
//! exactly its capacity, so sweeping twice in a row moves nothing the
//! second time.

use std::collections::HashMap;

use crewboard_core::{Load, LogId, Member, MemberId, ReassignmentLog, TaskId, TeamId, least_loaded};
use crewboard_store::{LogRepository, MemberRepository, TaskRepository, TeamRepository, now_iso};
use rusqlite::Connection;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::{Engine, member_loads, read_on, write_on};
use crate::errors::{EngineError, Result};
use crate::views::{MemberLoad, RebalanceFailure, RebalanceReport, UnresolvedMember};

/// One planned task move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedMove {
    /// Task to move.
    pub task_id: TaskId,
    /// Overloaded source member.
    pub from: MemberId,
    /// Destination member.
    pub to: MemberId,
}

/// Moves for one team plus the members they do not relieve.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TeamPlan {
    /// Moves in execution order.
    pub moves: Vec<PlannedMove>,
    /// Sources still overloaded once every move is applied.
    pub unresolved: Vec<MemberId>,
}

/// Plan the moves that relieve a team's overloaded members.
///
/// `members` is in insertion order. `queues` maps each member to the tasks
/// it holds, most recently assigned first; members missing from the map
/// have nothing to give away.
pub fn plan_team(members: &[Member], queues: &HashMap<MemberId, Vec<TaskId>>) -> TeamPlan {
    let mut loads: Vec<Load> = members.iter().map(Member::load).collect();
    let mut plan = TeamPlan::default();

    for (src, member) in members.iter().enumerate() {
        if !loads[src].is_overloaded() {
            continue;
        }
        let mut queue = queues.get(&member.id).map(Vec::as_slice).unwrap_or_default().iter();

        while loads[src].is_overloaded() {
            let after_move = loads[src].with_removed().load_ratio();
            let eligible = (0..members.len()).filter(|&i| {
                i != src && loads[i].has_spare_capacity() && loads[i].load_ratio() < after_move
            });
            let Some(dst) = least_loaded(eligible, |&i| loads[i]) else {
                break;
            };
            let Some(task_id) = queue.next() else {
                break;
            };

            plan.moves.push(PlannedMove {
                task_id: task_id.clone(),
                from: member.id.clone(),
                to: members[dst].id.clone(),
            });
            loads[src] = loads[src].with_removed();
            loads[dst] = loads[dst].with_added();
        }

        if loads[src].is_overloaded() {
            plan.unresolved.push(member.id.clone());
        }
    }
    plan
}

impl Engine {
    /// Move tasks off overloaded members onto teammates with spare capacity.
    ///
    /// A failing move stops the sweep of its team and is reported in
    /// `errors`; committed moves stay and the remaining teams are still
    /// swept. Members that cannot be relieved are reported in `unresolved`.
    #[instrument(skip(self))]
    pub fn reassign_tasks(&self) -> Result<RebalanceReport> {
        let team_ids = self.read(|conn| Ok(TeamRepository::list_ids(conn)?))?;
        let mut report = RebalanceReport::default();

        for team_id in team_ids {
            let outcome = self.conn().and_then(|mut conn| {
                let _guard = self.locks().lock(&team_id);
                self.sweep_team(&mut conn, &team_id, &mut report)
            });
            match outcome {
                Ok(unresolved) => {
                    for member in unresolved {
                        warn!(
                            team_id = %team_id,
                            member_id = %member.member_id,
                            current_tasks = member.current_tasks,
                            capacity = %member.capacity,
                            "member still overloaded after rebalancing"
                        );
                        report.unresolved.push(UnresolvedMember {
                            team_id: team_id.clone(),
                            member,
                        });
                    }
                }
                Err(e) => {
                    error!(team_id = %team_id, error = %e, "rebalancing stopped for team");
                    report.errors.push(RebalanceFailure {
                        team_id: team_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.moved_count = report.log.len();
        info!(
            moved = report.moved_count,
            unresolved = report.unresolved.len(),
            errors = report.errors.len(),
            "rebalancing complete"
        );
        Ok(report)
    }

    /// Plan and commit one team's moves. The caller holds the team lock.
    fn sweep_team(
        &self,
        conn: &mut Connection,
        team_id: &TeamId,
        report: &mut RebalanceReport,
    ) -> Result<Vec<MemberLoad>> {
        let plan = read_on(conn, |conn| {
            let members = MemberRepository::list_for_team(conn, team_id)?;
            let mut queues = HashMap::new();
            for member in members.iter().filter(|m| m.is_overloaded()) {
                let tasks = TaskRepository::list_for_member(conn, &member.id)?;
                let _ = queues.insert(member.id.clone(), tasks.into_iter().map(|t| t.id).collect());
            }
            Ok(plan_team(&members, &queues))
        })?;
        debug!(team_id = %team_id, moves = plan.moves.len(), "team plan ready");

        let mut touched: Vec<MemberId> = Vec::new();
        let mut failure = None;
        for planned in &plan.moves {
            match write_on(conn, |tx| commit_move(tx, team_id, planned)) {
                Ok(entry) => {
                    info!(
                        task_id = %entry.task_id,
                        from = %planned.from,
                        to = %entry.to_member_id,
                        "task reassigned"
                    );
                    touched.push(planned.from.clone());
                    touched.push(planned.to.clone());
                    report.log.push(entry);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        report
            .affected_members
            .extend(read_on(conn, |conn| member_loads(conn, &touched))?);
        if let Some(e) = failure {
            return Err(e);
        }

        read_on(conn, |conn| {
            Ok(MemberRepository::get_many(conn, &plan.unresolved)?
                .iter()
                .filter(|m| m.is_overloaded())
                .map(MemberLoad::from)
                .collect())
        })
    }
}

/// Apply one move and record it. Fails if the snapshot no longer holds.
fn commit_move(conn: &Connection, team_id: &TeamId, planned: &PlannedMove) -> Result<ReassignmentLog> {
    let task = TaskRepository::get(conn, &planned.task_id)?
        .ok_or_else(|| EngineError::task_not_found(planned.task_id.as_str()))?;
    if task.assigned_member_id.as_ref() != Some(&planned.from) {
        return Err(EngineError::Conflict(format!(
            "task {} changed assignee during rebalancing",
            task.id
        )));
    }
    let from = MemberRepository::get(conn, &planned.from)?
        .ok_or_else(|| EngineError::member_not_found(planned.from.as_str()))?;
    let to = MemberRepository::get(conn, &planned.to)?
        .ok_or_else(|| EngineError::member_not_found(planned.to.as_str()))?;

    let _ = TaskRepository::set_assignee(conn, &task.id, Some(&to.id))?;
    let entry = ReassignmentLog {
        id: LogId::new(),
        task_id: task.id,
        task_title: task.title,
        team_id: Some(team_id.clone()),
        from_member_id: Some(from.id),
        from_member_name: Some(from.name),
        to_member_id: to.id,
        to_member_name: to.name,
        created_at: now_iso(),
    };
    LogRepository::append(conn, &entry)?;
    Ok(entry)
}
