//! Project management.
//!
//! Moving a project to another team unassigns the tasks whose assignee is
//! not a member of the new team. Deleting a project keeps its tasks, which
//! lose both project and assignee.

use crewboard_core::{Project, ProjectCreateParams, ProjectId, ProjectUpdateParams, TeamId};
use crewboard_store::{ProjectRepository, TaskRepository, TeamRepository};
use rusqlite::Connection;
use tracing::{info, instrument, warn};

use crate::engine::{Engine, member_loads, required_name};
use crate::errors::{EngineError, Result};
use crate::views::{ProjectDeletion, ProjectDetail, ProjectMutation};

impl Engine {
    /// Create a project owned by an existing team.
    #[instrument(skip(self, params), fields(team_id = %params.team_id))]
    pub fn create_project(&self, params: &ProjectCreateParams) -> Result<ProjectDetail> {
        let params = ProjectCreateParams {
            name: required_name("name", &params.name)?,
            description: params.description.clone(),
            team_id: params.team_id.clone(),
        };
        let detail = self.write(|tx| {
            if !TeamRepository::exists(tx, &params.team_id)? {
                return Err(EngineError::team_not_found(params.team_id.as_str()));
            }
            let project = ProjectRepository::create(tx, &params)?;
            detail_of(tx, project)
        })?;
        info!(project_id = %detail.project.id, "project created");
        Ok(detail)
    }

    /// Load a project with its team.
    pub fn get_project(&self, id: &ProjectId) -> Result<ProjectDetail> {
        self.read(|conn| {
            let project = ProjectRepository::get(conn, id)?
                .ok_or_else(|| EngineError::project_not_found(id.as_str()))?;
            detail_of(conn, project)
        })
    }

    /// All projects in creation order, each with its team.
    pub fn list_projects(&self) -> Result<Vec<ProjectDetail>> {
        self.read(|conn| {
            ProjectRepository::list(conn)?
                .into_iter()
                .map(|project| detail_of(conn, project))
                .collect()
        })
    }

    /// Update a project; changing the team re-homes it.
    #[instrument(skip(self, updates), fields(project_id = %id))]
    pub fn update_project(&self, id: &ProjectId, updates: &ProjectUpdateParams) -> Result<ProjectMutation> {
        let name = updates.name.as_deref().map(|n| required_name("name", n)).transpose()?;
        let new_team = updates.team_id.clone();

        let mutation = self.locked_write(
            |conn| {
                let mut teams = project_team(conn, id)?;
                teams.extend(new_team.iter().cloned());
                Ok(teams)
            },
            |tx| {
                let current = ProjectRepository::get(tx, id)?
                    .ok_or_else(|| EngineError::project_not_found(id.as_str()))?;

                let mut unassigned_tasks = 0;
                let mut affected = Vec::new();
                if let Some(team_id) = &new_team {
                    if !TeamRepository::exists(tx, team_id)? {
                        return Err(EngineError::team_not_found(team_id.as_str()));
                    }
                    if current.team_id.as_ref() != Some(team_id) {
                        let (changed, previous) = TaskRepository::unassign_outside_team(tx, id, team_id)?;
                        unassigned_tasks = changed;
                        affected = previous;
                    }
                }

                let project = ProjectRepository::update(
                    tx,
                    id,
                    name.as_deref(),
                    updates.description.as_deref(),
                    new_team.as_ref(),
                )?
                .ok_or_else(|| EngineError::project_not_found(id.as_str()))?;

                Ok(ProjectMutation {
                    project: detail_of(tx, project)?,
                    unassigned_tasks,
                    affected_members: member_loads(tx, &affected)?,
                })
            },
        )?;

        if mutation.unassigned_tasks > 0 {
            warn!(
                unassigned_tasks = mutation.unassigned_tasks,
                "project moved; tasks of members outside the new team unassigned"
            );
        }
        Ok(mutation)
    }

    /// Delete a project. Its tasks stay, without project and assignee.
    #[instrument(skip(self), fields(project_id = %id))]
    pub fn delete_project(&self, id: &ProjectId) -> Result<ProjectDeletion> {
        let deletion = self.locked_write(
            |conn| project_team(conn, id),
            |tx| {
                if ProjectRepository::get(tx, id)?.is_none() {
                    return Err(EngineError::project_not_found(id.as_str()));
                }
                let assignees = TaskRepository::assignees_for_project(tx, id)?;
                let unassigned_tasks = TaskRepository::unassign_for_project(tx, id)?;
                let _ = ProjectRepository::delete(tx, id)?;
                Ok(ProjectDeletion {
                    project_id: id.clone(),
                    unassigned_tasks,
                    affected_members: member_loads(tx, &assignees)?,
                })
            },
        )?;
        info!(unassigned_tasks = deletion.unassigned_tasks, "project deleted");
        Ok(deletion)
    }
}

/// Team of a project as a lock set (empty for unknown or orphaned projects).
pub(crate) fn project_team(conn: &Connection, id: &ProjectId) -> Result<Vec<TeamId>> {
    Ok(ProjectRepository::get(conn, id)?
        .and_then(|p| p.team_id)
        .into_iter()
        .collect())
}

fn detail_of(conn: &Connection, project: Project) -> Result<ProjectDetail> {
    let team = match &project.team_id {
        Some(team_id) => TeamRepository::get(conn, team_id)?,
        None => None,
    };
    Ok(ProjectDetail { project, team })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support;
    use assert_matches::assert_matches;
    use crewboard_core::{MemberCreateParams, MemberId, TaskCreateParams, TeamCreateParams};

    fn team(engine: &Engine, name: &str) -> TeamId {
        engine
            .create_team(&TeamCreateParams {
                name: name.into(),
                description: None,
            })
            .unwrap()
            .id
    }

    fn member(engine: &Engine, team_id: &TeamId, name: &str) -> MemberId {
        engine
            .add_member(
                team_id,
                &MemberCreateParams {
                    name: name.into(),
                    ..Default::default()
                },
            )
            .unwrap()
            .id
    }

    fn project(engine: &Engine, team_id: &TeamId) -> ProjectId {
        engine
            .create_project(&ProjectCreateParams {
                name: "Website".into(),
                description: Some("marketing site".into()),
                team_id: team_id.clone(),
            })
            .unwrap()
            .project
            .id
    }

    fn task(engine: &Engine, project_id: &ProjectId, assignee: Option<&MemberId>) {
        let _ = engine
            .create_task(&TaskCreateParams {
                title: "t".into(),
                project_id: project_id.clone(),
                assigned_member_id: assignee.cloned(),
                ..Default::default()
            })
            .unwrap();
    }

    #[test]
    fn create_embeds_team() {
        let engine = test_support::engine();
        let t = team(&engine, "T");
        let _ = member(&engine, &t, "Ann");
        let detail = engine
            .create_project(&ProjectCreateParams {
                name: " Website ".into(),
                description: None,
                team_id: t.clone(),
            })
            .unwrap();
        assert_eq!(detail.project.name, "Website");
        let embedded = detail.team.unwrap();
        assert_eq!(embedded.id, t);
        assert_eq!(embedded.members.len(), 1);
    }

    #[test]
    fn create_with_unknown_team() {
        let engine = test_support::engine();
        let result = engine.create_project(&ProjectCreateParams {
            name: "P".into(),
            description: None,
            team_id: TeamId::from("team-x"),
        });
        assert_matches!(result, Err(EngineError::NotFound { entity: "Team", .. }));
    }

    #[test]
    fn list_and_get() {
        let engine = test_support::engine();
        let t = team(&engine, "T");
        let p = project(&engine, &t);
        task(&engine, &p, None);
        let listed = engine.list_projects().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].project.task_count, 1);
        assert_eq!(engine.get_project(&p).unwrap().project.id, p);
        assert_matches!(
            engine.get_project(&ProjectId::from("proj-x")),
            Err(EngineError::NotFound { entity: "Project", .. })
        );
    }

    #[test]
    fn rehoming_unassigns_foreign_assignees() {
        let engine = test_support::engine();
        let a = team(&engine, "A");
        let b = team(&engine, "B");
        let ann = member(&engine, &a, "Ann");
        let p = project(&engine, &a);
        task(&engine, &p, Some(&ann));
        task(&engine, &p, Some(&ann));
        task(&engine, &p, None);

        let mutation = engine
            .update_project(
                &p,
                &ProjectUpdateParams {
                    team_id: Some(b.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(mutation.unassigned_tasks, 2);
        assert_eq!(mutation.project.project.team_id, Some(b));
        assert_eq!(mutation.affected_members.len(), 1);
        assert_eq!(mutation.affected_members[0].member_id, ann);
        assert_eq!(mutation.affected_members[0].current_tasks, 0);
    }

    #[test]
    fn rename_keeps_assignments() {
        let engine = test_support::engine();
        let a = team(&engine, "A");
        let ann = member(&engine, &a, "Ann");
        let p = project(&engine, &a);
        task(&engine, &p, Some(&ann));
        let mutation = engine
            .update_project(
                &p,
                &ProjectUpdateParams {
                    name: Some("Renamed".into()),
                    team_id: Some(a.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(mutation.project.project.name, "Renamed");
        assert_eq!(mutation.unassigned_tasks, 0);
        assert!(mutation.affected_members.is_empty());
    }

    #[test]
    fn update_to_unknown_team_fails() {
        let engine = test_support::engine();
        let a = team(&engine, "A");
        let p = project(&engine, &a);
        let result = engine.update_project(
            &p,
            &ProjectUpdateParams {
                team_id: Some(TeamId::from("team-x")),
                ..Default::default()
            },
        );
        assert_matches!(result, Err(EngineError::NotFound { entity: "Team", .. }));
    }

    #[test]
    fn delete_keeps_tasks_unassigned() {
        let engine = test_support::engine();
        let a = team(&engine, "A");
        let ann = member(&engine, &a, "Ann");
        let p = project(&engine, &a);
        task(&engine, &p, Some(&ann));

        let deletion = engine.delete_project(&p).unwrap();
        assert_eq!(deletion.unassigned_tasks, 1);
        assert_eq!(deletion.affected_members[0].current_tasks, 0);

        let tasks = engine.list_tasks(&crewboard_core::TaskFilter::default()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].task.project_id.is_none());
        assert!(tasks[0].task.assigned_member_id.is_none());
        assert_matches!(engine.delete_project(&p), Err(EngineError::NotFound { .. }));
    }
}
