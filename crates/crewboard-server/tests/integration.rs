//! End-to-end tests against a real listener and a file-backed database.

use std::time::Duration;

use crewboard_engine::{Engine, EngineConfig};
use crewboard_server::{AuthService, CrewboardServer, ServerConfig};
use crewboard_settings::AuthSettings;
use crewboard_store::{ConnectionConfig, new_file, run_migrations};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;

struct TestServer {
    base: String,
    client: Client,
    token: String,
    server: CrewboardServer,
    handle: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

/// Boot a server on an ephemeral port and register a user.
async fn boot() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let pool = new_file(&dir.path().join("crewboard.db"), &ConnectionConfig::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();

    let auth = AuthService::new(&AuthSettings {
        jwt_secret: "integration".into(),
        ..AuthSettings::default()
    });
    let server = CrewboardServer::new(
        ServerConfig::default(),
        Engine::new(pool, EngineConfig::default()),
        auth,
    );
    let (addr, handle) = server.listen().await.unwrap();
    let base = format!("http://{addr}");
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({"name": "Ann", "email": "ann@example.com", "password": "secret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    TestServer {
        base,
        client,
        token,
        server,
        handle,
        _dir: dir,
    }
}

impl TestServer {
    async fn call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self
            .client
            .request(method, format!("{}/api{path}", self.base))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        let json = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, json)
    }

    async fn post(&self, path: &str, body: Value) -> Value {
        let (status, json) = self.call(reqwest::Method::POST, path, Some(body)).await;
        assert!(status.is_success(), "POST {path} failed: {status} {json}");
        json
    }

    async fn get(&self, path: &str) -> Value {
        let (status, json) = self.call(reqwest::Method::GET, path, None).await;
        assert!(status.is_success(), "GET {path} failed: {status} {json}");
        json
    }

    async fn member(&self, team: &str, name: &str, capacity: i64) -> String {
        let m = self
            .post(
                &format!("/teams/{team}/members"),
                json!({"name": name, "role": "Dev", "capacity": capacity}),
            )
            .await;
        m["_id"].as_str().unwrap().to_string()
    }

    async fn task(&self, project: &str, title: &str, member: &str) -> String {
        let t = self
            .post(
                "/tasks/createTask",
                json!({
                    "title": title,
                    "project": project,
                    "assignedMember": {"memberId": member},
                    "overrideCapacity": true,
                }),
            )
            .await;
        t["_id"].as_str().unwrap().to_string()
    }
}

fn id(v: &Value) -> String {
    v["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let s = boot().await;
    let resp = s.client.get(format!("{}/health", s.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn auto_assign_picks_least_loaded_member() {
    let s = boot().await;
    let team = id(&s.post("/teams/createTeam", json!({"name": "Core"})).await);
    let a = s.member(&team, "A", 5).await;
    let b = s.member(&team, "B", 5).await;
    let project = id(&s.post("/projects/createProject", json!({"name": "App", "team": team})).await);
    for i in 0..2 {
        let _ = s.task(&project, &format!("a{i}"), &a).await;
    }
    for i in 0..4 {
        let _ = s.task(&project, &format!("b{i}"), &b).await;
    }
    let fresh = id(&s.post("/tasks/createTask", json!({"title": "new", "project": project})).await);

    let outcome = s.post(&format!("/tasks/auto-assign/{fresh}"), json!({})).await;
    assert_eq!(outcome["member"]["memberId"], a.as_str());
    assert_eq!(outcome["capacityExceeded"], false);
    assert_eq!(outcome["task"]["assignedMember"]["name"], "A");

    let listed = s.get(&format!("/tasks?member={a}")).await;
    assert_eq!(listed.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn rebalance_moves_one_task_and_logs_it() {
    let s = boot().await;
    let team = id(&s.post("/teams/createTeam", json!({"name": "Core"})).await);
    let a = s.member(&team, "A", 2).await;
    let b = s.member(&team, "B", 2).await;
    let project = id(&s.post("/projects/createProject", json!({"name": "App", "team": team})).await);
    for title in ["one", "two", "three"] {
        let _ = s.task(&project, title, &a).await;
    }

    let report = s.post("/dashboard/reassign-tasks", json!({})).await;
    assert_eq!(report["movedCount"], 1);
    assert_eq!(report["log"][0]["taskTitle"], "three");
    assert_eq!(report["log"][0]["fromMember"]["memberId"], a.as_str());
    assert_eq!(report["log"][0]["toMember"]["memberId"], b.as_str());
    let affected = report["affectedMembers"].as_array().unwrap();
    assert_eq!(affected.len(), 2);
    assert_eq!(affected[0]["memberId"], a.as_str());
    assert_eq!(affected[0]["currentTasks"], 2);
    assert_eq!(affected[0]["isOverloaded"], false);
    assert_eq!(affected[1]["memberId"], b.as_str());
    assert_eq!(affected[1]["currentTasks"], 1);

    let again = s.post("/dashboard/reassign-tasks", json!({})).await;
    assert_eq!(again["movedCount"], 0);

    let stats = s.get("/dashboard/stats").await;
    assert_eq!(stats["totalTasks"], 3);
    assert_eq!(stats["teamSummary"][0]["teamName"], "Core");
    assert_eq!(stats["teamSummary"][0]["overloadedCount"], 0);
    assert_eq!(stats["recentLogs"].as_array().unwrap().len(), 1);

    let logs = s.get("/dashboard/activity-logs").await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn removing_member_unassigns_their_tasks() {
    let s = boot().await;
    let team = id(&s.post("/teams/createTeam", json!({"name": "Core"})).await);
    let a = s.member(&team, "A", 3).await;
    let project = id(&s.post("/projects/createProject", json!({"name": "App", "team": team})).await);
    let task = s.task(&project, "t", &a).await;

    let (status, removal) = s
        .call(reqwest::Method::DELETE, &format!("/teams/{team}/members/{a}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removal["unassignedTasks"], 1);

    let view = s.get(&format!("/tasks/{task}")).await;
    assert!(view["assignedMember"]["memberId"].is_null());
    assert_eq!(view["assignedMember"]["name"], "Unassigned");
}

#[tokio::test]
async fn project_embeds_team_and_task_count() {
    let s = boot().await;
    let team = id(&s.post("/teams/createTeam", json!({"name": "Core"})).await);
    let a = s.member(&team, "A", 3).await;
    let project = id(&s.post("/projects/createProject", json!({"name": "App", "team": team})).await);
    let _ = s.task(&project, "t", &a).await;

    let detail = s.get(&format!("/projects/{project}")).await;
    assert_eq!(detail["team"]["_id"], team.as_str());
    assert_eq!(detail["team"]["members"][0]["currentTasks"], 1);
    assert_eq!(detail["taskCount"], 1);
}

#[tokio::test]
async fn graceful_shutdown_stops_listener() {
    let s = boot().await;
    let drained = s
        .server
        .shutdown()
        .drain(s.handle, Duration::from_secs(5))
        .await;
    assert!(drained);
    let fresh = Client::new();
    assert!(fresh.get(format!("{}/health", s.base)).send().await.is_err());
}
