use axum::http::StatusCode;
use http_body_util::BodyExt;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bootstrap a QUAD project with the default role table inside `dir`.
fn init_project(dir: &TempDir) {
    quad_core::io::ensure_dir(&quad_core::paths::flows_dir(dir.path())).unwrap();
    quad_core::config::Config::new("test-project")
        .save(dir.path())
        .unwrap();
    quad_core::state::State::new("test-project")
        .save(dir.path())
        .unwrap();
}

fn app(dir: &TempDir) -> axum::Router {
    init_project(dir);
    quad_server::build_router(dir.path()).unwrap()
}

async fn send(app: axum::Router, req: axum::http::Request<axum::body::Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

/// Send a request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn with_json(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, req).await
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    with_json(app, "POST", uri, body).await
}

async fn register(app: &axum::Router, id: &str, skill: &str, trust: &str) {
    let (status, _) = post_json(
        app.clone(),
        "/api/participants",
        json!({ "id": id, "skill": skill, "trust": trust }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registering {id}");
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[test]
fn build_router_fails_when_not_initialized() {
    let dir = TempDir::new().unwrap();
    assert!(quad_server::build_router(dir.path()).is_err());
}

#[tokio::test]
async fn get_config_returns_project_config() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, json) = get(app, "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["project"]["name"], "test-project");
    assert!(json["warnings"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_flows_returns_empty_list() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get(app(&dir), "/api/flows").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn create_and_get_flow() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, created) = post_json(app.clone(), "/api/flows", json!({ "title": "Search" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], "F1");
    assert_eq!(created["state"], "question");

    let (status, view) = get(app.clone(), "/api/flows/F1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["flow"]["title"], "Search");
    assert_eq!(view["history"], json!([]));

    let (_, list) = get(app, "/api/flows").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_flow_is_404() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, json) = get(app.clone(), "/api/flows/F42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "unknown_flow");

    let (status, _) = get(app, "/api/flows/F42/history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transition_requires_primary() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    register(&app, "dev", "medium", "medium").await;
    register(&app, "mia", "high", "high").await;
    post_json(app.clone(), "/api/flows", json!({ "title": "t" })).await;

    let (status, json) = post_json(
        app.clone(),
        "/api/flows/F1/transition",
        json!({ "role": "developer", "participant": "dev", "to": "understand" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "insufficient_authority");

    let (status, record) = post_json(
        app.clone(),
        "/api/flows/F1/transition",
        json!({ "role": "manager", "participant": "mia" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["from"], "question");
    assert_eq!(record["to"], "understand");

    let (_, history) = get(app, "/api/flows/F1/history").await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["role"], "manager");
}

#[tokio::test]
async fn skipping_a_stage_is_422() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    register(&app, "mia", "high", "high").await;
    post_json(app.clone(), "/api/flows", json!({ "title": "t" })).await;

    let (status, json) = post_json(
        app,
        "/api/flows/F1/transition",
        json!({ "role": "manager", "participant": "mia", "to": "allocate" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "invalid_transition");
}

#[tokio::test]
async fn low_trust_ai_use_needs_endorsement() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    register(&app, "newbie", "low", "low").await;
    register(&app, "quinn", "high", "high").await;
    post_json(app.clone(), "/api/flows", json!({ "title": "t" })).await;

    let body = json!({ "role": "manager", "participant": "newbie", "used_ai": true });
    let (status, json) = post_json(app.clone(), "/api/flows/F1/transition", body.clone()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "review_required");

    let (status, endorsement) = post_json(
        app.clone(),
        "/api/flows/F1/endorse",
        json!({ "role": "qa", "participant": "quinn" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(endorsement["stage"], "question");

    let (status, record) = post_json(app, "/api/flows/F1/transition", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["endorsed_by"], json!(["quinn"]));
}

#[tokio::test]
async fn abandon_flow() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    register(&app, "mia", "high", "high").await;
    post_json(app.clone(), "/api/flows", json!({ "title": "t" })).await;

    let (status, record) = post_json(
        app.clone(),
        "/api/flows/F1/abandon",
        json!({ "role": "manager", "participant": "mia", "reason": "out of scope" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["to"], "abandoned");

    let (_, view) = get(app, "/api/flows/F1").await;
    assert_eq!(view["flow"]["state"], "abandoned");
    assert_eq!(view["flow"]["abandon_reason"], "out of scope");
}

#[tokio::test]
async fn default_target_on_terminal_flow_names_no_stage() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    register(&app, "mia", "high", "high").await;
    post_json(app.clone(), "/api/flows", json!({ "title": "t" })).await;

    let (status, record) = post_json(
        app.clone(),
        "/api/flows/F1/transition",
        json!({ "role": "manager", "participant": "mia" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["to"], "understand");

    post_json(
        app.clone(),
        "/api/flows/F1/abandon",
        json!({ "role": "tech-lead", "participant": "mia", "reason": "dup" }),
    )
    .await;
    let (status, json) = post_json(
        app,
        "/api/flows/F1/transition",
        json!({ "role": "tech-lead", "participant": "mia" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("to next stage: flow is abandoned"), "{message}");
    assert!(!message.contains("closed"), "{message}");
}

// ---------------------------------------------------------------------------
// Adoption
// ---------------------------------------------------------------------------

#[tokio::test]
async fn evaluate_zone() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get(app(&dir), "/api/adoption?skill=high&trust=low").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["zone"], "expert_review");
    assert_eq!(json["name"], "Expert Review");
    assert_eq!(json["requires_review"], true);
}

#[tokio::test]
async fn evaluate_zone_rejects_bad_level() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get(app(&dir), "/api/adoption?skill=extreme&trust=low").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_level");
}

#[tokio::test]
async fn matrix_has_nine_distinct_cells() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get(app(&dir), "/api/adoption/matrix").await;
    assert_eq!(status, StatusCode::OK);
    let cells = json.as_array().unwrap();
    assert_eq!(cells.len(), 9);
    let zones: std::collections::HashSet<_> =
        cells.iter().map(|c| c["zone"].as_str().unwrap()).collect();
    assert_eq!(zones.len(), 9);
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_update_and_list_participants() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    register(&app, "newbie", "low", "low").await;

    let (status, json) = post_json(
        app.clone(),
        "/api/participants",
        json!({ "id": "newbie", "skill": "low", "trust": "low" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "duplicate_participant");

    let (status, updated) = with_json(
        app.clone(),
        "PATCH",
        "/api/participants/newbie",
        json!({ "trust": "high" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["zone"], "supervised_autonomy");
    assert_eq!(updated["requires_review"], false);

    let (status, _) = with_json(
        app.clone(),
        "PATCH",
        "/api/participants/ghost",
        json!({ "skill": "high" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = get(app, "/api/participants").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lists_roles_with_participation() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get(app(&dir), "/api/roles").await;
    assert_eq!(status, StatusCode::OK);
    let manager = json
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "manager")
        .unwrap();
    assert_eq!(manager["participation"]["question"], "primary");
    assert_eq!(manager["participation"]["deliver"], "inform");
}

#[tokio::test]
async fn participation_lookup() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, json) = get(app.clone(), "/api/roles/developer/participation/d").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["level"], "primary");
    assert_eq!(json["stage"], "deliver");

    let (status, _) = get(app.clone(), "/api/roles/ghost/participation/question").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(app, "/api/roles/manager/participation/review").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "unknown_stage");
}
