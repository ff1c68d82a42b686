use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quad_core::{types::FlowState, QuadError, TransitionRequest};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/flows: list all flows.
pub async fn list_flows(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let flows = engine.list_flows()?;
        let list: Vec<serde_json::Value> = flows
            .iter()
            .map(|f| {
                serde_json::json!({
                    "id": f.id,
                    "title": f.title,
                    "state": f.state,
                    "created_at": f.created_at,
                    "updated_at": f.updated_at,
                })
            })
            .collect();
        Ok::<_, QuadError>(serde_json::json!(list))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct CreateFlowBody {
    pub title: String,
}

/// POST /api/flows: create a flow in the question stage.
pub async fn create_flow(
    State(app): State<AppState>,
    Json(body): Json<CreateFlowBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let flow = engine.create_flow(&body.title)?;
        Ok::<_, QuadError>(serde_json::to_value(&flow)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/flows/{id}: current state plus full history.
pub async fn get_flow(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let view = engine.flow_state(&id)?;
        Ok::<_, QuadError>(serde_json::to_value(&view)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// GET /api/flows/{id}/history
pub async fn get_history(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let history = engine.history(&id)?;
        Ok::<_, QuadError>(serde_json::to_value(&history)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct TransitionBody {
    pub role: String,
    pub participant: String,
    /// Target state; the flow's immediate successor when omitted.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub used_ai: bool,
}

/// POST /api/flows/{id}/transition
pub async fn transition_flow(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let record = match body.to {
            Some(ref to) => engine.request_transition(&TransitionRequest {
                flow: id,
                role: body.role,
                participant: body.participant,
                target: to.parse::<FlowState>()?,
                used_ai: body.used_ai,
            })?,
            None => engine.request_next_transition(
                &id,
                &body.role,
                &body.participant,
                body.used_ai,
            )?,
        };
        Ok::<_, QuadError>(serde_json::to_value(&record)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct EndorseBody {
    pub role: String,
    pub participant: String,
}

/// POST /api/flows/{id}/endorse
pub async fn endorse_flow(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<EndorseBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let endorsement = engine.endorse(&id, &body.participant, &body.role)?;
        Ok::<_, QuadError>(serde_json::to_value(&endorsement)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct AbandonBody {
    pub role: String,
    pub participant: String,
    pub reason: String,
}

/// POST /api/flows/{id}/abandon
pub async fn abandon_flow(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AbandonBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let record = engine.abandon(&id, &body.role, &body.participant, &body.reason)?;
        Ok::<_, QuadError>(serde_json::to_value(&record)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
