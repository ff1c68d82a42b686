use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quad_core::{participant::Participant, types::Level, QuadError};

use crate::error::AppError;
use crate::state::AppState;

fn participant_json(p: &Participant) -> serde_json::Value {
    let zone = p.zone();
    serde_json::json!({
        "id": p.id,
        "name": p.name,
        "skill": p.skill,
        "trust": p.trust,
        "zone": zone,
        "zone_name": zone.display_name(),
        "requires_review": zone.requires_review(),
        "registered_at": p.registered_at,
        "assessed_at": p.assessed_at,
    })
}

fn parse_level(s: Option<&str>) -> Result<Option<Level>, QuadError> {
    s.map(str::parse).transpose()
}

/// GET /api/participants
pub async fn list_participants(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let list: Vec<serde_json::Value> = app
        .engine
        .participants()
        .iter()
        .map(participant_json)
        .collect();
    Ok(Json(serde_json::json!(list)))
}

#[derive(serde::Deserialize)]
pub struct RegisterBody {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub skill: String,
    pub trust: String,
}

/// POST /api/participants: register with an initial assessment.
pub async fn register_participant(
    State(app): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let skill: Level = body.skill.parse()?;
        let trust: Level = body.trust.parse()?;
        let p = engine.register_participant(&body.id, body.name, skill, trust)?;
        Ok::<_, QuadError>(participant_json(&p))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(serde::Deserialize)]
pub struct UpdateBody {
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub trust: Option<String>,
}

/// PATCH /api/participants/{id}: reassess skill and/or trust.
pub async fn update_participant(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        let skill = parse_level(body.skill.as_deref())?;
        let trust = parse_level(body.trust.as_deref())?;
        let p = engine.update_participant(&id, skill, trust)?;
        Ok::<_, QuadError>(participant_json(&p))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
