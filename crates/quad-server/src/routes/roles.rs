use axum::extract::{Path, State};
use axum::Json;
use quad_core::types::Stage;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/roles: every role with its participation row.
pub async fn list_roles(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let registry = app.engine.registry();
    let mut roles = Vec::new();
    for role in registry.roles() {
        let row: serde_json::Map<String, serde_json::Value> = registry
            .participation_row(&role.id)?
            .into_iter()
            .map(|(stage, level)| (stage.to_string(), serde_json::json!(level)))
            .collect();
        roles.push(serde_json::json!({
            "id": role.id,
            "name": role.name,
            "circle": role.circle,
            "participation": row,
        }));
    }
    Ok(Json(serde_json::json!(roles)))
}

/// GET /api/roles/{role}/participation/{stage}
pub async fn get_participation(
    State(app): State<AppState>,
    Path((role, stage)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let stage: Stage = stage.parse()?;
    let level = app.engine.registry().lookup_participation(&role, stage)?;
    let primary = app.engine.registry().primary_for(stage).map(|r| r.id.clone());
    Ok(Json(serde_json::json!({
        "role": role,
        "stage": stage,
        "level": level,
        "primary": primary,
    })))
}
