use axum::extract::State;
use axum::Json;
use quad_core::QuadError;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the configuration the engine was opened with, plus any
/// validation warnings.
///
/// No PUT endpoint. Roles and circles are set up through the CLI; the server
/// picks changes up on restart.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let config = app.engine.config();
    let mut json = serde_json::to_value(config).map_err(QuadError::from)?;
    json["warnings"] = serde_json::to_value(config.validate()).map_err(QuadError::from)?;
    Ok(Json(json))
}
