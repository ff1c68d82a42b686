use axum::extract::Query;
use axum::Json;
use quad_core::{adoption, types::Level, Engine, QuadError};

use crate::error::AppError;

#[derive(serde::Deserialize)]
pub struct ZoneQuery {
    pub skill: String,
    pub trust: String,
}

/// GET /api/adoption?skill=&trust=: evaluate one cell of the matrix.
///
/// Pure lookup, so it runs inline rather than on the blocking pool.
pub async fn evaluate_zone(
    Query(q): Query<ZoneQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let skill: Level = q.skill.parse()?;
    let trust: Level = q.trust.parse()?;
    let zone = Engine::evaluate_adoption_zone(skill, trust);
    Ok(Json(serde_json::json!({
        "skill": skill,
        "trust": trust,
        "zone": zone,
        "name": zone.display_name(),
        "requires_review": zone.requires_review(),
    })))
}

/// GET /api/adoption/matrix: all nine cells, skill-major.
pub async fn get_matrix() -> Result<Json<serde_json::Value>, AppError> {
    let cells = serde_json::to_value(adoption::matrix()).map_err(QuadError::from)?;
    Ok(Json(cells))
}
