use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quad_core::error::QuadError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

fn status_for(err: &QuadError) -> StatusCode {
    match err {
        QuadError::NotInitialized => StatusCode::BAD_REQUEST,
        QuadError::UnknownRole(_)
        | QuadError::UnknownCircle(_)
        | QuadError::UnknownFlow(_)
        | QuadError::UnknownParticipant(_) => StatusCode::NOT_FOUND,
        QuadError::DuplicateRole(_)
        | QuadError::DuplicateCircle(_)
        | QuadError::DuplicateParticipant(_) => StatusCode::CONFLICT,
        QuadError::UnknownStage(_)
        | QuadError::InvalidId(_)
        | QuadError::InvalidLevel(_)
        | QuadError::InvalidParticipation(_)
        | QuadError::InvalidZone(_) => StatusCode::BAD_REQUEST,
        QuadError::InsufficientAuthority { .. } => StatusCode::FORBIDDEN,
        QuadError::InvalidTransition { .. } | QuadError::ReviewRequired { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        QuadError::InvalidConfig(_)
        | QuadError::Storage(_)
        | QuadError::Io(_)
        | QuadError::Yaml(_)
        | QuadError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match self.0.downcast_ref::<QuadError>() {
            Some(e) => (status_for(e), e.kind()),
            None => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string(), "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
