use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuadError {
    #[error("not initialized: run 'quad init'")]
    NotInitialized,

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("unknown circle: {0}")]
    UnknownCircle(String),

    #[error("role already registered: {0}")]
    DuplicateRole(String),

    #[error("circle already registered: {0}")]
    DuplicateCircle(String),

    #[error("unknown flow: {0}")]
    UnknownFlow(String),

    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("participant already registered: {0}")]
    DuplicateParticipant(String),

    #[error("invalid id '{0}': must be alphanumeric with hyphens or underscores")]
    InvalidId(String),

    #[error("invalid level '{0}': expected low, medium or high")]
    InvalidLevel(String),

    #[error("invalid participation level '{0}': expected primary, support, review or inform")]
    InvalidParticipation(String),

    #[error("invalid adoption zone: {0}")]
    InvalidZone(String),

    #[error("invalid transition for flow {flow} from {from} to {to}: {reason}")]
    InvalidTransition {
        flow: String,
        from: String,
        to: String,
        reason: String,
    },

    #[error(
        "insufficient authority on flow {flow}: role '{role}' is {level} at {stage}, {required} required"
    )]
    InsufficientAuthority {
        flow: String,
        stage: String,
        role: String,
        level: String,
        required: String,
    },

    #[error(
        "review required on flow {flow}: '{participant}' is in zone '{zone}' and no review-level endorsement exists for {stage}"
    )]
    ReviewRequired {
        flow: String,
        stage: String,
        participant: String,
        zone: String,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("storage unavailable: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl QuadError {
    /// Storage and serialization faults cannot be fixed by resubmitting the request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            QuadError::Storage(_) | QuadError::Io(_) | QuadError::Yaml(_) | QuadError::Json(_)
        )
    }

    /// Stable snake_case name of the error kind, used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            QuadError::NotInitialized => "not_initialized",
            QuadError::UnknownRole(_) => "unknown_role",
            QuadError::UnknownStage(_) => "unknown_stage",
            QuadError::UnknownCircle(_) => "unknown_circle",
            QuadError::DuplicateRole(_) => "duplicate_role",
            QuadError::DuplicateCircle(_) => "duplicate_circle",
            QuadError::UnknownFlow(_) => "unknown_flow",
            QuadError::UnknownParticipant(_) => "unknown_participant",
            QuadError::DuplicateParticipant(_) => "duplicate_participant",
            QuadError::InvalidId(_) => "invalid_id",
            QuadError::InvalidLevel(_) => "invalid_level",
            QuadError::InvalidParticipation(_) => "invalid_participation",
            QuadError::InvalidZone(_) => "invalid_zone",
            QuadError::InvalidTransition { .. } => "invalid_transition",
            QuadError::InsufficientAuthority { .. } => "insufficient_authority",
            QuadError::ReviewRequired { .. } => "review_required",
            QuadError::InvalidConfig(_) => "invalid_config",
            QuadError::Storage(_) => "storage",
            QuadError::Io(_) => "io",
            QuadError::Yaml(_) => "yaml",
            QuadError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, QuadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_faults_are_fatal() {
        assert!(QuadError::Storage("disk gone".into()).is_fatal());
        assert!(QuadError::Io(std::io::Error::other("boom")).is_fatal());
        assert!(!QuadError::UnknownFlow("F1".into()).is_fatal());
        assert!(!QuadError::InsufficientAuthority {
            flow: "F1".into(),
            stage: "question".into(),
            role: "developer".into(),
            level: "support".into(),
            required: "primary".into(),
        }
        .is_fatal());
    }

    #[test]
    fn messages_carry_context() {
        let err = QuadError::InvalidTransition {
            flow: "F7".into(),
            from: "question".into(),
            to: "allocate".into(),
            reason: "stages cannot be skipped".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("F7"));
        assert!(msg.contains("question"));
        assert!(msg.contains("allocate"));
        assert_eq!(err.kind(), "invalid_transition");
    }
}
