use quad_core::Engine;
use std::path::Path;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
///
/// The engine owns the audit database handle and the per-flow locks, so a
/// single instance is shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn open(root: &Path) -> quad_core::Result<Self> {
        Ok(Self::with_engine(Engine::open(root)?))
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quad_core::{config::Config, state::State, QuadError};

    #[test]
    fn open_requires_initialized_root() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            AppState::open(dir.path()),
            Err(QuadError::NotInitialized)
        ));
    }

    #[test]
    fn open_shares_engine_root() {
        let dir = tempfile::TempDir::new().unwrap();
        Config::new("test").save(dir.path()).unwrap();
        State::new("test").save(dir.path()).unwrap();

        let state = AppState::open(dir.path()).unwrap();
        let cloned = state.clone();
        assert_eq!(cloned.engine.root(), dir.path());
        assert!(Arc::ptr_eq(&state.engine, &cloned.engine));
    }
}
