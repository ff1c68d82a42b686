use crate::error::{QuadError, Result};
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: String,
    #[serde(default)]
    pub flows: Vec<String>,
    /// Monotonic counter behind flow ids. Never reused, even for abandoned flows.
    #[serde(default)]
    pub next_flow_seq: u32,
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl State {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: project.into(),
            flows: Vec::new(),
            next_flow_seq: 0,
            last_updated: Utc::now(),
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::state_path(root);
        if !path.exists() {
            return Err(QuadError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let state: State = serde_yaml::from_str(&data)?;
        Ok(state)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::state_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    /// Reserve the next flow id (`F1`, `F2`, ...) and track it.
    pub fn allocate_flow_id(&mut self) -> String {
        self.next_flow_seq += 1;
        let id = format!("F{}", self.next_flow_seq);
        self.flows.push(id.clone());
        self.last_updated = Utc::now();
        id
    }

    pub fn has_flow(&self, id: &str) -> bool {
        self.flows.iter().any(|f| f == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn state_roundtrip() {
        let dir = TempDir::new().unwrap();

        let mut state = State::new("my-project");
        let id = state.allocate_flow_id();
        state.save(dir.path()).unwrap();

        let loaded = State::load(dir.path()).unwrap();
        assert_eq!(loaded.project, "my-project");
        assert!(loaded.has_flow(&id));
        assert_eq!(loaded.next_flow_seq, 1);
    }

    #[test]
    fn state_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            State::load(dir.path()),
            Err(QuadError::NotInitialized)
        ));
    }

    #[test]
    fn flow_ids_are_sequential() {
        let mut state = State::new("proj");
        assert_eq!(state.allocate_flow_id(), "F1");
        assert_eq!(state.allocate_flow_id(), "F2");
        assert_eq!(state.flows, vec!["F1", "F2"]);
    }
}
