use crate::adoption::{self, AdoptionZone};
use crate::error::{QuadError, Result};
use crate::paths;
use crate::types::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub skill: Level,
    pub trust: Level,
    pub registered_at: DateTime<Utc>,
    pub assessed_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(id: impl Into<String>, skill: Level, trust: Level) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: None,
            skill,
            trust,
            registered_at: now,
            assessed_at: now,
        }
    }

    /// Derived on every call; never stored.
    pub fn zone(&self) -> AdoptionZone {
        adoption::evaluate(self.skill, self.trust)
    }
}

// ---------------------------------------------------------------------------
// Directory (participants.yaml)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Directory {
    /// A missing file is an empty directory.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::participants_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let dir: Directory = serde_yaml::from_str(&data)?;
        Ok(dir)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::participants_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn get(&self, id: &str) -> Result<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| QuadError::UnknownParticipant(id.to_string()))
    }

    pub fn register(
        &mut self,
        id: &str,
        name: Option<String>,
        skill: Level,
        trust: Level,
    ) -> Result<&Participant> {
        paths::validate_id(id)?;
        if self.participants.iter().any(|p| p.id == id) {
            return Err(QuadError::DuplicateParticipant(id.to_string()));
        }
        let mut participant = Participant::new(id, skill, trust);
        participant.name = name;
        self.participants.push(participant);
        Ok(&self.participants[self.participants.len() - 1])
    }

    /// Reassess a participant. Fields left as `None` keep their value.
    pub fn update(
        &mut self,
        id: &str,
        skill: Option<Level>,
        trust: Option<Level>,
    ) -> Result<&Participant> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| QuadError::UnknownParticipant(id.to_string()))?;
        if let Some(skill) = skill {
            participant.skill = skill;
        }
        if let Some(trust) = trust {
            participant.trust = trust;
        }
        participant.assessed_at = Utc::now();
        Ok(participant)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
