use crate::audit::TransitionRecord;
use crate::error::{QuadError, Result};
use crate::paths;
use crate::types::{FlowState, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// StageVisit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageVisit {
    pub state: FlowState,
    pub entered: DateTime<Utc>,
    pub exited: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Endorsement
// ---------------------------------------------------------------------------

/// A review-level sign-off on the stage a flow is currently in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endorsement {
    pub stage: Stage,
    pub participant: String,
    pub role: String,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub title: String,
    pub state: FlowState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every persisted mutation.
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endorsements: Vec<Endorsement>,
    pub visits: Vec<StageVisit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abandon_reason: Option<String>,
}

impl Flow {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            state: FlowState::Question,
            created_at: now,
            updated_at: now,
            version: 0,
            endorsements: Vec::new(),
            visits: vec![StageVisit {
                state: FlowState::Question,
                entered: now,
                exited: None,
            }],
            abandon_reason: None,
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path, id: &str) -> Result<Self> {
        if paths::validate_id(id).is_err() {
            return Err(QuadError::UnknownFlow(id.to_string()));
        }
        let manifest = paths::flow_manifest(root, id);
        if !manifest.exists() {
            return Err(QuadError::UnknownFlow(id.to_string()));
        }
        let data = std::fs::read_to_string(&manifest)?;
        let flow: Flow = serde_yaml::from_str(&data)?;
        Ok(flow)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let manifest = paths::flow_manifest(root, &self.id);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&manifest, data.as_bytes())
    }

    pub fn exists(root: &Path, id: &str) -> bool {
        paths::validate_id(id).is_ok() && paths::flow_manifest(root, id).exists()
    }

    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let flows_dir = paths::flows_dir(root);
        if !flows_dir.exists() {
            return Ok(Vec::new());
        }

        let mut flows = Vec::new();
        for entry in std::fs::read_dir(&flows_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let id = entry.file_name().to_string_lossy().into_owned();
                match Self::load(root, &id) {
                    Ok(f) => flows.push(f),
                    Err(QuadError::UnknownFlow(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        flows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(flows)
    }

    // ---------------------------------------------------------------------------
    // State transitions
    // ---------------------------------------------------------------------------

    pub fn current_stage(&self) -> Option<Stage> {
        self.state.stage()
    }

    /// The stage this flow is working in, or an error naming `attempted` if
    /// the flow is already terminal.
    pub fn active_stage(&self, attempted: &str) -> Result<Stage> {
        self.current_stage()
            .ok_or_else(|| QuadError::InvalidTransition {
                flow: self.id.clone(),
                from: self.state.to_string(),
                to: attempted.to_string(),
                reason: format!("flow is {}", self.state),
            })
    }

    /// `target` must be the immediate successor of the current state.
    pub fn check_target(&self, target: FlowState) -> Result<()> {
        let invalid = |reason: String| QuadError::InvalidTransition {
            flow: self.id.clone(),
            from: self.state.to_string(),
            to: target.to_string(),
            reason,
        };

        if self.state.is_terminal() {
            return Err(invalid(format!("flow is {}", self.state)));
        }
        if target == FlowState::Abandoned {
            return Err(invalid("use abandon to retire a flow early".to_string()));
        }
        match self.state.successor() {
            Some(next) if next == target => Ok(()),
            Some(next) if target <= self.state => Err(invalid(format!(
                "transitions are forward-only; next is {next}"
            ))),
            Some(next) => Err(invalid(format!("stages cannot be skipped; next is {next}"))),
            None => Err(invalid("no successor".to_string())),
        }
    }

    fn enter(&mut self, target: FlowState) {
        self.enter_at(target, Utc::now());
    }

    fn enter_at(&mut self, target: FlowState, now: DateTime<Utc>) {
        if let Some(last) = self.visits.last_mut() {
            last.exited = Some(now);
        }
        self.state = target;
        self.updated_at = now;
        self.version += 1;
        self.visits.push(StageVisit {
            state: target,
            entered: now,
            exited: if target.is_terminal() { Some(now) } else { None },
        });
    }

    /// Move to `target` after [`check_target`](Self::check_target) accepts it.
    pub fn advance(&mut self, target: FlowState) -> Result<()> {
        self.check_target(target)?;
        self.enter(target);
        Ok(())
    }

    pub fn abandon(&mut self, reason: impl Into<String>) -> Result<()> {
        self.active_stage(FlowState::Abandoned.as_str())?;
        self.abandon_reason = Some(reason.into());
        self.enter(FlowState::Abandoned);
        Ok(())
    }

    /// Bring a manifest that lags the audit log up to `record`, which must
    /// start from the manifest's current state. Timestamps come from the
    /// record so the replayed manifest matches the one that was lost.
    pub fn replay(&mut self, record: &TransitionRecord) -> Result<()> {
        if record.flow != self.id || record.from != self.state {
            return Err(QuadError::InvalidTransition {
                flow: self.id.clone(),
                from: self.state.to_string(),
                to: record.to.to_string(),
                reason: format!("audit record starts from {}", record.from),
            });
        }
        if record.to == FlowState::Abandoned {
            self.active_stage(FlowState::Abandoned.as_str())?;
            self.abandon_reason = record.note.clone();
        } else {
            self.check_target(record.to)?;
        }
        self.enter_at(record.to, record.timestamp);
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Endorsements
    // ---------------------------------------------------------------------------

    pub fn endorsements_for(&self, stage: Stage) -> impl Iterator<Item = &Endorsement> {
        self.endorsements.iter().filter(move |e| e.stage == stage)
    }

    /// Record a sign-off for the current stage. Re-endorsing is a no-op.
    pub fn endorse(&mut self, participant: &str, role: &str) -> Result<Endorsement> {
        let stage = self.active_stage("endorse")?;
        if let Some(existing) = self
            .endorsements_for(stage)
            .find(|e| e.participant == participant)
        {
            return Ok(existing.clone());
        }
        let endorsement = Endorsement {
            stage,
            participant: participant.to_string(),
            role: role.to_string(),
            at: Utc::now(),
        };
        self.endorsements.push(endorsement.clone());
        self.updated_at = endorsement.at;
        self.version += 1;
        Ok(endorsement)
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
    fn flow_save_load() {
        let dir = TempDir::new().unwrap();
        let flow = Flow::new("F1", "Onboard payments");
        flow.save(dir.path()).unwrap();

        let loaded = Flow::load(dir.path(), "F1").unwrap();
        assert_eq!(loaded.title, "Onboard payments");
        assert_eq!(loaded.state, FlowState::Question);
        assert!(Flow::exists(dir.path(), "F1"));
    }

    #[test]
    fn load_unknown_flow() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Flow::load(dir.path(), "F9"),
            Err(QuadError::UnknownFlow(_))
        ));
        assert!(matches!(
            Flow::load(dir.path(), "../etc"),
            Err(QuadError::UnknownFlow(_))
        ));
    }

    #[test]
    fn list_sorted_by_creation() {
        let dir = TempDir::new().unwrap();
        Flow::new("F1", "first").save(dir.path()).unwrap();
        Flow::new("F2", "second").save(dir.path()).unwrap();
        let flows = Flow::list(dir.path()).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].id, "F1");
    }

    #[test]
    fn advance_walks_every_stage_then_closes() {
        let mut flow = Flow::new("F1", "t");
        for target in [
            FlowState::Understand,
            FlowState::Allocate,
            FlowState::Deliver,
            FlowState::Closed,
        ] {
            flow.advance(target).unwrap();
        }
        assert_eq!(flow.state, FlowState::Closed);
        assert_eq!(flow.version, 4);
        assert_eq!(flow.visits.len(), 5);
        assert!(flow.visits.iter().all(|v| v.exited.is_some()));
    }

    #[test]
    fn cannot_skip_or_go_back() {
        let mut flow = Flow::new("F1", "t");
        let err = flow.advance(FlowState::Allocate).unwrap_err();
        assert!(matches!(err, QuadError::InvalidTransition { ref reason, .. } if reason.contains("skipped")));

        flow.advance(FlowState::Understand).unwrap();
        let err = flow.advance(FlowState::Question).unwrap_err();
        assert!(matches!(err, QuadError::InvalidTransition { ref reason, .. } if reason.contains("forward-only")));
        assert_eq!(flow.state, FlowState::Understand);
    }

    #[test]
    fn closed_only_from_deliver() {
        let mut flow = Flow::new("F1", "t");
        assert!(flow.advance(FlowState::Closed).is_err());
    }

    #[test]
    fn terminal_flows_reject_everything() {
        let mut flow = Flow::new("F1", "t");
        flow.abandon("duplicate of F0").unwrap();
        assert_eq!(flow.state, FlowState::Abandoned);
        assert!(flow.advance(FlowState::Understand).is_err());
        assert!(flow.abandon("again").is_err());
        assert!(flow.endorse("alice", "qa").is_err());
    }

    #[test]
    fn endorsements_are_per_stage_and_idempotent() {
        let mut flow = Flow::new("F1", "t");
        flow.endorse("quinn", "qa").unwrap();
        flow.endorse("quinn", "qa").unwrap();
        assert_eq!(flow.endorsements_for(Stage::Question).count(), 1);

        flow.advance(FlowState::Understand).unwrap();
        assert_eq!(flow.endorsements_for(Stage::Understand).count(), 0);
    }

    fn record(from: FlowState, to: FlowState) -> TransitionRecord {
        TransitionRecord {
            flow: "F1".to_string(),
            from,
            to,
            participant: "mia".to_string(),
            role: "manager".to_string(),
            level: crate::types::ParticipationLevel::Primary,
            used_ai: false,
            zone: None,
            endorsed_by: Vec::new(),
            note: (to == FlowState::Abandoned).then(|| "dup".to_string()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn replay_applies_lagging_record() {
        let mut flow = Flow::new("F1", "t");
        let rec = record(FlowState::Question, FlowState::Understand);
        flow.replay(&rec).unwrap();
        assert_eq!(flow.state, FlowState::Understand);
        assert_eq!(flow.updated_at, rec.timestamp);
        assert_eq!(flow.version, 1);

        let abandoned = record(FlowState::Understand, FlowState::Abandoned);
        flow.replay(&abandoned).unwrap();
        assert_eq!(flow.abandon_reason.as_deref(), Some("dup"));
    }

    #[test]
    fn replay_rejects_record_from_another_state() {
        let mut flow = Flow::new("F1", "t");
        let err = flow
            .replay(&record(FlowState::Understand, FlowState::Allocate))
            .unwrap_err();
        assert!(matches!(err, QuadError::InvalidTransition { .. }));
        assert_eq!(flow.state, FlowState::Question);
    }
}
