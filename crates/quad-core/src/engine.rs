//! Flow state machine.
//!
//! `Engine` ties the registry, participant directory, flow manifests and the
//! audit log together. Every operation that touches a flow, reads included,
//! runs under that flow's own lock, so the check-then-update sequence of a
//! transition is a critical section per flow while different flows proceed in
//! parallel.
//!
//! The audit append is the commit point of a transition. The manifest is
//! written after it, and a manifest that lags its last audit record (a crash
//! between the two writes) is replayed forward the next time the flow is
//! loaded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;

use crate::adoption::{self, AdoptionZone};
use crate::audit::{AuditLog, History, RedbAuditLog, TransitionRecord};
use crate::config::Config;
use crate::error::{QuadError, Result};
use crate::flow::{Endorsement, Flow};
use crate::io;
use crate::participant::{Directory, Participant};
use crate::paths;
use crate::registry::RoleRegistry;
use crate::state::State;
use crate::types::{FlowState, Level, ParticipationLevel, Stage};

// ---------------------------------------------------------------------------
// Requests and views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub flow: String,
    pub role: String,
    pub participant: String,
    pub target: FlowState,
    pub used_ai: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowView {
    pub flow: Flow,
    pub history: History,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    root: PathBuf,
    config: Config,
    registry: RoleRegistry,
    directory: RwLock<Directory>,
    /// Serializes flow creation, which allocates ids from state.yaml.
    creation: Mutex<()>,
    flow_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    audit: Box<dyn AuditLog>,
}

impl Engine {
    /// Open an initialized project with the on-disk audit log.
    pub fn open(root: &Path) -> Result<Self> {
        if !paths::state_path(root).exists() {
            return Err(QuadError::NotInitialized);
        }
        let audit = RedbAuditLog::open(&paths::audit_db_path(root))?;
        Self::with_audit(root, audit)
    }

    pub fn with_audit(root: &Path, audit: impl AuditLog + 'static) -> Result<Self> {
        // Fail early on an uninitialized root rather than on the first flow.
        State::load(root)?;
        let config = Config::load(root)?;
        let registry = config.registry()?;
        let directory = Directory::load(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            registry,
            directory: RwLock::new(directory),
            creation: Mutex::new(()),
            flow_locks: Mutex::new(HashMap::new()),
            audit: Box::new(audit),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Lock handle for an existing flow. Unknown ids never get an entry, so
    /// the map is bounded by the number of flows on disk.
    fn flow_lock(&self, id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .flow_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(id) {
            return Ok(lock.clone());
        }
        if !Flow::exists(&self.root, id) {
            return Err(QuadError::UnknownFlow(id.to_string()));
        }
        Ok(locks.entry(id.to_string()).or_default().clone())
    }

    fn forget_lock(&self, id: &str) {
        self.flow_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.flow_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Load the manifest and history of `id`. Call with the flow lock held.
    ///
    /// A manifest one step behind its last audit record is replayed forward
    /// and saved before it is returned.
    fn load_flow(&self, id: &str) -> Result<(Flow, History)> {
        let mut flow = Flow::load(&self.root, id)?;
        let history = self.audit.history(id)?;
        if let Some(last) = history.last() {
            if last.from == flow.state && last.to != flow.state {
                flow.replay(last)?;
                flow.save(&self.root)?;
                tracing::warn!(flow = %id, state = %flow.state, "manifest replayed from audit log");
            }
        }
        Ok((flow, history))
    }

    // ---------------------------------------------------------------------------
    // Flows
    // ---------------------------------------------------------------------------

    pub fn create_flow(&self, title: &str) -> Result<Flow> {
        let _guard = self.creation.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = State::load(&self.root)?;
        let id = state.allocate_flow_id();

        // Hold the new flow's lock until it is fully registered, so readers
        // never see a manifest whose creation is then undone.
        let lock = Arc::new(Mutex::new(()));
        let _flow_guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.flow_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), lock.clone());

        let flow = Flow::new(id.clone(), title);
        let registered = flow
            .save(&self.root)
            .and_then(|()| self.audit.open_flow(&id))
            .and_then(|()| state.save(&self.root));
        if let Err(e) = registered {
            tracing::error!(flow = %id, error = %e, "flow creation failed, removing manifest");
            if let Err(cleanup) = io::remove_dir_if_exists(&paths::flow_dir(&self.root, &id)) {
                tracing::error!(flow = %id, error = %cleanup, "could not remove partial flow");
            }
            self.forget_lock(&id);
            return Err(e);
        }

        tracing::info!(flow = %id, title, "flow created");
        Ok(flow)
    }

    pub fn flow(&self, id: &str) -> Result<Flow> {
        Ok(self.flow_state(id)?.flow)
    }

    pub fn list_flows(&self) -> Result<Vec<Flow>> {
        let mut flows = Vec::new();
        for listed in Flow::list(&self.root)? {
            match self.flow(&listed.id) {
                Ok(flow) => flows.push(flow),
                // Removed by a failed creation since the directory scan.
                Err(QuadError::UnknownFlow(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(flows)
    }

    /// Records for `id` in append order. Empty for a flow with no transitions.
    pub fn history(&self, id: &str) -> Result<History> {
        Ok(self.flow_state(id)?.history)
    }

    /// Manifest and history read together under the flow lock.
    pub fn flow_state(&self, id: &str) -> Result<FlowView> {
        let lock = self.flow_lock(id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (flow, history) = self.load_flow(id)?;
        Ok(FlowView { flow, history })
    }

    /// Validate and apply a forward transition.
    ///
    /// Checks run in order: the flow exists, the target is the immediate
    /// successor, the role is primary at the current stage, and (for
    /// AI-assisted work in a low-trust zone) another participant has
    /// endorsed the current stage at review level.
    pub fn request_transition(&self, req: &TransitionRequest) -> Result<TransitionRecord> {
        let lock = self.flow_lock(&req.flow)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (flow, _) = self.load_flow(&req.flow)?;
        self.apply_transition(flow, req)
    }

    /// Advance `id` to whatever follows its current state. The successor is
    /// resolved under the flow lock, so it cannot go stale before the checks.
    pub fn request_next_transition(
        &self,
        id: &str,
        role: &str,
        participant: &str,
        used_ai: bool,
    ) -> Result<TransitionRecord> {
        let lock = self.flow_lock(id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (flow, _) = self.load_flow(id)?;
        flow.active_stage("next stage")?;
        let target = flow
            .state
            .successor()
            .ok_or_else(|| QuadError::InvalidTransition {
                flow: flow.id.clone(),
                from: flow.state.to_string(),
                to: "next stage".to_string(),
                reason: "no successor".to_string(),
            })?;
        let req = TransitionRequest {
            flow: id.to_string(),
            role: role.to_string(),
            participant: participant.to_string(),
            target,
            used_ai,
        };
        self.apply_transition(flow, &req)
    }

    /// Validation steps 2-5 and the commit. Call with the flow lock held.
    fn apply_transition(&self, mut flow: Flow, req: &TransitionRequest) -> Result<TransitionRecord> {
        flow.check_target(req.target)?;
        let stage = flow.active_stage(req.target.as_str())?;

        let level = self.require_level(&flow, &req.role, stage, ParticipationLevel::Primary)?;
        let participant = self.participant(&req.participant)?;

        let zone = participant.zone();
        let mut endorsed_by = Vec::new();
        if req.used_ai && zone.requires_review() {
            endorsed_by = flow
                .endorsements_for(stage)
                .filter(|e| e.participant != req.participant)
                .map(|e| e.participant.clone())
                .collect();
            if endorsed_by.is_empty() {
                return Err(QuadError::ReviewRequired {
                    flow: flow.id.clone(),
                    stage: stage.to_string(),
                    participant: req.participant.clone(),
                    zone: zone.display_name().to_string(),
                });
            }
        }

        let from = flow.state;
        flow.advance(req.target)?;
        let record = TransitionRecord {
            flow: flow.id.clone(),
            from,
            to: flow.state,
            participant: req.participant.clone(),
            role: req.role.clone(),
            level,
            used_ai: req.used_ai,
            zone: req.used_ai.then_some(zone),
            endorsed_by,
            note: None,
            timestamp: flow.updated_at,
        };
        self.commit(&flow, &record)?;

        tracing::info!(
            flow = %flow.id,
            from = %record.from,
            to = %record.to,
            role = %record.role,
            participant = %record.participant,
            used_ai = record.used_ai,
            "transition applied"
        );
        Ok(record)
    }

    /// Retire a non-terminal flow early. Only the current stage's primary may
    /// abandon, and the abandonment is audited like any transition.
    pub fn abandon(
        &self,
        id: &str,
        role: &str,
        participant: &str,
        reason: &str,
    ) -> Result<TransitionRecord> {
        let lock = self.flow_lock(id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (mut flow, _) = self.load_flow(id)?;
        let stage = flow.active_stage(FlowState::Abandoned.as_str())?;
        let level = self.require_level(&flow, role, stage, ParticipationLevel::Primary)?;
        self.participant(participant)?;

        let from = flow.state;
        flow.abandon(reason)?;
        let record = TransitionRecord {
            flow: flow.id.clone(),
            from,
            to: flow.state,
            participant: participant.to_string(),
            role: role.to_string(),
            level,
            used_ai: false,
            zone: None,
            endorsed_by: Vec::new(),
            note: Some(reason.to_string()),
            timestamp: flow.updated_at,
        };
        self.commit(&flow, &record)?;

        tracing::info!(flow = %id, from = %record.from, reason, "flow abandoned");
        Ok(record)
    }

    /// Record a review-level sign-off on the flow's current stage.
    pub fn endorse(&self, id: &str, participant: &str, role: &str) -> Result<Endorsement> {
        let lock = self.flow_lock(id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (mut flow, _) = self.load_flow(id)?;
        let stage = flow.active_stage("endorse")?;
        let level = self.registry.lookup_participation(role, stage)?;
        if level != ParticipationLevel::Review {
            return Err(QuadError::InsufficientAuthority {
                flow: flow.id.clone(),
                stage: stage.to_string(),
                role: role.to_string(),
                level: level.to_string(),
                required: ParticipationLevel::Review.to_string(),
            });
        }
        self.participant(participant)?;

        let endorsement = flow.endorse(participant, role)?;
        flow.save(&self.root)?;
        tracing::info!(flow = %id, %stage, participant, role, "endorsement recorded");
        Ok(endorsement)
    }

    fn require_level(
        &self,
        flow: &Flow,
        role: &str,
        stage: Stage,
        required: ParticipationLevel,
    ) -> Result<ParticipationLevel> {
        let level = self.registry.lookup_participation(role, stage)?;
        if level != required {
            return Err(QuadError::InsufficientAuthority {
                flow: flow.id.clone(),
                stage: stage.to_string(),
                role: role.to_string(),
                level: level.to_string(),
                required: required.to_string(),
            });
        }
        Ok(level)
    }

    /// Append `record`, then persist `next`. A failed append leaves nothing
    /// written. Once the append succeeds the transition has happened; a
    /// manifest write failing after it is repaired by [`load_flow`](Self::load_flow).
    fn commit(&self, next: &Flow, record: &TransitionRecord) -> Result<()> {
        self.audit.append(record)?;
        if let Err(e) = next.save(&self.root) {
            tracing::error!(
                flow = %next.id,
                error = %e,
                "manifest write failed after audit append, will replay on next load"
            );
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Participants
    // ---------------------------------------------------------------------------

    pub fn participant(&self, id: &str) -> Result<Participant> {
        let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
        directory.get(id).cloned()
    }

    pub fn participants(&self) -> Vec<Participant> {
        let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
        directory.participants.clone()
    }

    pub fn register_participant(
        &self,
        id: &str,
        name: Option<String>,
        skill: Level,
        trust: Level,
    ) -> Result<Participant> {
        self.mutate_directory(|dir| dir.register(id, name, skill, trust).cloned())
    }

    pub fn update_participant(
        &self,
        id: &str,
        skill: Option<Level>,
        trust: Option<Level>,
    ) -> Result<Participant> {
        self.mutate_directory(|dir| dir.update(id, skill, trust).cloned())
    }

    /// Apply `f` to a copy of the directory and swap it in only once saved.
    fn mutate_directory<F>(&self, f: F) -> Result<Participant>
    where
        F: FnOnce(&mut Directory) -> Result<Participant>,
    {
        let mut directory = self.directory.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = directory.clone();
        let participant = f(&mut next)?;
        next.save(&self.root)?;
        *directory = next;
        tracing::info!(
            participant = %participant.id,
            skill = %participant.skill,
            trust = %participant.trust,
            "participant assessed"
        );
        Ok(participant)
    }

    // ---------------------------------------------------------------------------
    // Adoption
    // ---------------------------------------------------------------------------

    pub fn evaluate_adoption_zone(skill: Level, trust: Level) -> AdoptionZone {
        adoption::evaluate(skill, trust)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
