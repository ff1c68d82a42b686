//! Role & circle registry.
//!
//! Flat lookup tables: circle id → circle, role id → role (with exactly one
//! circle), and `(role, stage)` → participation level. Built once from
//! `config.yaml` and shared read-only afterwards.

use crate::error::{QuadError, Result};
use crate::paths;
use crate::types::{ParticipationLevel, Stage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub circle: String,
}

#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    circles: Vec<Circle>,
    roles: Vec<Role>,
    participation: HashMap<(String, Stage), ParticipationLevel>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------------

    pub fn register_circle(&mut self, id: impl Into<String>, name: impl Into<String>) -> Result<()> {
        let id = id.into();
        paths::validate_id(&id)?;
        if self.circle(&id).is_some() {
            return Err(QuadError::DuplicateCircle(id));
        }
        self.circles.push(Circle {
            id,
            name: name.into(),
        });
        Ok(())
    }

    pub fn register_role(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        circle: &str,
    ) -> Result<()> {
        let id = id.into();
        paths::validate_id(&id)?;
        if self.role(&id).is_some() {
            return Err(QuadError::DuplicateRole(id));
        }
        if self.circle(circle).is_none() {
            return Err(QuadError::UnknownCircle(circle.to_string()));
        }
        self.roles.push(Role {
            id,
            name: name.into(),
            circle: circle.to_string(),
        });
        Ok(())
    }

    /// Set the level `role` holds at `stage`. A stage has a single owner, so a
    /// second `Primary` is rejected.
    pub fn set_participation(
        &mut self,
        role: &str,
        stage: Stage,
        level: ParticipationLevel,
    ) -> Result<()> {
        if self.role(role).is_none() {
            return Err(QuadError::UnknownRole(role.to_string()));
        }
        if level == ParticipationLevel::Primary {
            if let Some(owner) = self.primary_for(stage) {
                if owner.id != role {
                    return Err(QuadError::InvalidConfig(format!(
                        "stage '{stage}' already has primary role '{}', cannot also assign '{role}'",
                        owner.id
                    )));
                }
            }
        }
        self.participation.insert((role.to_string(), stage), level);
        Ok(())
    }

    /// Fails unless every stage has exactly one primary role.
    pub fn check_ownership(&self) -> Result<()> {
        for &stage in Stage::all() {
            if self.primary_for(stage).is_none() {
                return Err(QuadError::InvalidConfig(format!(
                    "stage '{stage}' has no primary role"
                )));
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------------

    /// Level configured for `role` at `stage`. Roles with no entry for a stage
    /// are kept informed only.
    pub fn lookup_participation(&self, role: &str, stage: Stage) -> Result<ParticipationLevel> {
        if self.role(role).is_none() {
            return Err(QuadError::UnknownRole(role.to_string()));
        }
        Ok(self
            .participation
            .get(&(role.to_string(), stage))
            .copied()
            .unwrap_or(ParticipationLevel::Inform))
    }

    /// Same as [`lookup_participation`](Self::lookup_participation) for an
    /// unparsed stage name.
    pub fn lookup_participation_by_name(
        &self,
        role: &str,
        stage: &str,
    ) -> Result<ParticipationLevel> {
        let stage: Stage = stage.parse()?;
        self.lookup_participation(role, stage)
    }

    pub fn primary_for(&self, stage: Stage) -> Option<&Role> {
        self.holders(stage, ParticipationLevel::Primary)
            .into_iter()
            .next()
    }

    pub fn holders(&self, stage: Stage, level: ParticipationLevel) -> Vec<&Role> {
        self.roles
            .iter()
            .filter(|r| {
                self.participation.get(&(r.id.clone(), stage)).copied() == Some(level)
            })
            .collect()
    }

    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn circle(&self, id: &str) -> Option<&Circle> {
        self.circles.iter().find(|c| c.id == id)
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    pub fn roles_in_circle(&self, circle: &str) -> Vec<&Role> {
        self.roles.iter().filter(|r| r.circle == circle).collect()
    }

    /// The row of the participation table for `role`, in stage order.
    pub fn participation_row(&self, role: &str) -> Result<Vec<(Stage, ParticipationLevel)>> {
        Stage::all()
            .iter()
            .map(|&stage| Ok((stage, self.lookup_participation(role, stage)?)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn small_registry() -> RoleRegistry {
        let mut reg = RoleRegistry::new();
        reg.register_circle("management", "Management").unwrap();
        reg.register_circle("development", "Development").unwrap();
        reg.register_role("manager", "Manager", "management").unwrap();
        reg.register_role("developer", "Developer", "development")
            .unwrap();
        reg
    }

    #[test]
    fn duplicate_role_rejected() {
        let mut reg = small_registry();
        let err = reg
            .register_role("manager", "Manager Again", "management")
            .unwrap_err();
        assert!(matches!(err, QuadError::DuplicateRole(ref id) if id == "manager"));
        assert_eq!(reg.roles().len(), 2);
    }

    #[test]
    fn role_needs_known_circle() {
        let mut reg = small_registry();
        assert!(matches!(
            reg.register_role("sre", "SRE", "infrastructure"),
            Err(QuadError::UnknownCircle(_))
        ));
    }

    #[test]
    fn duplicate_circle_rejected() {
        let mut reg = small_registry();
        assert!(matches!(
            reg.register_circle("management", "Mgmt"),
            Err(QuadError::DuplicateCircle(_))
        ));
    }

    #[test]
    fn lookup_returns_configured_level() {
        let mut reg = small_registry();
        reg.set_participation("manager", Stage::Question, ParticipationLevel::Primary)
            .unwrap();
        reg.set_participation("developer", Stage::Question, ParticipationLevel::Support)
            .unwrap();
        assert_eq!(
            reg.lookup_participation("manager", Stage::Question).unwrap(),
            ParticipationLevel::Primary
        );
        assert_eq!(
            reg.lookup_participation("developer", Stage::Question).unwrap(),
            ParticipationLevel::Support
        );
        // Unset cell defaults to inform.
        assert_eq!(
            reg.lookup_participation("developer", Stage::Deliver).unwrap(),
            ParticipationLevel::Inform
        );
    }

    #[test]
    fn lookup_unknown_role_and_stage() {
        let reg = small_registry();
        assert!(matches!(
            reg.lookup_participation("ghost", Stage::Question),
            Err(QuadError::UnknownRole(_))
        ));
        assert!(matches!(
            reg.lookup_participation_by_name("manager", "review"),
            Err(QuadError::UnknownStage(_))
        ));
    }

    #[test]
    fn second_primary_rejected() {
        let mut reg = small_registry();
        reg.set_participation("manager", Stage::Question, ParticipationLevel::Primary)
            .unwrap();
        let err = reg
            .set_participation("developer", Stage::Question, ParticipationLevel::Primary)
            .unwrap_err();
        assert!(matches!(err, QuadError::InvalidConfig(_)));
        assert_eq!(reg.primary_for(Stage::Question).unwrap().id, "manager");
    }

    #[test]
    fn ownership_check_requires_every_stage() {
        let mut reg = small_registry();
        reg.set_participation("manager", Stage::Question, ParticipationLevel::Primary)
            .unwrap();
        assert!(reg.check_ownership().is_err());
        for &stage in &Stage::all()[1..] {
            reg.set_participation("developer", stage, ParticipationLevel::Primary)
                .unwrap();
        }
        reg.check_ownership().unwrap();
    }

    #[test]
    fn circle_membership() {
        let reg = small_registry();
        let dev = reg.roles_in_circle("development");
        assert_eq!(dev.len(), 1);
        assert_eq!(dev[0].id, "developer");
        assert!(reg.roles_in_circle("qa").is_empty());
    }
}
