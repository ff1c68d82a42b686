use crate::error::{QuadError, Result};
use crate::paths;
use crate::registry::{Circle, Role, RoleRegistry};
use crate::types::{ParticipationLevel, Stage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Default QUAD table
// ---------------------------------------------------------------------------

fn default_circles() -> Vec<Circle> {
    [
        ("management", "Management"),
        ("development", "Development"),
        ("qa", "QA"),
        ("infrastructure", "Infrastructure"),
    ]
    .into_iter()
    .map(|(id, name)| Circle {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

fn default_roles() -> Vec<Role> {
    [
        ("manager", "Manager", "management"),
        ("tech-lead", "Tech Lead", "development"),
        ("developer", "Developer", "development"),
        ("qa", "QA", "qa"),
        ("devops", "DevOps", "infrastructure"),
    ]
    .into_iter()
    .map(|(id, name, circle)| Role {
        id: id.to_string(),
        name: name.to_string(),
        circle: circle.to_string(),
    })
    .collect()
}

fn default_participation() -> BTreeMap<Stage, BTreeMap<String, ParticipationLevel>> {
    use ParticipationLevel::{Inform, Primary, Review, Support};

    let rows: [(Stage, [(&str, ParticipationLevel); 5]); 4] = [
        (
            Stage::Question,
            [
                ("manager", Primary),
                ("tech-lead", Support),
                ("developer", Support),
                ("qa", Review),
                ("devops", Inform),
            ],
        ),
        (
            Stage::Understand,
            [
                ("manager", Review),
                ("tech-lead", Primary),
                ("developer", Support),
                ("qa", Support),
                ("devops", Inform),
            ],
        ),
        (
            Stage::Allocate,
            [
                ("manager", Review),
                ("tech-lead", Primary),
                ("developer", Support),
                ("qa", Inform),
                ("devops", Support),
            ],
        ),
        (
            Stage::Deliver,
            [
                ("manager", Inform),
                ("tech-lead", Review),
                ("developer", Primary),
                ("qa", Review),
                ("devops", Support),
            ],
        ),
    ];

    rows.into_iter()
        .map(|(stage, cells)| {
            let row = cells
                .into_iter()
                .map(|(role, level)| (role.to_string(), level))
                .collect();
            (stage, row)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default = "default_circles")]
    pub circles: Vec<Circle>,
    #[serde(default = "default_roles")]
    pub roles: Vec<Role>,
    /// stage → role id → level
    #[serde(default = "default_participation")]
    pub participation: BTreeMap<Stage, BTreeMap<String, ParticipationLevel>>,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            circles: default_circles(),
            roles: default_roles(),
            participation: default_participation(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(QuadError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Build the runtime registry. Fails on duplicate ids, unknown circles,
    /// participation for unknown roles, or a stage without exactly one primary.
    pub fn registry(&self) -> Result<RoleRegistry> {
        let mut reg = RoleRegistry::new();
        for circle in &self.circles {
            reg.register_circle(circle.id.clone(), circle.name.clone())?;
        }
        for role in &self.roles {
            reg.register_role(role.id.clone(), role.name.clone(), &role.circle)?;
        }
        for (&stage, row) in &self.participation {
            for (role, &level) in row {
                reg.set_participation(role, stage, level)?;
            }
        }
        reg.check_ownership()?;
        Ok(reg)
    }

    // -----------------------------------------------------------------------
    // Setup-time mutations
    // -----------------------------------------------------------------------

    pub fn add_circle(&mut self, id: &str, name: &str) -> Result<()> {
        paths::validate_id(id)?;
        if self.circles.iter().any(|c| c.id == id) {
            return Err(QuadError::DuplicateCircle(id.to_string()));
        }
        self.circles.push(Circle {
            id: id.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn add_role(&mut self, id: &str, name: &str, circle: &str) -> Result<()> {
        paths::validate_id(id)?;
        if self.roles.iter().any(|r| r.id == id) {
            return Err(QuadError::DuplicateRole(id.to_string()));
        }
        if !self.circles.iter().any(|c| c.id == circle) {
            return Err(QuadError::UnknownCircle(circle.to_string()));
        }
        self.roles.push(Role {
            id: id.to_string(),
            name: name.to_string(),
            circle: circle.to_string(),
        });
        Ok(())
    }

    /// Assign `level` to `role` at `stage`. Assigning `Primary` demotes the
    /// previous owner to `Support` so the stage keeps a single owner.
    pub fn set_participation(
        &mut self,
        role: &str,
        stage: Stage,
        level: ParticipationLevel,
    ) -> Result<()> {
        if !self.roles.iter().any(|r| r.id == role) {
            return Err(QuadError::UnknownRole(role.to_string()));
        }
        let row = self.participation.entry(stage).or_default();
        if level == ParticipationLevel::Primary {
            for (other, other_level) in row.iter_mut() {
                if other != role && *other_level == ParticipationLevel::Primary {
                    *other_level = ParticipationLevel::Support;
                }
            }
        }
        row.insert(role.to_string(), level);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let error = |message: String| ConfigWarning {
            level: WarnLevel::Error,
            message,
        };
        let warning = |message: String| ConfigWarning {
            level: WarnLevel::Warning,
            message,
        };

        // 1. Circle and role ids must be unique and well-formed
        let mut seen = HashSet::new();
        for circle in &self.circles {
            if paths::validate_id(&circle.id).is_err() {
                warnings.push(error(format!("circle id '{}' is not a valid id", circle.id)));
            }
            if !seen.insert(circle.id.as_str()) {
                warnings.push(error(format!("circle '{}' is defined twice", circle.id)));
            }
        }
        let circle_ids = seen;

        let mut role_ids = HashSet::new();
        for role in &self.roles {
            if paths::validate_id(&role.id).is_err() {
                warnings.push(error(format!("role id '{}' is not a valid id", role.id)));
            }
            if !role_ids.insert(role.id.as_str()) {
                warnings.push(error(format!("role '{}' is defined twice", role.id)));
            }
            // 2. Every role belongs to a known circle
            if !circle_ids.contains(role.circle.as_str()) {
                warnings.push(error(format!(
                    "role '{}' belongs to unknown circle '{}'",
                    role.id, role.circle
                )));
            }
        }

        // 3. Exactly one primary per stage
        for &stage in Stage::all() {
            let owners: Vec<&str> = self
                .participation
                .get(&stage)
                .map(|row| {
                    row.iter()
                        .filter(|(_, l)| **l == ParticipationLevel::Primary)
                        .map(|(r, _)| r.as_str())
                        .collect()
                })
                .unwrap_or_default();
            match owners.len() {
                0 => warnings.push(error(format!("stage '{stage}' has no primary role"))),
                1 => {}
                _ => warnings.push(error(format!(
                    "stage '{stage}' has {} primary roles ({}), expected one",
                    owners.len(),
                    owners.join(", ")
                ))),
            }
        }

        // 4. Participation entries must name registered roles
        for (stage, row) in &self.participation {
            for role in row.keys() {
                if !role_ids.contains(role.as_str()) {
                    warnings.push(error(format!(
                        "participation for stage '{stage}' names unknown role '{role}'"
                    )));
                }
            }
        }

        // 5. Empty circles are allowed but usually a typo
        for circle in &self.circles {
            if !self.roles.iter().any(|r| r.circle == circle.id) {
                warnings.push(warning(format!("circle '{}' has no roles", circle.id)));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
