use crate::error::{QuadError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const QUAD_DIR: &str = ".quad";
pub const FLOWS_DIR: &str = ".quad/flows";

pub const CONFIG_FILE: &str = ".quad/config.yaml";
pub const STATE_FILE: &str = ".quad/state.yaml";
pub const PARTICIPANTS_FILE: &str = ".quad/participants.yaml";
pub const AUDIT_DB: &str = ".quad/audit.redb";

pub const MANIFEST_FILE: &str = "manifest.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn quad_dir(root: &Path) -> PathBuf {
    root.join(QUAD_DIR)
}

pub fn flows_dir(root: &Path) -> PathBuf {
    root.join(FLOWS_DIR)
}

pub fn flow_dir(root: &Path, id: &str) -> PathBuf {
    flows_dir(root).join(id)
}

pub fn flow_manifest(root: &Path, id: &str) -> PathBuf {
    flow_dir(root, id).join(MANIFEST_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn participants_path(root: &Path) -> PathBuf {
    root.join(PARTICIPANTS_FILE)
}

pub fn audit_db_path(root: &Path) -> PathBuf {
    root.join(AUDIT_DB)
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]*$").expect("identifier pattern is valid")
    })
}

/// Role, circle, participant and flow ids double as path segments and map keys.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id_re().is_match(id) {
        return Err(QuadError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ids() {
        for id in ["tech-lead", "F1", "qa_engineer", "alice"] {
            validate_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_ids() {
        for id in ["", "-dash", "has spaces", "../escape", "a/b"] {
            assert!(validate_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.quad/config.yaml")
        );
        assert_eq!(
            flow_manifest(root, "F3"),
            PathBuf::from("/tmp/proj/.quad/flows/F3/manifest.yaml")
        );
        assert_eq!(
            audit_db_path(root),
            PathBuf::from("/tmp/proj/.quad/audit.redb")
        );
    }
}
