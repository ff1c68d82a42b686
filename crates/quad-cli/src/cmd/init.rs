use crate::output::print_json;
use anyhow::Context;
use quad_core::{audit::RedbAuditLog, config::Config, io, paths, state::State};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });

    if !json {
        println!("Initializing QUAD in: {}", root.display());
    }

    for dir in [paths::QUAD_DIR, paths::FLOWS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let mut created = Vec::new();

    if !paths::config_path(root).exists() {
        Config::new(&project_name)
            .save(root)
            .context("failed to write config.yaml")?;
        created.push(paths::CONFIG_FILE);
    }

    if !paths::state_path(root).exists() {
        State::new(&project_name)
            .save(root)
            .context("failed to write state.yaml")?;
        created.push(paths::STATE_FILE);
    }

    let audit_path = paths::audit_db_path(root);
    if !audit_path.exists() {
        RedbAuditLog::open(&audit_path).context("failed to create audit log")?;
        created.push(paths::AUDIT_DB);
    }

    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "project": project_name,
            "created": created,
        }))?;
        return Ok(());
    }

    for file in [paths::CONFIG_FILE, paths::STATE_FILE, paths::AUDIT_DB] {
        let verb = if created.contains(&file) { "created" } else { "exists" };
        println!("  {verb:<8} {file}");
    }
    println!("\nNext: quad participant add <id> --skill <level> --trust <level>");
    Ok(())
}
