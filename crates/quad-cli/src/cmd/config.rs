use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use quad_core::{
    config::{Config, WarnLevel},
    types::{ParticipationLevel, Stage},
};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the project configuration and its stage ownership
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    if json {
        print_json(&config)?;
        return Ok(());
    }

    println!("Project: {}", config.project.name);
    if let Some(ref desc) = config.project.description {
        println!("Desc:    {desc}");
    }
    println!(
        "Circles: {}  Roles: {}\n",
        config.circles.len(),
        config.roles.len()
    );

    let rows: Vec<Vec<String>> = Stage::all()
        .iter()
        .map(|stage| {
            let owner = config
                .participation
                .get(stage)
                .and_then(|row| {
                    row.iter()
                        .find(|(_, l)| **l == ParticipationLevel::Primary)
                        .map(|(r, _)| r.clone())
                })
                .unwrap_or_else(|| "(none)".to_string());
            vec![stage.letter().to_string(), stage.to_string(), owner]
        })
        .collect();
    print_table(&["", "STAGE", "PRIMARY"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
