use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use quad_core::{
    config::Config,
    types::{ParticipationLevel, Stage},
};
use std::path::Path;

#[derive(Subcommand)]
pub enum RoleSubcommand {
    /// List roles with their participation at every stage
    List,
    /// Add a role to a circle (informed at every stage until set)
    Add {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        circle: String,
    },
    /// Set a role's participation level at a stage
    Set {
        role: String,
        stage: String,
        /// primary, support, review or inform
        level: String,
    },
    /// Look up a role's participation level at a stage
    Lookup { role: String, stage: String },
}

pub fn run(root: &Path, subcmd: RoleSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RoleSubcommand::List => list(root, json),
        RoleSubcommand::Add { id, name, circle } => add(root, &id, name, &circle, json),
        RoleSubcommand::Set { role, stage, level } => set(root, &role, &stage, &level, json),
        RoleSubcommand::Lookup { role, stage } => lookup(root, &role, &stage, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let registry = config.registry().context("invalid role configuration")?;

    if json {
        let roles: Vec<_> = registry
            .roles()
            .iter()
            .map(|r| -> anyhow::Result<serde_json::Value> {
                let row: serde_json::Map<String, serde_json::Value> = registry
                    .participation_row(&r.id)?
                    .into_iter()
                    .map(|(stage, level)| (stage.to_string(), serde_json::json!(level)))
                    .collect();
                Ok(serde_json::json!({
                    "id": r.id,
                    "name": r.name,
                    "circle": r.circle,
                    "participation": row,
                }))
            })
            .collect::<anyhow::Result<_>>()?;
        print_json(&roles)?;
        return Ok(());
    }

    let mut rows = Vec::new();
    for role in registry.roles() {
        let mut row = vec![role.id.clone(), role.circle.clone()];
        for (_, level) in registry.participation_row(&role.id)? {
            row.push(level.to_string());
        }
        rows.push(row);
    }
    print_table(
        &["ROLE", "CIRCLE", "QUESTION", "UNDERSTAND", "ALLOCATE", "DELIVER"],
        rows,
    );
    Ok(())
}

fn add(
    root: &Path,
    id: &str,
    name: Option<String>,
    circle: &str,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    let name = name.unwrap_or_else(|| id.replace('-', " "));
    config
        .add_role(id, &name, circle)
        .with_context(|| format!("cannot add role '{id}'"))?;
    config.save(root).context("failed to save config")?;

    if json {
        print_json(&serde_json::json!({ "id": id, "name": name, "circle": circle }))?;
    } else {
        println!("Added role {id} to circle {circle}");
    }
    Ok(())
}

fn set(root: &Path, role: &str, stage: &str, level: &str, json: bool) -> anyhow::Result<()> {
    let stage: Stage = stage.parse().context("invalid stage")?;
    let level: ParticipationLevel = level.parse().context("invalid participation level")?;

    let mut config = Config::load(root).context("failed to load config")?;
    config
        .set_participation(role, stage, level)
        .with_context(|| format!("cannot set participation for '{role}'"))?;
    config
        .registry()
        .context("participation change leaves the configuration invalid")?;
    config.save(root).context("failed to save config")?;

    if json {
        print_json(&serde_json::json!({ "role": role, "stage": stage, "level": level }))?;
    } else {
        println!("{role} is now {level} at {stage}");
    }
    Ok(())
}

fn lookup(root: &Path, role: &str, stage: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let registry = config.registry().context("invalid role configuration")?;
    let level = registry
        .lookup_participation_by_name(role, stage)
        .with_context(|| format!("cannot look up '{role}' at '{stage}'"))?;

    if json {
        print_json(&serde_json::json!({ "role": role, "stage": stage, "level": level }))?;
    } else {
        println!("{level}");
    }
    Ok(())
}
