use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use quad_core::config::Config;
use std::path::Path;

#[derive(Subcommand)]
pub enum CircleSubcommand {
    /// List circles and their roles
    List,
    /// Add a circle
    Add {
        id: String,
        #[arg(long)]
        name: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: CircleSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CircleSubcommand::List => list(root, json),
        CircleSubcommand::Add { id, name } => add(root, &id, name, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    let members = |circle: &str| -> Vec<String> {
        config
            .roles
            .iter()
            .filter(|r| r.circle == circle)
            .map(|r| r.id.clone())
            .collect()
    };

    if json {
        let circles: Vec<_> = config
            .circles
            .iter()
            .map(|c| serde_json::json!({ "id": c.id, "name": c.name, "roles": members(&c.id) }))
            .collect();
        print_json(&circles)?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = config
        .circles
        .iter()
        .map(|c| vec![c.id.clone(), c.name.clone(), members(&c.id).join(", ")])
        .collect();
    print_table(&["CIRCLE", "NAME", "ROLES"], rows);
    Ok(())
}

fn add(root: &Path, id: &str, name: Option<String>, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    let name = name.unwrap_or_else(|| id.replace('-', " "));
    config
        .add_circle(id, &name)
        .with_context(|| format!("cannot add circle '{id}'"))?;
    config.save(root).context("failed to save config")?;

    if json {
        print_json(&serde_json::json!({ "id": id, "name": name }))?;
    } else {
        println!("Added circle {id}");
    }
    Ok(())
}
