use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use quad_core::{participant::Participant, types::Level, Engine};
use std::path::Path;

#[derive(Subcommand)]
pub enum ParticipantSubcommand {
    /// Register a participant with an initial assessment
    Add {
        id: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Skill level: low, medium or high
        #[arg(long)]
        skill: String,
        /// Trust level: low, medium or high
        #[arg(long)]
        trust: String,
    },
    /// Reassess a participant's skill and/or trust
    Update {
        id: String,
        #[arg(long)]
        skill: Option<String>,
        #[arg(long)]
        trust: Option<String>,
    },
    /// List registered participants
    List,
    /// Show a participant and their adoption zone
    Show { id: String },
}

pub fn run(root: &Path, subcmd: ParticipantSubcommand, json: bool) -> anyhow::Result<()> {
    let engine = Engine::open(root).context("failed to open project")?;
    match subcmd {
        ParticipantSubcommand::Add {
            id,
            name,
            skill,
            trust,
        } => add(&engine, &id, name, &skill, &trust, json),
        ParticipantSubcommand::Update { id, skill, trust } => {
            update(&engine, &id, skill.as_deref(), trust.as_deref(), json)
        }
        ParticipantSubcommand::List => list(&engine, json),
        ParticipantSubcommand::Show { id } => show(&engine, &id, json),
    }
}

pub(crate) fn parse_level(s: &str, what: &str) -> anyhow::Result<Level> {
    s.parse::<Level>()
        .with_context(|| format!("invalid {what} level"))
}

fn add(
    engine: &Engine,
    id: &str,
    name: Option<String>,
    skill: &str,
    trust: &str,
    json: bool,
) -> anyhow::Result<()> {
    let skill = parse_level(skill, "skill")?;
    let trust = parse_level(trust, "trust")?;
    let participant = engine
        .register_participant(id, name, skill, trust)
        .with_context(|| format!("failed to register participant '{id}'"))?;
    report(&participant, "Registered", json)
}

fn update(
    engine: &Engine,
    id: &str,
    skill: Option<&str>,
    trust: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    if skill.is_none() && trust.is_none() {
        anyhow::bail!("nothing to update: pass --skill and/or --trust");
    }
    let skill = skill.map(|s| parse_level(s, "skill")).transpose()?;
    let trust = trust.map(|s| parse_level(s, "trust")).transpose()?;
    let participant = engine
        .update_participant(id, skill, trust)
        .with_context(|| format!("failed to update participant '{id}'"))?;
    report(&participant, "Updated", json)
}

fn list(engine: &Engine, json: bool) -> anyhow::Result<()> {
    let participants = engine.participants();

    if json {
        let rows: Vec<_> = participants.iter().map(summary).collect();
        print_json(&rows)?;
        return Ok(());
    }

    if participants.is_empty() {
        println!("No participants yet.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = participants
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.skill.to_string(),
                p.trust.to_string(),
                p.zone().display_name().to_string(),
                p.name.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ID", "SKILL", "TRUST", "ZONE", "NAME"], rows);
    Ok(())
}

fn show(engine: &Engine, id: &str, json: bool) -> anyhow::Result<()> {
    let participant = engine
        .participant(id)
        .with_context(|| format!("cannot show participant '{id}'"))?;

    if json {
        print_json(&summary(&participant))?;
        return Ok(());
    }

    let zone = participant.zone();
    println!("Participant: {}", participant.id);
    if let Some(ref name) = participant.name {
        println!("Name:        {name}");
    }
    println!("Skill:       {}", participant.skill);
    println!("Trust:       {}", participant.trust);
    println!("Zone:        {zone}");
    if zone.requires_review() {
        println!("AI-assisted transitions need a review-level endorsement.");
    }
    println!(
        "Assessed:    {}",
        participant.assessed_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn summary(p: &Participant) -> serde_json::Value {
    let zone = p.zone();
    serde_json::json!({
        "id": p.id,
        "name": p.name,
        "skill": p.skill,
        "trust": p.trust,
        "zone": zone,
        "zone_name": zone.display_name(),
        "requires_review": zone.requires_review(),
        "assessed_at": p.assessed_at,
    })
}

fn report(participant: &Participant, verb: &str, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&summary(participant))?;
    } else {
        println!(
            "{verb} {}: skill {}, trust {} ({})",
            participant.id,
            participant.skill,
            participant.trust,
            participant.zone()
        );
    }
    Ok(())
}
