use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use quad_core::{audit::History, types::FlowState, Engine, TransitionRequest};
use std::path::Path;

#[derive(Subcommand)]
pub enum FlowSubcommand {
    /// Create a new flow in the question stage
    Create { title: String },
    /// List all flows
    List,
    /// Show a flow and its transition history
    Show { id: String },
    /// Advance a flow to its next stage
    Advance {
        id: String,
        /// Target state (default: the flow's immediate successor)
        #[arg(long)]
        to: Option<String>,
        /// Role the participant acts under
        #[arg(long)]
        role: String,
        /// Acting participant id
        #[arg(long = "as", value_name = "PARTICIPANT")]
        participant: String,
        /// The work being submitted was AI-assisted
        #[arg(long)]
        ai: bool,
    },
    /// Sign off on the flow's current stage as a reviewer
    Endorse {
        id: String,
        #[arg(long)]
        role: String,
        #[arg(long = "as", value_name = "PARTICIPANT")]
        participant: String,
    },
    /// Retire a flow before it closes
    Abandon {
        id: String,
        #[arg(long)]
        role: String,
        #[arg(long = "as", value_name = "PARTICIPANT")]
        participant: String,
        #[arg(long)]
        reason: String,
    },
    /// Show the audit trail of a flow
    History { id: String },
}

pub fn run(root: &Path, subcmd: FlowSubcommand, json: bool) -> anyhow::Result<()> {
    let engine = Engine::open(root).context("failed to open project")?;
    match subcmd {
        FlowSubcommand::Create { title } => create(&engine, &title, json),
        FlowSubcommand::List => list(&engine, json),
        FlowSubcommand::Show { id } => show(&engine, &id, json),
        FlowSubcommand::Advance {
            id,
            to,
            role,
            participant,
            ai,
        } => advance(&engine, &id, to.as_deref(), &role, &participant, ai, json),
        FlowSubcommand::Endorse {
            id,
            role,
            participant,
        } => endorse(&engine, &id, &role, &participant, json),
        FlowSubcommand::Abandon {
            id,
            role,
            participant,
            reason,
        } => abandon(&engine, &id, &role, &participant, &reason, json),
        FlowSubcommand::History { id } => history(&engine, &id, json),
    }
}

fn create(engine: &Engine, title: &str, json: bool) -> anyhow::Result<()> {
    let flow = engine
        .create_flow(title)
        .with_context(|| format!("failed to create flow '{title}'"))?;

    if json {
        print_json(&flow)?;
    } else {
        println!("Created flow {}: {}", flow.id, flow.title);
        println!("Stage: {}", flow.state);
    }
    Ok(())
}

fn list(engine: &Engine, json: bool) -> anyhow::Result<()> {
    let flows = engine.list_flows().context("failed to list flows")?;

    if json {
        let summaries: Vec<_> = flows
            .iter()
            .map(|f| {
                serde_json::json!({
                    "id": f.id,
                    "title": f.title,
                    "state": f.state,
                    "updated_at": f.updated_at,
                })
            })
            .collect();
        print_json(&summaries)?;
        return Ok(());
    }

    if flows.is_empty() {
        println!("No flows yet.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = flows
        .iter()
        .map(|f| {
            vec![
                f.id.clone(),
                f.state.to_string(),
                f.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                f.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATE", "UPDATED", "TITLE"], rows);
    Ok(())
}

fn show(engine: &Engine, id: &str, json: bool) -> anyhow::Result<()> {
    let view = engine
        .flow_state(id)
        .with_context(|| format!("cannot show flow '{id}'"))?;

    if json {
        print_json(&view)?;
        return Ok(());
    }

    let flow = &view.flow;
    println!("Flow:    {}: {}", flow.id, flow.title);
    println!("State:   {}", flow.state);
    println!("Created: {}", flow.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(stage) = flow.current_stage() {
        if let Some(owner) = engine.registry().primary_for(stage) {
            println!("Owner:   {} ({})", owner.name, owner.id);
        }
        let endorsers: Vec<&str> = flow
            .endorsements_for(stage)
            .map(|e| e.participant.as_str())
            .collect();
        if !endorsers.is_empty() {
            println!("Endorsed by: {}", endorsers.join(", "));
        }
    }
    if let Some(ref reason) = flow.abandon_reason {
        println!("Reason:  {reason}");
    }

    if !view.history.is_empty() {
        println!();
        print_history(&view.history);
    }
    Ok(())
}

fn advance(
    engine: &Engine,
    id: &str,
    to: Option<&str>,
    role: &str,
    participant: &str,
    used_ai: bool,
    json: bool,
) -> anyhow::Result<()> {
    let record = match to {
        Some(s) => {
            let target = s
                .parse::<FlowState>()
                .with_context(|| format!("unknown target state: {s}"))?;
            engine
                .request_transition(&TransitionRequest {
                    flow: id.to_string(),
                    role: role.to_string(),
                    participant: participant.to_string(),
                    target,
                    used_ai,
                })
                .with_context(|| format!("cannot advance flow '{id}' to {target}"))?
        }
        None => engine
            .request_next_transition(id, role, participant, used_ai)
            .with_context(|| format!("cannot advance flow '{id}'"))?,
    };

    if json {
        print_json(&record)?;
    } else {
        println!("Advanced {id}: {} -> {}", record.from, record.to);
        if !record.endorsed_by.is_empty() {
            println!("Reviewed by: {}", record.endorsed_by.join(", "));
        }
    }
    Ok(())
}

fn endorse(
    engine: &Engine,
    id: &str,
    role: &str,
    participant: &str,
    json: bool,
) -> anyhow::Result<()> {
    let endorsement = engine
        .endorse(id, participant, role)
        .with_context(|| format!("cannot endorse flow '{id}'"))?;

    if json {
        print_json(&endorsement)?;
    } else {
        println!(
            "{participant} endorsed {id} at {} as {role}",
            endorsement.stage
        );
    }
    Ok(())
}

fn abandon(
    engine: &Engine,
    id: &str,
    role: &str,
    participant: &str,
    reason: &str,
    json: bool,
) -> anyhow::Result<()> {
    let record = engine
        .abandon(id, role, participant, reason)
        .with_context(|| format!("cannot abandon flow '{id}'"))?;

    if json {
        print_json(&record)?;
    } else {
        println!("Abandoned {id} at {}: {reason}", record.from);
    }
    Ok(())
}

fn history(engine: &Engine, id: &str, json: bool) -> anyhow::Result<()> {
    let history = engine
        .history(id)
        .with_context(|| format!("cannot read history of flow '{id}'"))?;

    if json {
        print_json(&history)?;
    } else if history.is_empty() {
        println!("No transitions recorded for {id}.");
    } else {
        print_history(&history);
    }
    Ok(())
}

fn print_history(history: &History) {
    let rows: Vec<Vec<String>> = history
        .iter()
        .map(|r| {
            vec![
                r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                format!("{} -> {}", r.from, r.to),
                r.participant.clone(),
                r.role.clone(),
                if r.used_ai { "yes".to_string() } else { String::new() },
                r.note.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["WHEN", "TRANSITION", "BY", "ROLE", "AI", "NOTE"], rows);
}
