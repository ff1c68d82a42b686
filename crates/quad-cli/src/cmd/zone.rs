use crate::cmd::participant::parse_level;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use quad_core::{
    adoption::{self, AdoptionZone},
    types::Level,
};

#[derive(Subcommand)]
pub enum ZoneSubcommand {
    /// Evaluate the zone for a skill/trust pair
    Eval {
        #[arg(long)]
        skill: String,
        #[arg(long)]
        trust: String,
    },
    /// Print the full 3x3 adoption matrix
    Matrix,
}

pub fn run(subcmd: ZoneSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ZoneSubcommand::Eval { skill, trust } => eval(&skill, &trust, json),
        ZoneSubcommand::Matrix => matrix(json),
    }
}

fn eval(skill: &str, trust: &str, json: bool) -> anyhow::Result<()> {
    let skill = parse_level(skill, "skill")?;
    let trust = parse_level(trust, "trust")?;
    let zone = adoption::evaluate(skill, trust);

    if json {
        print_json(&serde_json::json!({
            "skill": skill,
            "trust": trust,
            "zone": zone,
            "name": zone.display_name(),
            "requires_review": zone.requires_review(),
        }))?;
    } else {
        println!("{zone}");
        if zone.requires_review() {
            println!("AI-assisted transitions need a review-level endorsement.");
        }
    }
    Ok(())
}

fn matrix(json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&adoption::matrix())?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = Level::all()
        .iter()
        .map(|&skill| {
            let mut row = vec![format!("skill {skill}")];
            row.extend(Level::all().iter().map(|&trust| cell(adoption::evaluate(skill, trust))));
            row
        })
        .collect();
    print_table(&["", "TRUST LOW", "TRUST MEDIUM", "TRUST HIGH"], rows);
    println!("\n* AI-assisted transitions need a review-level endorsement");
    Ok(())
}

fn cell(zone: AdoptionZone) -> String {
    if zone.requires_review() {
        format!("{zone} *")
    } else {
        zone.to_string()
    }
}
