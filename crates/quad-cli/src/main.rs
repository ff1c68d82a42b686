mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    circle::CircleSubcommand, config::ConfigSubcommand, flow::FlowSubcommand,
    participant::ParticipantSubcommand, role::RoleSubcommand, zone::ZoneSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quad",
    about = "QUAD workflow engine: role-gated Question/Understand/Allocate/Deliver flows",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .quad/ or .git/)
    #[arg(long, global = true, env = "QUAD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize QUAD in the current project
    Init {
        /// Project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Create, advance and inspect flows
    Flow {
        #[command(subcommand)]
        subcommand: FlowSubcommand,
    },

    /// Register and reassess participants
    Participant {
        #[command(subcommand)]
        subcommand: ParticipantSubcommand,
    },

    /// Evaluate the AI adoption matrix
    Zone {
        #[command(subcommand)]
        subcommand: ZoneSubcommand,
    },

    /// Manage roles and their stage participation
    Role {
        #[command(subcommand)]
        subcommand: RoleSubcommand,
    },

    /// Manage circles
    Circle {
        #[command(subcommand)]
        subcommand: CircleSubcommand,
    },

    /// Show or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Serve the JSON API
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref(), cli.json),
        Commands::Flow { subcommand } => cmd::flow::run(&root, subcommand, cli.json),
        Commands::Participant { subcommand } => {
            cmd::participant::run(&root, subcommand, cli.json)
        }
        Commands::Zone { subcommand } => cmd::zone::run(subcommand, cli.json),
        Commands::Role { subcommand } => cmd::role::run(&root, subcommand, cli.json),
        Commands::Circle { subcommand } => cmd::circle::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
