mod config;
mod inhibit;
mod runner;
mod service;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::config::RunnerConfig;
use crate::ui::prelude::*;

/// KRunner plugin that keeps the desktop awake ("caffeinate 30m")
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for events
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Well-known name to claim on the session bus
    #[arg(long, default_value = config::DEFAULT_BUS_NAME)]
    bus_name: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the runner on the session bus (default)
    Serve,

    /// Show the matches a launcher query produces, without touching the bus
    Query {
        /// Query text, e.g. `caff 1h30m`
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

fn print_matches(query: &str) -> Result<()> {
    let candidates = runner::match_query(query);
    if candidates.is_empty() {
        emit(
            Level::Info,
            "runner.no_match",
            &format!("No match for {:?}", query),
            Some(json!({ "query": query })),
        );
        return Ok(());
    }

    for candidate in &candidates {
        emit(
            Level::Info,
            "runner.match",
            &format!(
                "{} (id {}, relevance {})",
                candidate.text, candidate.id, candidate.relevance
            ),
            Some(serde_json::to_value(candidate)?),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    let config = RunnerConfig::default().with_bus_name(cli.bus_name);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => service::serve(config).await,
        Commands::Query { text } => print_matches(&text.join(" ")),
    };

    if let Err(e) = result {
        emit(Level::Error, "caffeinate.fatal", &format!("Error: {:#}", e), None);
        std::process::exit(1);
    }
}
