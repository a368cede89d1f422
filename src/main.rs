//! questloom CLI: generate quests by chaining actions over a world state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use questloom::chaining::{self, Chain};
use questloom::config::{self, ChainingConfig};
use questloom::logic::Logic;

#[derive(Parser)]
#[command(name = "questloom", version, about = "Quest generator for text adventures")]
struct Cli {
    /// Logic file (TOML). Defaults to the bundled TextWorld logic.
    #[arg(long, global = true)]
    logic: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate chains from a state.
    Chain {
        /// State file: one proposition per line.
        #[arg(long)]
        state: PathBuf,

        /// Chaining config (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many chains.
        #[arg(long, default_value = "20")]
        max_chains: usize,

        /// Print chains as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Sample one quest: the longest of the first `nb_retry` chains.
    Sample {
        /// State file: one proposition per line.
        #[arg(long)]
        state: PathBuf,

        /// Chaining config (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the quest as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the rules and constraints of the logic.
    Rules,
}

fn load_logic(path: Option<&Path>) -> Result<Arc<Logic>> {
    let logic = match path {
        Some(path) => Logic::load(path)?,
        None => Logic::builtin().inspect_err(|err| {
            tracing::warn!(error = %err, "bundled logic failed to parse");
        })?,
    };
    Ok(Arc::new(logic))
}

fn load_config(path: Option<&Path>) -> Result<ChainingConfig> {
    match path {
        Some(path) => Ok(ChainingConfig::load(path)?),
        None => Ok(ChainingConfig::default()),
    }
}

fn print_chain(chain: &Chain) {
    println!("{chain}");
    for (id, actions) in chain.subquests() {
        println!("  subquest {id}: {} action(s)", actions.len());
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let logic = load_logic(cli.logic.as_deref())?;

    match cli.command {
        Commands::Chain {
            state,
            config,
            max_chains,
            json,
        } => {
            let state = config::read_state_file(&state, logic.types().clone())?;
            let options = load_config(config.as_deref())?.to_options(logic)?;
            let chains: Vec<Chain> = chaining::chain(state, &options)?.take(max_chains).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&chains).into_diagnostic()?);
            } else {
                println!("Found {} chain(s):", chains.len());
                for chain in &chains {
                    print_chain(chain);
                }
            }
        }

        Commands::Sample {
            state,
            config,
            json,
        } => {
            let state = config::read_state_file(&state, logic.types().clone())?;
            let config = load_config(config.as_deref())?;
            let options = config.to_options(logic)?;
            let quest = chaining::sample_quest(state, &options, config.nb_retry)?;
            match (quest, json) {
                (Some(quest), true) => {
                    println!("{}", serde_json::to_string_pretty(&quest).into_diagnostic()?);
                }
                (Some(quest), false) => print_chain(&quest),
                (None, true) => println!("null"),
                (None, false) => println!("No quest found."),
            }
        }

        Commands::Rules => {
            println!("Rules ({}):", logic.rules().len());
            for rule in logic.rules() {
                match logic.reverse_of(&rule.name) {
                    Some(reverse) => println!("  {rule}  [reverse: {reverse}]"),
                    None => println!("  {rule}"),
                }
            }
            println!("Constraints ({}):", logic.constraints().len());
            for constraint in logic.constraints() {
                println!("  {constraint}");
            }
        }
    }

    Ok(())
}
