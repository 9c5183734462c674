mod commands;

use clap::{Parser, Subcommand};
use commands::*;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "elif_encrypt=info";

#[derive(Parser)]
#[command(name = "elif-encrypt")]
#[command(about = "Inspect how elif-encrypt wires field encryption into the ORM")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve configuration and versions to a wiring bundle (dry run)
    Resolve {
        /// YAML configuration files, later files override earlier ones
        #[arg(long = "config", required = true)]
        config: Vec<String>,

        /// Host framework version
        #[arg(long)]
        framework: String,

        /// Language runtime version
        #[arg(long)]
        runtime: String,

        /// Mapping library version
        #[arg(long)]
        mapping: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the encryptor alias table
    Aliases {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the compatibility decision table
    Table,
}

fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(Layer::new().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    match cli.command {
        Commands::Resolve {
            config,
            framework,
            runtime,
            mapping,
            json,
        } => {
            resolve::run(&config, &framework, &runtime, &mapping, json)?;
        }
        Commands::Aliases { json } => {
            aliases::run(json)?;
        }
        Commands::Table => {
            table::run();
        }
    }

    Ok(())
}
