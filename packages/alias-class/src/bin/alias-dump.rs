//! Alias classification dump
//!
//! Runs alias analysis on a JSON-encoded module and prints, per function,
//! the alias sets, assign sets, NADS set and per-statement annotations.
//!
//! # Usage
//!
//! ```bash
//! # Analyze with the balanced preset
//! cargo run --bin alias-dump -- analyze --module module.json
//!
//! # Callee summaries and a YAML configuration
//! cargo run --bin alias-dump -- analyze -m module.json -s summaries.json -c alias.yaml
//!
//! # Print a configuration to start from
//! cargo run --bin alias-dump -- config --preset thorough
//! ```

use alias_class::config::{AliasSettings, Preset};
use alias_class::shared::models::Module;
use alias_class::{AliasAnalyzer, SummaryTable};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "alias-dump")]
#[command(about = "Alias classification for a typed tree IR", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a module and print the report as JSON
    Analyze {
        /// Module in JSON form
        #[arg(short, long)]
        module: PathBuf,

        /// Callee side-effect summaries in JSON form
        #[arg(short, long)]
        summaries: Option<PathBuf>,

        /// YAML configuration (overrides --preset)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Preset: fast, balanced, thorough
        #[arg(short, long, default_value = "balanced")]
        preset: String,

        /// Only report this function
        #[arg(short, long)]
        function: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the YAML configuration of a preset
    Config {
        #[arg(short, long, default_value = "balanced")]
        preset: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            module,
            summaries,
            config,
            preset,
            function,
            pretty,
        } => analyze(module, summaries, config, &preset, function, pretty)?,
        Commands::Config { preset } => {
            let settings = AliasSettings::preset(Preset::from_str(&preset)?);
            print!("{}", settings.to_yaml()?);
        }
    }
    Ok(())
}

fn analyze(
    module_path: PathBuf,
    summaries: Option<PathBuf>,
    config: Option<PathBuf>,
    preset: &str,
    function: Option<String>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match config {
        Some(path) => AliasSettings::from_yaml(path)?,
        None => AliasSettings::preset(Preset::from_str(preset)?),
    };
    let mut module: Module = serde_json::from_str(&std::fs::read_to_string(&module_path)?)?;
    let oracle: SummaryTable = match summaries {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => SummaryTable::new(),
    };

    let analyzer = AliasAnalyzer::from_settings(&settings).with_oracle(oracle);
    let results = analyzer.analyze_module(&mut module)?;
    let reports: Vec<_> = results
        .iter()
        .filter(|r| function.as_deref().map_or(true, |f| r.function_name() == f))
        .map(|r| r.report())
        .collect();

    let json = if pretty {
        serde_json::to_string_pretty(&reports)?
    } else {
        serde_json::to_string(&reports)?
    };
    println!("{}", json);
    Ok(())
}
