//! mln-bridge CLI: run Tuffy learning and inference over a problem file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use mln_bridge::bridge::{BridgeConfig, TuffyBridge};
use mln_bridge::model::Problem;
use mln_bridge::runtime::DEFAULT_ENGINE_TAG;

#[derive(Parser)]
#[command(name = "mln-bridge", version, about = "Markov Logic Network inference bridge (Tuffy in Docker)")]
struct Cli {
    /// Docker image tag for the engine; doubles as the container name.
    #[arg(long, global = true, default_value = DEFAULT_ENGINE_TAG)]
    engine_tag: String,

    /// Keep the staged working directory on disk after the run.
    #[arg(long, global = true)]
    retain_files: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn rule and prior weights from the observed data.
    Learn {
        /// Path to a JSON problem file.
        problem: PathBuf,

        /// Write the problem with learned weights back as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run inference and print per-relation results as JSON.
    Solve {
        /// Path to a JSON problem file.
        problem: PathBuf,

        /// Ask the engine for marginal probabilities instead of a MAP state.
        #[arg(long)]
        marginal: bool,
    },

    /// Print the generated program, evidence, and query files without
    /// running the engine.
    Program {
        /// Path to a JSON problem file.
        problem: PathBuf,
    },
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
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = BridgeConfig {
        engine_tag: cli.engine_tag,
        retain_files: cli.retain_files,
        ..Default::default()
    };

    match cli.command {
        Commands::Learn { problem, output } => {
            let problem = Problem::from_json_file(&problem)?;
            let mut bridge = TuffyBridge::with_docker(problem, config);
            bridge.learn()?;

            let learned = Problem {
                relations: bridge.relations().to_vec(),
                rules: bridge.rules().to_vec(),
            };
            match output {
                Some(path) => {
                    let json = serde_json::to_string_pretty(&learned).into_diagnostic()?;
                    std::fs::write(&path, json).into_diagnostic()?;
                    println!("Wrote learned problem to {}", path.display());
                }
                None => {
                    for (index, rule) in learned.rules.iter().enumerate() {
                        match rule.weight {
                            Some(weight) => println!("{index}: {weight:.6} {}", rule.text),
                            None => println!("{index}: (hard) {}", rule.text),
                        }
                    }
                }
            }
        }

        Commands::Solve { problem, marginal } => {
            let problem = Problem::from_json_file(&problem)?;
            let config = BridgeConfig { marginal, ..config };
            let bridge = TuffyBridge::with_docker(problem, config);
            let solution = bridge.solve()?;

            println!("{}", serde_json::to_string_pretty(&solution).into_diagnostic()?);
        }

        Commands::Program { problem } => {
            let problem = Problem::from_json_file(&problem)?;
            let bridge = TuffyBridge::with_docker(problem, config);
            let rendered = bridge.rendered()?;

            println!("# prog.mln\n{}", rendered.program);
            println!("# evidence.db\n{}", rendered.evidence);
            println!("# query.db\n{}", rendered.query);
        }
    }

    Ok(())
}
