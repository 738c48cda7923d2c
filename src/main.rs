mod config;
mod error;
mod gemini;
mod n8n;
mod preview;
mod relay;
mod schema;
mod server;
mod validator;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use config::Config;
use validator::Validator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP relay (default)
    Serve {
        /// Port to listen on, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,

        /// Gemini model name, overrides GEMINI_MODEL
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Validate a local workflow document (JSON or YAML)
    Validate {
        /// Path to the workflow file
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Also check the target nodes inside each connection
        #[arg(long)]
        strict: bool,
    },
    /// Print the sample workflow document
    Preview,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve { port: None, model: None }) {
        Command::Serve { port, model } => {
            let mut config = Config::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(model) = model {
                config.gemini_model = model;
            }
            server::run_server(config).await
        }
        Command::Validate { file, strict } => validate_file(&file, strict),
        Command::Preview => {
            println!("{}", serde_json::to_string_pretty(&preview::sample_workflow())?);
            Ok(())
        }
    }
}

fn validate_file(path: &Path, strict: bool) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read file `{:?}`", path))?;

    let mut workflow = parse_document(path, &content)?;
    relay::apply_defaults(&mut workflow);

    let result = if strict {
        Validator::new().check_targets(true).validate(&workflow)
    } else {
        validator::validate(&workflow)
    };
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.valid {
        anyhow::bail!("Workflow `{}` is invalid", path.display());
    }
    Ok(())
}

fn parse_document(path: &Path, content: &str) -> Result<Value> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(content).context("Failed to parse YAML workflow")
    } else {
        serde_json::from_str(content).context("Failed to parse JSON workflow")
    }
}
