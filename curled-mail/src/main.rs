//! Send a configured template from the command line
//!
//! # Usage
//!
//! ```bash
//! # Render a template without sending it
//! curled-mail --config curled-mail.toml --template welcome --data data.json --dry-run
//!
//! # Send with data read from stdin
//! echo '{"name": "Ada", "email": "ada@example.com"}' | \
//!     curled-mail --config curled-mail.toml --template welcome --data -
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use curled_mail::config::{Config, LoggingConfig};
use curled_mail::{CurledMail, MemoryTransport, SendOutcome};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "curled-mail")]
#[command(about = "Send templated email", long_about = None)]
struct Cli {
    /// Configuration file (transport, logging and templates)
    #[arg(short, long, default_value = "curled-mail.toml")]
    config: PathBuf,

    /// Key of the template to send
    #[arg(short, long)]
    template: String,

    /// JSON data context: a file path, or `-` for stdin
    #[arg(short, long)]
    data: Option<String>,

    /// Render only and print the message as JSON
    #[arg(long)]
    dry_run: bool,

    /// Fail on placeholders missing from the data
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        Config::default()
    };

    init_logging(&config.logging)?;
    info!("Configuration loaded ({} templates)", config.templates.len());

    let data = read_data(cli.data.as_deref())?;

    if cli.dry_run {
        let mut mail = CurledMail::with_transport(MemoryTransport::new());
        mail.set_strict_mode(cli.strict);
        mail.add_templates(&config)?;

        let missing = mail.missing_variables(&cli.template, &data)?;
        if !missing.is_empty() {
            warn!(
                "Placeholders of '{}' not found in data: {}",
                cli.template,
                missing.join(", ")
            );
        }

        let message = mail.render(&cli.template, &data)?;
        println!("{}", serde_json::to_string_pretty(&message)?);
        return Ok(());
    }

    let mut mail = CurledMail::new(config.transport.clone())?;
    mail.set_strict_mode(cli.strict);
    mail.add_templates(&config)?;

    match mail.send(&cli.template, &data).await? {
        SendOutcome::Sent(receipt) => {
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        SendOutcome::Failed(e) => {
            error!("Delivery of '{}' failed: {}", cli.template, e);
            bail!("delivery failed: {}", e)
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => tracing::subscriber::set_global_default(builder.json().finish()),
        _ => tracing::subscriber::set_global_default(builder.pretty().finish()),
    }
    .context("Failed to set tracing subscriber")
}

fn read_data(source: Option<&str>) -> anyhow::Result<Value> {
    let raw = match source {
        None => return Ok(Value::Object(Default::default())),
        Some("-") => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read data from stdin")?;
            raw
        }
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read data file {}", path))?,
    };

    serde_json::from_str(&raw).context("Data is not valid JSON")
}
