use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use quote_cli::app::{self, WizardCommand};
use quote_cli::config::{AppConfig, ConfigOverrides};
use quote_cli::logging;
use quote_cli::utils::{parse_decimal, parse_optional_decimal};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Quote wizard and stock tools for a print and signage shop.
///
/// Settings are read from `quote.toml` (or `--config`); flags win over the
/// file and `RUST_LOG` wins over the configured log level.
#[derive(Debug, Parser)]
#[command(name = "quote", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend to use (`sqlite` or `memory`).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `quotes.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Tax rate as a fraction, e.g. `0.23`.
    #[arg(long, global = true, value_parser = parse_rate)]
    tax_rate: Option<Decimal>,

    /// Log level or EnvFilter directive.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Hide console log output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Price a subtotal (omit it, or pass `custom`, for custom pricing)
    Pricing { subtotal: Option<String> },
    /// Show stock levels
    Inventory {
        /// Only list items that need reordering
        #[arg(long)]
        reorder: bool,
    },
    /// Work on the quote draft
    Wizard {
        #[command(subcommand)]
        action: WizardCommand,
    },
}

fn parse_rate(s: &str) -> Result<Decimal, String> {
    parse_decimal(s).map_err(|e| e.to_string())
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(
        cli.config.as_deref(),
        ConfigOverrides {
            backend: cli.backend,
            database: cli.db,
            tax_rate: cli.tax_rate,
            log_level: cli.log_level,
            log_file: cli.log_file,
        },
    )?;

    let mut log_settings = logging::LogSettings::new(&config.log_level);
    log_settings.console = !cli.quiet;
    let mut file_error = None;
    if let Some(path) = &config.log_file {
        match logging::open_log_file(path) {
            Ok(file) => log_settings.file = Some(file),
            Err(error) => file_error = Some(error),
        }
    }
    logging::init_logging(log_settings)?;
    if let Some(error) = file_error {
        warn!(error = %format!("{error:#}"), "file logging disabled");
    }
    debug!(?config, "starting");

    let calculator = config.calculator();
    let output = match cli.command {
        Command::Pricing { subtotal } => {
            let subtotal = match subtotal {
                Some(raw) => parse_optional_decimal(&raw)?,
                None => None,
            };
            app::pricing_report(&calculator, subtotal)
        }
        Command::Inventory { reorder } => {
            let backend = app::open_backend(&config).await?;
            app::inventory_report(backend.api.as_ref(), reorder).await?
        }
        Command::Wizard { action } => {
            let backend = app::open_backend(&config).await?;
            app::run_wizard(&backend, calculator, action)
                .await
                .context("wizard command failed")?
        }
    };
    print!("{output}");
    Ok(())
}
