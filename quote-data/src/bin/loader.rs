use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use quote_data::{CatalogLoader, InventoryLoader};
use quote_store_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Load the service catalog and stock levels into the quote database.
///
/// The catalog is a TOML file of services with their options and tiers.
/// The inventory CSV has the columns:
/// sku, name, unit, qty_on_hand, reorder_point, reorder_qty, cost_per_unit, supplier
#[derive(Parser, Debug)]
#[command(name = "quote-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// SQLite database URL (e.g., sqlite:quotes.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:quotes.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// TOML file with services, options and tiers
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// CSV file with inventory items (upserted by SKU)
    #[arg(short, long)]
    inventory: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    if args.catalog.is_none() && args.inventory.is_none() && !args.migrate {
        bail!("nothing to do: pass --migrate, --catalog or --inventory");
    }

    let repo = SqliteRepository::new(&args.database).await?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations().await?;
        println!("Migrations complete.");
    }

    if let Some(path) = &args.catalog {
        println!("Loading catalog from: {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        let catalog = CatalogLoader::parse(&text)
            .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
        let summary = CatalogLoader::load(&repo, &catalog)
            .await
            .context("Failed to load catalog into database")?;
        println!(
            "Created {} services ({} options, {} tiers); {} already present.",
            summary.services, summary.options, summary.tiers, summary.skipped_services
        );
    }

    if let Some(path) = &args.inventory {
        println!("Loading inventory from: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = InventoryLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        println!("Parsed {} records from CSV", records.len());
        let written = InventoryLoader::load(&repo, &records)
            .await
            .context("Failed to load inventory into database")?;
        println!("Successfully loaded {} inventory items.", written);
    }

    Ok(())
}
