use std::fs::File;
use std::path::PathBuf;

use agro_data::{CropProfileLoader, PlanCatalogLoader, ReferenceDatasetLoader};
use agro_db_sqlite::SqliteRepository;
use anyhow::{Context, Result, bail};
use clap::Parser;

/// Load reference data into the database.
///
/// - crop profiles CSV: code,label,savings_pct,productivity_pct,net_margin_per_hectare
/// - plan catalog CSV: id,display_name,fixed_amount
/// - reference dataset JSON: { "<CROP>": { "costPerHectare", "revenuePerHectare", "costBreakdown" } }
#[derive(Parser, Debug)]
#[command(name = "agro-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Crop profiles CSV file
    #[arg(short, long)]
    crops: Option<PathBuf>,

    /// Plan catalog CSV file
    #[arg(short, long)]
    plans: Option<PathBuf>,

    /// Reference dataset JSON file
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// SQLite database path or URL
    #[arg(short, long, default_value = "agro.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

fn open(path: &PathBuf) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.crops.is_none() && args.plans.is_none() && args.reference.is_none() {
        bail!("Nothing to load: pass --crops, --plans and/or --reference");
    }

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    if let Some(path) = &args.crops {
        let records = CropProfileLoader::parse(open(path)?)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        let loaded = CropProfileLoader::load(&repo, &records)
            .await
            .context("Failed to load crop profiles into database")?;
        println!("Loaded {loaded} crop profiles from {}", path.display());
    }

    if let Some(path) = &args.plans {
        let records = PlanCatalogLoader::parse(open(path)?)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        let loaded = PlanCatalogLoader::load(&repo, &records)
            .await
            .context("Failed to load plans into database")?;
        println!("Loaded {loaded} plans from {}", path.display());
    }

    if let Some(path) = &args.reference {
        let dataset = ReferenceDatasetLoader::parse(open(path)?)
            .with_context(|| format!("Failed to parse JSON: {}", path.display()))?;
        let loaded = ReferenceDatasetLoader::load(&repo, &dataset)
            .await
            .context("Failed to load reference dataset into database")?;
        println!("Loaded {loaded} reference entries from {}", path.display());
    }

    Ok(())
}
