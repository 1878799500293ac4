mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_REGION: &str = "US";

#[derive(Debug, Parser)]
#[command(name = "storescout-cli")]
#[command(about = "Search, resolve and match storefront products from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search one regional storefront and print ranked products as JSON
    Search {
        query: String,
        /// Region code (e.g., BE)
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,
        /// Include add-ons instead of only base products
        #[arg(long)]
        all: bool,
        /// Keep storefront order instead of sorting by relevance
        #[arg(long)]
        no_sort: bool,
        /// Fill missing listing fields from product detail pages
        #[arg(long)]
        enrich: bool,
    },
    /// Resolve a product id to a product record
    Lookup {
        product_id: String,
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,
    },
    /// Find the same product in other regions
    Match {
        product_id: String,
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,
        /// Comma-separated target regions; defaults to every other region
        #[arg(long, value_delimiter = ',')]
        targets: Vec<String>,
    },
    /// Print the current exchange-rate table
    Rates {
        /// Refresh from the rate source before printing
        #[arg(long)]
        refresh: bool,
    },
    /// List supported regions
    Regions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = storescout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let service = commands::build_service(&config)?;
    match cli.command {
        Commands::Search {
            query,
            region,
            all,
            no_sort,
            enrich,
        } => {
            let options = commands::search_options(all, no_sort, enrich);
            commands::run_search(&service, &query, &region, options).await
        }
        Commands::Lookup { product_id, region } => {
            commands::run_lookup(&service, &product_id, &region).await
        }
        Commands::Match {
            product_id,
            region,
            targets,
        } => commands::run_match(&service, &product_id, &region, &targets).await,
        Commands::Rates { refresh } => commands::run_rates(&service, refresh).await,
        Commands::Regions => commands::run_regions(),
    }
}

#[cfg(test)]
mod tests;
