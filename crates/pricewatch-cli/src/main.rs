mod scrape;
mod track;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricewatch-cli")]
#[command(about = "Scrape marketplace listings and compare prices")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape a single product page and store the result
    Scrape {
        url: String,
        /// Print the extracted product without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Scrape every URL in the tracked products file
    Track {
        /// Only track the product with this name (case-insensitive)
        #[arg(long)]
        product: Option<String>,
        /// List the URLs that would be scraped and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// List stored offers whose title contains TITLE, cheapest first
    Compare { title: String },
    /// Print one stored offer as JSON
    Show { id: i64 },
    /// List recent tracking jobs, newest first
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Manage the tracked products file
    Products {
        #[command(subcommand)]
        command: ProductsCommands,
    },
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ProductsCommands {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        amazon: Option<String>,
        #[arg(long)]
        ebay: Option<String>,
        #[arg(long)]
        walmart: Option<String>,
        #[arg(long)]
        aliexpress: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Migrate,
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("pricewatch-cli: no command given, see --help");
        return Ok(());
    };

    let config = pricewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Scrape { url, dry_run } => scrape::run_scrape(&config, &url, dry_run).await,
        Commands::Track { product, dry_run } => {
            track::run_track(&config, product.as_deref(), dry_run).await
        }
        Commands::Compare { title } => {
            let pool = connect(&config).await?;
            scrape::run_compare(&pool, &title).await
        }
        Commands::Show { id } => {
            let pool = connect(&config).await?;
            scrape::run_show(&pool, id).await
        }
        Commands::Jobs { limit } => {
            let pool = connect(&config).await?;
            track::run_jobs(&pool, limit).await
        }
        Commands::Products { command } => match command {
            ProductsCommands::List => track::run_products_list(&config),
            ProductsCommands::Add {
                name,
                amazon,
                ebay,
                walmart,
                aliexpress,
            } => track::run_products_add(
                &config,
                track::entry_from_args(name, amazon, ebay, walmart, aliexpress),
            ),
        },
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Migrate => {
                    let applied = pricewatch_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
                DbCommands::Ping => {
                    pricewatch_db::health_check(&pool).await?;
                    println!("database ok");
                }
            }
            Ok(())
        }
    }
}

pub(crate) async fn connect(config: &pricewatch_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = pricewatch_db::connect_pool(
        &config.database_url,
        pricewatch_db::PoolConfig::from_app_config(config),
    )
    .await?;
    Ok(pool)
}
