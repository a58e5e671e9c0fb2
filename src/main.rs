use clap::{Parser, Subcommand};
use cozycrawl_core::{create_listing_table, export_csv, export_xlsx, Category, Database, Result};
use cozycrawl_scrapers::{BrowserCrawler, CrawlOptions, Crawler, FeedClient};
use std::path::PathBuf;
use tracing::{info, Level};
use url::Url;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the listing feed into the database
    #[command(about = "Crawl the listing feed into the database")]
    #[command(
        long_about = "Page through the cozying.ai listing feed, resolve agent and office contacts, and upsert every listing into the database. Optionally scrapes each listing's parcel number."
    )]
    Crawl(CrawlCommand),

    /// Crawl the rendered site with a headless browser
    #[command(about = "Crawl the rendered site with a headless browser")]
    #[command(
        long_about = "Walk the paginated search results in a headless Chrome session, extracting every listing from its rendered detail page. A fallback for when the JSON feed is unavailable."
    )]
    Browse(BrowseCommand),

    /// List stored listings
    #[command(about = "List stored listings")]
    List(ListCommand),

    /// Export stored listings to a spreadsheet
    #[command(about = "Export stored listings to a spreadsheet")]
    #[command(
        long_about = "Export stored listings to CSV or xlsx; the format follows the output file extension."
    )]
    Export(ExportCommand),
}

#[derive(Parser)]
struct CrawlCommand {
    /// Categories to crawl (-t, --category). Can be specified multiple times.
    #[arg(short = 't', long = "category", value_enum, num_args = 1.., value_delimiter = ',',
          default_values_t = [Category::Sale, Category::Rent])]
    categories: Vec<Category>,

    /// Also scrape each listing's parcel number (one extra request per listing)
    #[arg(long)]
    parcel: bool,

    /// Attempts per feed page before giving up (-a, --max-attempts)
    #[arg(short = 'a', long, default_value_t = 3)]
    max_attempts: u32,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "cozycrawl.db")]
    database: PathBuf,

    /// Directory for the per-category xlsx exports (-e, --export-dir)
    #[arg(short = 'e', long, default_value = ".")]
    export_dir: PathBuf,

    /// Skip the xlsx export after crawling
    #[arg(long)]
    no_export: bool,
}

#[derive(Parser)]
struct BrowseCommand {
    /// Search results page to start from (-u, --start-url)
    #[arg(short = 'u', long, default_value = "https://cozying.ai/los-angeles-ca/rent?page=1")]
    start_url: Url,

    /// Category to store the crawled listings under (-t, --category)
    #[arg(short = 't', long, value_enum, default_value_t = Category::Rent)]
    category: Category,

    /// Maximum detail tabs open at once (-c, --concurrency)
    #[arg(short = 'c', long, default_value_t = 10)]
    concurrency: usize,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "cozycrawl.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ListCommand {
    /// Category to filter by (-t, --category)
    #[arg(short = 't', long, value_enum)]
    category: Option<Category>,

    /// Maximum number of listings to display (-l, --limit)
    #[arg(short = 'l', long, default_value_t = 20)]
    limit: i64,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "cozycrawl.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ExportCommand {
    /// Output file path; .xlsx writes a workbook, anything else CSV (-o, --output)
    #[arg(short = 'o', long, default_value = "listings.csv")]
    output: PathBuf,

    /// Category to filter by (-t, --category)
    #[arg(short = 't', long, value_enum)]
    category: Option<Category>,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "cozycrawl.db")]
    database: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(cmd) => {
            let db = Database::new(&cmd.database).await?;
            let crawler = Crawler::new(FeedClient::new(), FeedClient::new(), db.clone());
            let options = CrawlOptions {
                scrape_parcel: cmd.parcel,
                max_page_attempts: cmd.max_attempts,
            };

            for category in cmd.categories {
                info!("Crawling {} listings", category);
                let summary = crawler.crawl(category, options).await?;
                info!(
                    "Crawled {} pages: {} listings stored, {} skipped",
                    summary.pages, summary.listings, summary.skipped
                );

                if !cmd.no_export {
                    let listings = db.list_listings(Some(category), None).await?;
                    let path = cmd.export_dir.join(format!("homes-{}.xlsx", category));
                    export_xlsx(&listings, &path)?;
                    info!("Wrote {} rows to {}", listings.len(), path.display());
                }
            }
        }
        Commands::Browse(cmd) => {
            let db = Database::new(&cmd.database).await?;
            let crawler = BrowserCrawler::new(db, cmd.concurrency)?;

            let summary = crawler.run(&cmd.start_url, cmd.category).await?;
            info!(
                "Browsed {} pages: {} listings stored, {} skipped",
                summary.pages, summary.listings, summary.skipped
            );
        }
        Commands::List(cmd) => {
            let db = Database::new(&cmd.database).await?;
            let listings = db.list_listings(cmd.category, Some(cmd.limit)).await?;

            println!("{}", create_listing_table(&listings));
            println!(
                "{} of {} listings",
                listings.len(),
                db.count_listings(cmd.category).await?
            );
        }
        Commands::Export(cmd) => {
            let db = Database::new(&cmd.database).await?;
            let listings = db.list_listings(cmd.category, None).await?;

            let is_xlsx = cmd
                .output
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
            if is_xlsx {
                export_xlsx(&listings, &cmd.output)?;
            } else {
                export_csv(&listings, &cmd.output)?;
            }

            info!("Exported {} listings to {}", listings.len(), cmd.output.display());
        }
    }

    Ok(())
}
