use async_trait::async_trait;
use cozycrawl_core::{Category, Database, ParcelLookup, Result};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub mod browser;
pub mod detail;
pub mod enrich;
pub mod feed;
pub mod normalize;

pub use browser::BrowserCrawler;
pub use detail::{extract_contact, extract_listing, extract_parcel, ContactSection};
pub use enrich::Enricher;
pub use feed::{FeedClient, FeedHome, FeedPage, BASE_URL, PAGE_SIZE};
pub use normalize::normalize;

/// A paginated listing feed. Page numbering starts at 0; an empty page marks
/// the end.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(&self, category: Category, page: u32) -> Result<FeedPage>;
}

/// Fetches the HTML body of a listing's detail page.
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch_detail(&self, url: &Url) -> Result<String>;
}

/// Per-run knobs for the feed crawl.
#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    /// Visit every listing's detail page for its parcel number. Off by
    /// default: it costs one extra request per listing.
    pub scrape_parcel: bool,
    /// Attempts per feed page before the crawl gives up.
    pub max_page_attempts: u32,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            scrape_parcel: false,
            max_page_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages: u32,
    pub listings: u64,
    pub skipped: u64,
}

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Feed-driven crawl: paginate, normalize, enrich, store.
pub struct Crawler<S: FeedSource, D: DetailFetcher> {
    feed: S,
    fetcher: D,
    db: Database,
}

impl<S: FeedSource, D: DetailFetcher> Crawler<S, D> {
    pub fn new(feed: S, fetcher: D, db: Database) -> Self {
        Self { feed, fetcher, db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn crawl(&self, category: Category, options: CrawlOptions) -> Result<CrawlSummary> {
        let enricher = Enricher::new(&self.db, &self.fetcher);
        let mut summary = CrawlSummary::default();
        let mut page = 0;

        loop {
            let feed_page = self.fetch_page_with_retry(category, page, &options).await?;
            if feed_page.homes.is_empty() {
                break;
            }

            info!(
                "Feed page {} ({}): {} records",
                page,
                category,
                feed_page.homes.len()
            );
            summary.pages += 1;

            for home in &feed_page.homes {
                let mut listing = match normalize(home, category) {
                    Ok(listing) => listing,
                    Err(e) => {
                        warn!("Skipping malformed feed record: {}", e);
                        summary.skipped += 1;
                        continue;
                    }
                };

                enricher.resolve_contacts(home, &mut listing).await?;

                if options.scrape_parcel {
                    match enricher.parcel_number(&listing.link).await {
                        ParcelLookup::Found(number) => listing.parcel_number = number,
                        ParcelLookup::Absent => {}
                        ParcelLookup::Failed(reason) => {
                            warn!("Parcel lookup failed for {}: {}", listing.link, reason);
                        }
                    }
                }

                self.db.upsert_listing(&listing).await?;
                summary.listings += 1;
            }

            page += 1;
        }

        Ok(summary)
    }

    /// Retry a feed page with exponential backoff before giving up on the
    /// whole crawl.
    async fn fetch_page_with_retry(
        &self,
        category: Category,
        page: u32,
        options: &CrawlOptions,
    ) -> Result<FeedPage> {
        let attempts = options.max_page_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.feed.fetch_page(category, page).await {
                Ok(feed_page) => return Ok(feed_page),
                Err(e) if attempt < attempts => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                    warn!(
                        "Feed page {} attempt {}/{} failed ({}); retrying in {:?}",
                        page, attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
