//! Headless-browser crawl of the rendered search pages. Used when the JSON
//! feed is unavailable; walks the paginated results, opens every listing in
//! its own tab and extracts the full record from the rendered DOM.

use crate::detail::{self, sel};
use crate::CrawlSummary;
use cozycrawl_core::{Category, CrawlError, Database, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{debug, info, warn};
use url::Url;

const RESULT_LINK_SELECTOR: &str = "div.search-result__list a";
const SUMMARY_SELECTOR: &str = "article.summary";
const PAGINATION_NAV_SELECTOR: &str = "nav.pagination li.pagination__nav";

/// Detail pages render their summary block late; give them a generous wait.
const DETAIL_WAIT: Duration = Duration::from_secs(60);

/// The result list repaints in place after a pagination click.
const NEXT_PAGE_SETTLE: Duration = Duration::from_secs(6);

fn browser_err(e: impl std::fmt::Display) -> CrawlError {
    CrawlError::Browser(e.to_string())
}

pub struct BrowserCrawler {
    browser: Arc<Browser>,
    db: Database,
    concurrency: usize,
}

impl BrowserCrawler {
    pub fn new(db: Database, concurrency: usize) -> Result<Self> {
        info!("Launching headless Chrome");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .map_err(browser_err)?;
        let browser = Browser::new(options).map_err(browser_err)?;

        Ok(Self {
            browser: Arc::new(browser),
            db,
            concurrency,
        })
    }

    /// Walk the paginated search results starting at `start_url`, visiting
    /// each listing's detail page with at most `concurrency` tabs at a time.
    pub async fn run(&self, start_url: &Url, category: Category) -> Result<CrawlSummary> {
        let search_tab = self.open_search_tab(start_url).await?;
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut summary = CrawlSummary::default();

        loop {
            let html = self.capture_search_page(&search_tab).await?;
            let links = result_links(&html, start_url)?;
            summary.pages += 1;
            info!("Results page {}: {} listings", summary.pages, links.len());

            let mut handles = Vec::with_capacity(links.len());
            for link in links {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(browser_err)?;
                let browser = self.browser.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    let detail_link = link.clone();
                    let page = task::spawn_blocking(move || visit_detail(&browser, &detail_link))
                        .await
                        .map_err(browser_err)??;
                    detail::extract_listing(&page, link, category)
                }));
            }

            // Drain the whole page before touching pagination.
            for handle in handles {
                match handle.await.map_err(browser_err)? {
                    Ok(listing) => {
                        self.db.upsert_listing(&listing).await?;
                        summary.listings += 1;
                    }
                    Err(e) => {
                        warn!("Skipping listing: {}", e);
                        summary.skipped += 1;
                    }
                }
            }

            if next_page_disabled(&html)? {
                break;
            }
            self.click_next_page(&search_tab).await?;
        }

        Ok(summary)
    }

    async fn open_search_tab(&self, start_url: &Url) -> Result<Arc<Tab>> {
        let browser = self.browser.clone();
        let url = start_url.to_string();

        task::spawn_blocking(move || -> Result<Arc<Tab>> {
            let tab = browser.new_tab().map_err(browser_err)?;
            tab.navigate_to(&url).map_err(browser_err)?;
            tab.wait_until_navigated().map_err(browser_err)?;
            Ok(tab)
        })
        .await
        .map_err(browser_err)?
    }

    async fn capture_search_page(&self, tab: &Arc<Tab>) -> Result<String> {
        let tab = tab.clone();

        task::spawn_blocking(move || -> Result<String> {
            tab.wait_for_element_with_custom_timeout(RESULT_LINK_SELECTOR, DETAIL_WAIT)
                .map_err(browser_err)?;
            tab.get_content().map_err(browser_err)
        })
        .await
        .map_err(browser_err)?
    }

    async fn click_next_page(&self, tab: &Arc<Tab>) -> Result<()> {
        let tab = tab.clone();

        task::spawn_blocking(move || -> Result<()> {
            let navs = tab.find_elements(PAGINATION_NAV_SELECTOR).map_err(browser_err)?;
            // The forward arrow is always the last nav item.
            if let Some(next) = navs.last() {
                next.click().map_err(browser_err)?;
            }
            Ok(())
        })
        .await
        .map_err(browser_err)??;

        debug!("Clicked next page; waiting for the results to repaint");
        tokio::time::sleep(NEXT_PAGE_SETTLE).await;
        Ok(())
    }
}

/// Navigation and capture surface of one detail tab. The Chrome browser keeps
/// a handle to every open tab, so dropping an `Arc<Tab>` does not close its
/// target; the close must be explicit.
trait DetailTab {
    fn open(&self, url: &str) -> Result<()>;
    fn capture(&self) -> Result<String>;
    fn close_tab(&self) -> Result<()>;
}

impl DetailTab for Arc<Tab> {
    fn open(&self, url: &str) -> Result<()> {
        self.navigate_to(url).map_err(browser_err)?;
        self.wait_until_navigated().map_err(browser_err)?;
        self.wait_for_element_with_custom_timeout(SUMMARY_SELECTOR, DETAIL_WAIT)
            .map_err(browser_err)?;
        Ok(())
    }

    fn capture(&self) -> Result<String> {
        self.get_content().map_err(browser_err)
    }

    fn close_tab(&self) -> Result<()> {
        self.close(true).map(|_| ()).map_err(browser_err)
    }
}

fn visit_detail(browser: &Browser, link: &Url) -> Result<String> {
    debug!("Opening detail tab for {}", link);

    let tab = browser.new_tab().map_err(browser_err)?;
    capture_and_close(&tab, link)
}

/// Capture the rendered page, closing the tab whether or not the visit
/// succeeded. A close failure is logged, never allowed to mask the visit's
/// own outcome.
fn capture_and_close<T: DetailTab>(tab: &T, link: &Url) -> Result<String> {
    let page = tab.open(link.as_str()).and_then(|()| tab.capture());

    if let Err(e) = tab.close_tab() {
        warn!("Could not close detail tab for {}: {}", link, e);
    }

    page
}

/// Detail links found on a rendered results page, resolved against the search
/// URL. Anchors without an href are skipped.
pub(crate) fn result_links(html: &str, base: &Url) -> Result<Vec<Url>> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for anchor in document.select(&sel(RESULT_LINK_SELECTOR)?) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.is_empty() {
            continue;
        }

        let url = if href.starts_with("http") {
            Url::parse(href)?
        } else {
            base.join(href)?
        };
        links.push(url);
    }

    Ok(links)
}

/// The last pagination nav item is the forward arrow; it carries a
/// `link-disabled` class on the final page. A page with no pagination at all
/// is its own last page.
pub(crate) fn next_page_disabled(html: &str) -> Result<bool> {
    let document = Html::parse_document(html);
    let last = document.select(&sel(PAGINATION_NAV_SELECTOR)?).last();

    Ok(match last {
        Some(nav) => nav
            .value()
            .attr("class")
            .is_some_and(|classes| classes.contains("link-disabled")),
        None => true,
    })
}
