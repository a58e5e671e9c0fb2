use cozycrawl_core::{Category, Database};
use cozycrawl_integration_tests::{rent_home, sale_home, CannedFeed, CannedFetcher, DETAIL_PAGE};
use cozycrawl_scrapers::{CrawlOptions, Crawler};
use std::sync::atomic::Ordering;
use tempfile::tempdir;
use url::Url;

#[tokio::test]
async fn test_feed_crawl_end_to_end() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();

    let feed = CannedFeed::new(vec![
        vec![sale_home("1", 750_000.0), sale_home("2", 820_000.0)],
        vec![sale_home("3", 1_100_000.0)],
    ]);
    let crawler = Crawler::new(feed, CannedFetcher::new(None), db.clone());

    let summary = crawler
        .crawl(Category::Sale, CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.listings, 3);
    assert_eq!(db.count_listings(Some(Category::Sale)).await.unwrap(), 3);

    let stored = db
        .get_listing(&Url::parse("https://cozying.ai/home/1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.street, "123 Main St");
    assert_eq!(stored.zip, "90001");
    assert_eq!(stored.price, 750_000);
    assert_eq!(stored.agent.name, "Jane Doe");
    assert_eq!(stored.office.name, "Acme Realty");
}

#[tokio::test]
async fn test_pagination_stops_at_first_empty_page() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();

    let feed = CannedFeed::new(vec![vec![sale_home("1", 750_000.0)]]);
    let requests = feed.request_counter();

    let summary = Crawler::new(feed, CannedFetcher::new(None), db.clone())
        .crawl(Category::Sale, CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.listings, 1);
    assert_eq!(db.count_listings(None).await.unwrap(), 1);
    // Page 0 carried the listing, page 1 came back empty; page 2 is never
    // requested.
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rent_crawl_reuses_sale_contact_cache() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();

    // Sale crawl seeds the agent/office caches from embedded contacts.
    let sale_feed = CannedFeed::new(vec![vec![sale_home("1", 750_000.0)]]);
    Crawler::new(sale_feed, CannedFetcher::new(None), db.clone())
        .crawl(Category::Sale, CrawlOptions::default())
        .await
        .unwrap();

    // Rent crawl sees only ids; it must not touch the detail pages.
    let rent_feed = CannedFeed::new(vec![vec![rent_home("2", "a-1", "o-1")]]);
    let fetcher = CannedFetcher::new(Some(DETAIL_PAGE));
    let fetches = fetcher.fetch_counter();
    Crawler::new(rent_feed, fetcher, db.clone())
        .crawl(Category::Rent, CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(fetches.load(Ordering::SeqCst), 0);

    let rental = db
        .get_listing(&Url::parse("https://cozying.ai/home/2").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rental.category, Category::Rent);
    assert_eq!(rental.agent.email, "jane@example.com");
    assert_eq!(rental.office.phone, "555-0199");
    assert_eq!(rental.property_and_building_type, "Apartment");
}

#[tokio::test]
async fn test_unknown_contact_scraped_from_detail_page() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();

    let feed = CannedFeed::new(vec![vec![rent_home("9", "a-77", "o-77")]]);
    let fetcher = CannedFetcher::new(Some(DETAIL_PAGE));
    let fetches = fetcher.fetch_counter();

    Crawler::new(feed, fetcher, db.clone())
        .crawl(Category::Rent, CrawlOptions::default())
        .await
        .unwrap();

    // One fetch covered both the agent and the office miss.
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    let cached = db.find_agent("a-77").await.unwrap().unwrap();
    assert_eq!(cached.name, "Jane Doe");
    assert!(db.find_office("o-77").await.unwrap().is_some());
}

#[tokio::test]
async fn test_recrawl_upserts_instead_of_duplicating() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();

    let feed = CannedFeed::new(vec![vec![sale_home("1", 750_000.0)]]);
    Crawler::new(feed, CannedFetcher::new(None), db.clone())
        .crawl(Category::Sale, CrawlOptions::default())
        .await
        .unwrap();

    let feed = CannedFeed::new(vec![vec![sale_home("1", 699_000.0)]]);
    Crawler::new(feed, CannedFetcher::new(None), db.clone())
        .crawl(Category::Sale, CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(db.count_listings(None).await.unwrap(), 1);
    let stored = db
        .get_listing(&Url::parse("https://cozying.ai/home/1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.price, 699_000);
}

#[tokio::test]
async fn test_parcel_numbers_stored_only_when_requested() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
    let link = Url::parse("https://cozying.ai/home/1").unwrap();

    let feed = CannedFeed::new(vec![vec![sale_home("1", 750_000.0)]]);
    Crawler::new(feed, CannedFetcher::new(Some(DETAIL_PAGE)), db.clone())
        .crawl(Category::Sale, CrawlOptions::default())
        .await
        .unwrap();
    let stored = db.get_listing(&link).await.unwrap().unwrap();
    assert_eq!(stored.parcel_number, "");

    let feed = CannedFeed::new(vec![vec![sale_home("1", 750_000.0)]]);
    let options = CrawlOptions {
        scrape_parcel: true,
        ..CrawlOptions::default()
    };
    Crawler::new(feed, CannedFetcher::new(Some(DETAIL_PAGE)), db.clone())
        .crawl(Category::Sale, options)
        .await
        .unwrap();
    let stored = db.get_listing(&link).await.unwrap().unwrap();
    assert_eq!(stored.parcel_number, "5551-002-031");
}

#[tokio::test]
async fn test_database_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let db = Database::new(&db_path).await.unwrap();
        let feed = CannedFeed::new(vec![vec![sale_home("1", 750_000.0)]]);
        Crawler::new(feed, CannedFetcher::new(None), db)
            .crawl(Category::Sale, CrawlOptions::default())
            .await
            .unwrap();
    }

    let reopened = Database::new(&db_path).await.unwrap();
    assert_eq!(reopened.count_listings(None).await.unwrap(), 1);
    assert!(reopened.find_agent("a-1").await.unwrap().is_some());
}
