use cozycrawl_core::{export_csv, export_xlsx, Category, Contact, Database, Listing};
use std::fs;
use tempfile::tempdir;
use url::Url;

fn listing(slug: &str, category: Category, price: i64) -> Listing {
    let mut listing = Listing::new(
        Url::parse(&format!("https://cozying.ai/home/{}", slug)).unwrap(),
        category,
    );
    listing.street = format!("{} Main St", price / 1_000);
    listing.zip = "90001".to_string();
    listing.price = price;
    listing.beds = 3;
    listing.baths = 2;
    listing.sf1 = 1_400;
    listing.sf2 = 5_000;
    listing.year = 1962;
    listing.property_and_building_type = "Single Family Residence".to_string();
    listing.agent = Contact::new("Jane Doe", "jane@example.com", "555-0100");
    listing.office = Contact::new("Acme Realty", "office@example.com", "555-0199");
    listing.parcel_number = "5551-002-031".to_string();
    listing
}

#[tokio::test]
async fn test_export_to_csv() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
    let export_path = temp_dir.path().join("listings.csv");

    db.upsert_listing(&listing("1", Category::Sale, 750_000))
        .await
        .unwrap();
    db.upsert_listing(&listing("2", Category::Rent, 2_400))
        .await
        .unwrap();

    let listings = db.list_listings(None, None).await.unwrap();
    export_csv(&listings, &export_path).unwrap();

    let content = fs::read_to_string(&export_path).unwrap();
    let mut lines = content.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("link,category,street,zip,price"));
    assert!(header.ends_with("parcel_number,scraped_at"));

    assert_eq!(lines.count(), 2);
    assert!(content.contains("https://cozying.ai/home/1"));
    assert!(content.contains("750000"));
    assert!(content.contains("Jane Doe"));
    assert!(content.contains("5551-002-031"));
}

#[tokio::test]
async fn test_export_csv_filtered_by_category() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
    let export_path = temp_dir.path().join("rentals.csv");

    db.upsert_listing(&listing("1", Category::Sale, 750_000))
        .await
        .unwrap();
    db.upsert_listing(&listing("2", Category::Rent, 2_400))
        .await
        .unwrap();

    let rentals = db.list_listings(Some(Category::Rent), None).await.unwrap();
    export_csv(&rentals, &export_path).unwrap();

    let content = fs::read_to_string(&export_path).unwrap();
    assert!(content.contains("https://cozying.ai/home/2"));
    assert!(!content.contains("https://cozying.ai/home/1"));
}

#[tokio::test]
async fn test_export_to_xlsx() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
    let export_path = temp_dir.path().join("homes-sale.xlsx");

    db.upsert_listing(&listing("1", Category::Sale, 750_000))
        .await
        .unwrap();

    let listings = db.list_listings(Some(Category::Sale), None).await.unwrap();
    export_xlsx(&listings, &export_path).unwrap();

    // xlsx is a zip container; checking the magic bytes is enough here.
    let bytes = fs::read(&export_path).unwrap();
    assert!(bytes.len() > 4);
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_export_empty_database() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();

    let csv_path = temp_dir.path().join("empty.csv");
    let xlsx_path = temp_dir.path().join("empty.xlsx");

    let listings = db.list_listings(None, None).await.unwrap();
    export_csv(&listings, &csv_path).unwrap();
    export_xlsx(&listings, &xlsx_path).unwrap();

    // Header row only.
    let content = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(xlsx_path.exists());
}
