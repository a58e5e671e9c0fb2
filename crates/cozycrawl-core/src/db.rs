use crate::{Category, Contact, Listing, Result};
use sqlx::sqlite::SqlitePool;
use std::fs;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Process-wide SQLite store: one `listings` table keyed by link, plus the
/// `agents`/`offices` contact caches.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // SQLite refuses to open a missing file over the sqlx URL scheme.
        if !db_path.exists() {
            fs::write(db_path, "")?;
        }

        let db_url = format!("sqlite:{}", db_path.to_string_lossy());
        let pool = SqlitePool::connect(&db_url).await?;
        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// In-memory store for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        debug!("Applying database schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                link TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                street TEXT NOT NULL,
                zip TEXT NOT NULL,
                price INTEGER NOT NULL,
                beds INTEGER NOT NULL,
                baths INTEGER NOT NULL,
                sf1 INTEGER NOT NULL,
                sf2 INTEGER NOT NULL,
                year INTEGER NOT NULL,
                property_and_building_type TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                agent_email TEXT NOT NULL,
                agent_phone TEXT NOT NULL,
                office_name TEXT NOT NULL,
                office_email TEXT NOT NULL,
                office_phone TEXT NOT NULL,
                parcel_number TEXT NOT NULL,
                scraped_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agents (
                agent_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS offices (
                office_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert-or-replace keyed by `link`: a re-crawled listing overwrites the
    /// prior row instead of duplicating it.
    pub async fn upsert_listing(&self, listing: &Listing) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO listings (
                link, category, street, zip, price, beds, baths, sf1, sf2, year,
                property_and_building_type,
                agent_name, agent_email, agent_phone,
                office_name, office_email, office_phone,
                parcel_number, scraped_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(listing.link.to_string())
        .bind(listing.category)
        .bind(&listing.street)
        .bind(&listing.zip)
        .bind(listing.price)
        .bind(listing.beds)
        .bind(listing.baths)
        .bind(listing.sf1)
        .bind(listing.sf2)
        .bind(listing.year)
        .bind(&listing.property_and_building_type)
        .bind(&listing.agent.name)
        .bind(&listing.agent.email)
        .bind(&listing.agent.phone)
        .bind(&listing.office.name)
        .bind(&listing.office.email)
        .bind(&listing.office.phone)
        .bind(&listing.parcel_number)
        .bind(listing.scraped_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_listing(&self, link: &Url) -> Result<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE link = ?")
            .bind(link.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(listing)
    }

    /// Full table contents, optionally filtered by category. `limit` of `None`
    /// returns everything.
    pub async fn list_listings(
        &self,
        category: Option<Category>,
        limit: Option<i64>,
    ) -> Result<Vec<Listing>> {
        let limit = limit.unwrap_or(-1);
        let listings = match category {
            Some(category) => {
                sqlx::query_as::<_, Listing>(
                    "SELECT * FROM listings WHERE category = ? ORDER BY link LIMIT ?",
                )
                .bind(category)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Listing>("SELECT * FROM listings ORDER BY link LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(listings)
    }

    pub async fn count_listings(&self, category: Option<Category>) -> Result<i64> {
        let count: i64 = match category {
            Some(category) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM listings WHERE category = ?")
                    .bind(category)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM listings")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }

    pub async fn find_agent(&self, agent_id: &str) -> Result<Option<Contact>> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT name, email, phone FROM agents WHERE agent_id = ?",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(name, email, phone)| Contact { name, email, phone }))
    }

    /// Insert-if-absent: a cached contact is never refreshed. An empty id is a
    /// valid (degenerate) key.
    pub async fn cache_agent(&self, agent_id: &str, contact: &Contact) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO agents (agent_id, name, email, phone) VALUES (?, ?, ?, ?)")
            .bind(agent_id)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn find_office(&self, office_id: &str) -> Result<Option<Contact>> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT name, email, phone FROM offices WHERE office_id = ?",
        )
        .bind(office_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(name, email, phone)| Contact { name, email, phone }))
    }

    pub async fn cache_office(&self, office_id: &str, contact: &Contact) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO offices (office_id, name, email, phone) VALUES (?, ?, ?, ?)")
            .bind(office_id)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
