use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row};
use std::str::FromStr;
use url::Url;

mod db;
mod display;
mod export;
pub use db::Database;
pub use display::{create_listing_table, ListingTableRow};
pub use export::{export_csv, export_xlsx};

pub type Result<T> = std::result::Result<T, CrawlError>;

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Feed error: {0}")]
    Feed(String),
    #[error("Scraping error: {0}")]
    Scraping(String),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Listing category, matching the feed's `type` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Category {
    Sale,
    Rent,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sale => "sale",
            Category::Rent => "rent",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sale" | "sell" | "buy" => Ok(Category::Sale),
            "rent" | "rental" => Ok(Category::Rent),
            _ => Err(format!("Invalid category: {}. Valid options are: sale, rent", s)),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for Category {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Category {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        text.parse::<Category>().map_err(Into::into)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Category {
    fn encode_by_ref(
        &self,
        args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> sqlx::encode::IsNull {
        args.push(sqlx::sqlite::SqliteArgumentValue::Text(self.as_str().into()));
        sqlx::encode::IsNull::No
    }
}

/// Name/email/phone triple for an agent or office. Empty strings mean unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.phone.is_empty()
    }
}

/// Outcome of a parcel-number scrape. `Absent` means the page had no such
/// field; `Failed` means the page could not be fetched or parsed at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelLookup {
    Found(String),
    Absent,
    Failed(String),
}

impl ParcelLookup {
    /// Collapse into the persisted column value.
    pub fn into_field(self) -> String {
        match self {
            ParcelLookup::Found(number) => number,
            ParcelLookup::Absent | ParcelLookup::Failed(_) => String::new(),
        }
    }
}

/// Canonical flat listing record, keyed by `link`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub link: Url,
    pub category: Category,
    pub street: String,
    pub zip: String,
    pub price: i64,
    pub beds: i64,
    pub baths: i64,
    /// Living area, square feet.
    pub sf1: i64,
    /// Lot size, square feet.
    pub sf2: i64,
    pub year: i64,
    pub property_and_building_type: String,
    pub agent: Contact,
    pub office: Contact,
    pub parcel_number: String,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    pub fn new(link: Url, category: Category) -> Self {
        Self {
            link,
            category,
            street: String::new(),
            zip: String::new(),
            price: 0,
            beds: 0,
            baths: 0,
            sf1: 0,
            sf2: 0,
            year: 0,
            property_and_building_type: String::new(),
            agent: Contact::default(),
            office: Contact::default(),
            parcel_number: String::new(),
            scraped_at: Utc::now(),
        }
    }
}

impl<'r> FromRow<'r, sqlx::sqlite::SqliteRow> for Listing {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let link_str: String = row.try_get("link")?;
        let link = Url::from_str(&link_str).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Listing {
            link,
            category: row.try_get("category")?,
            street: row.try_get("street")?,
            zip: row.try_get("zip")?,
            price: row.try_get("price")?,
            beds: row.try_get("beds")?,
            baths: row.try_get("baths")?,
            sf1: row.try_get("sf1")?,
            sf2: row.try_get("sf2")?,
            year: row.try_get("year")?,
            property_and_building_type: row.try_get("property_and_building_type")?,
            agent: Contact {
                name: row.try_get("agent_name")?,
                email: row.try_get("agent_email")?,
                phone: row.try_get("agent_phone")?,
            },
            office: Contact {
                name: row.try_get("office_name")?,
                email: row.try_get("office_email")?,
                phone: row.try_get("office_phone")?,
            },
            parcel_number: row.try_get("parcel_number")?,
            scraped_at: row.try_get("scraped_at")?,
        })
    }
}
