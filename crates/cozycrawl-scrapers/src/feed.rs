use crate::{DetailFetcher, FeedSource};
use async_trait::async_trait;
use cozycrawl_core::{Category, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const BASE_URL: &str = "https://cozying.ai";

/// Fixed feed page size; the feed signals the end of pagination with an empty
/// `homes` array, not a count.
pub const PAGE_SIZE: u32 = 200;

/// One page of the listing feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedPage {
    pub homes: Vec<FeedHome>,
}

/// Raw feed record. The sale feed embeds full `agent`/`agentOffice` objects;
/// the rental feed only carries bare `agentId`/`officeId` references.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedHome {
    pub url: String,
    pub full_address: String,
    pub price: Option<f64>,
    pub beds: Option<f64>,
    pub baths: Option<f64>,
    pub size: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub year_built: Option<i64>,
    pub cozying_property_type: Option<String>,
    pub property_type: Option<String>,
    pub agent: Option<FeedAgent>,
    pub agent_office: Option<FeedOffice>,
    pub agent_id: Option<String>,
    pub office_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedAgent {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_email: String,
    pub agent_phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedOffice {
    pub office_id: String,
    pub office_name: String,
    pub office_email: String,
    pub office_phone: String,
}

/// HTTP client for the listing feed and for detail pages.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    base: String,
}

impl FeedClient {
    pub fn new() -> Self {
        Self::with_base(BASE_URL)
    }

    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into(),
        }
    }

    fn feed_url(&self, category: Category, page: u32) -> String {
        format!(
            "{}/cozying-api/v1/home/list?currentPage={}&homesPerGroup={}&propertyStatus[]=active&sorted=newest&minPrice=0&maxPrice=0&minBeds=0&minBaths=0&hasOpenHouses=false&hasVirtualTour=false&type={}",
            self.base, page, PAGE_SIZE, category
        )
    }
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_page(&self, category: Category, page: u32) -> Result<FeedPage> {
        let url = self.feed_url(category, page);
        debug!("Requesting feed page: {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let feed_page = response.json::<FeedPage>().await?;

        Ok(feed_page)
    }
}

#[async_trait]
impl DetailFetcher for FeedClient {
    async fn fetch_detail(&self, url: &Url) -> Result<String> {
        debug!("Fetching detail page: {}", url);

        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        let body = response.text().await?;

        Ok(body)
    }
}
