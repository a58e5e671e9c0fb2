//! Contact and parcel enrichment. The sale feed embeds full contact objects,
//! which seed the cache; the rental feed only carries ids, resolved from the
//! cache or, on a miss, scraped from the listing's own detail page.

use crate::detail::{extract_contact, extract_parcel, ContactSection};
use crate::feed::FeedHome;
use crate::DetailFetcher;
use cozycrawl_core::{Contact, Database, Listing, ParcelLookup, Result};
use tracing::{debug, warn};
use url::Url;

pub struct Enricher<'a, D: DetailFetcher> {
    db: &'a Database,
    fetcher: &'a D,
}

impl<'a, D: DetailFetcher> Enricher<'a, D> {
    pub fn new(db: &'a Database, fetcher: &'a D) -> Self {
        Self { db, fetcher }
    }

    /// Fill `listing.agent` and `listing.office` from the feed record. At most
    /// one detail-page fetch happens per listing, shared by both lookups; a
    /// failed fetch degrades to empty contacts rather than failing the listing.
    pub async fn resolve_contacts(&self, home: &FeedHome, listing: &mut Listing) -> Result<()> {
        // Detail page body, fetched lazily on the first cache miss.
        let mut page: Option<String> = None;

        if let Some(agent) = &home.agent {
            let contact = Contact::new(&agent.agent_name, &agent.agent_email, &agent.agent_phone);
            self.db.cache_agent(&agent.agent_id, &contact).await?;
            listing.agent = contact;
        } else if let Some(agent_id) = &home.agent_id {
            listing.agent = match self.db.find_agent(agent_id).await? {
                Some(contact) => contact,
                None => {
                    let scraped = self
                        .scrape_contact(&listing.link, ContactSection::Agent, &mut page)
                        .await?;
                    if let Some(contact) = &scraped {
                        self.db.cache_agent(agent_id, contact).await?;
                    }
                    scraped.unwrap_or_default()
                }
            };
        }

        if let Some(office) = &home.agent_office {
            let contact = Contact::new(
                &office.office_name,
                &office.office_email,
                &office.office_phone,
            );
            self.db.cache_office(&office.office_id, &contact).await?;
            listing.office = contact;
        } else if let Some(office_id) = &home.office_id {
            listing.office = match self.db.find_office(office_id).await? {
                Some(contact) => contact,
                None => {
                    let scraped = self
                        .scrape_contact(&listing.link, ContactSection::Office, &mut page)
                        .await?;
                    if let Some(contact) = &scraped {
                        self.db.cache_office(office_id, contact).await?;
                    }
                    scraped.unwrap_or_default()
                }
            };
        }

        Ok(())
    }

    async fn scrape_contact(
        &self,
        link: &Url,
        section: ContactSection,
        page: &mut Option<String>,
    ) -> Result<Option<Contact>> {
        let Some(html) = self.detail_page(link, page).await else {
            return Ok(None);
        };
        extract_contact(html, section)
    }

    async fn detail_page<'b>(&self, link: &Url, slot: &'b mut Option<String>) -> Option<&'b String> {
        if slot.is_none() {
            match self.fetcher.fetch_detail(link).await {
                Ok(body) => *slot = Some(body),
                Err(e) => {
                    warn!("Could not fetch detail page {} for contacts: {}", link, e);
                    return None;
                }
            }
        }
        slot.as_ref()
    }

    /// Scrape the parcel number from the listing's detail page. Fetch and
    /// parse problems become `Failed`, never an error: a parcel is always
    /// optional data.
    pub async fn parcel_number(&self, link: &Url) -> ParcelLookup {
        debug!("Looking up parcel number for {}", link);

        let html = match self.fetcher.fetch_detail(link).await {
            Ok(body) => body,
            Err(e) => return ParcelLookup::Failed(e.to_string()),
        };

        match extract_parcel(&html) {
            Ok(lookup) => lookup,
            Err(e) => ParcelLookup::Failed(e.to_string()),
        }
    }
}
