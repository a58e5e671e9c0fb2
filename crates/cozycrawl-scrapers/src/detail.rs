//! Detail-page field extraction, shared by the feed pipeline (reqwest-fetched
//! HTML) and the browser pipeline (rendered DOM captured from a tab).

use crate::normalize::split_full_address;
use cozycrawl_core::{Category, Contact, CrawlError, Listing, ParcelLookup, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub(crate) fn sel(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::Scraping(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSection {
    Agent,
    Office,
}

impl ContactSection {
    fn block_selector(&self) -> &'static str {
        match self {
            ContactSection::Agent => "div.listing-information__agent",
            ContactSection::Office => "div.listing-information__office",
        }
    }

    fn item_selector(&self) -> &'static str {
        match self {
            ContactSection::Agent => "div.listing-information__agent ul li",
            ContactSection::Office => "div.listing-information__office ul li",
        }
    }
}

/// Parse the labeled contact block for the given section. `None` means the
/// block is not on the page at all; an empty Contact means the block exists
/// but carried no recognized line items.
pub fn extract_contact(html: &str, section: ContactSection) -> Result<Option<Contact>> {
    let document = Html::parse_document(html);

    if document.select(&sel(section.block_selector())?).next().is_none() {
        return Ok(None);
    }

    let mut contact = Contact::default();
    for item in document.select(&sel(section.item_selector())?) {
        let text = item.text().collect::<String>();
        let text = text.trim().trim_start_matches(['•', ' ']);

        let Some((label, value)) = text.split_once(':') else {
            continue;
        };

        match label.trim().to_lowercase().as_str() {
            "name" => contact.name = value.trim().to_string(),
            "email" => contact.email = value.trim().to_string(),
            "phone" => contact.phone = value.trim().to_string(),
            _ => {}
        }
    }

    Ok(Some(contact))
}

/// Locate the parcel number on a detail page. Two layouts are recognized: the
/// "Details"-titled block (`span.item-title` followed by a sibling list) and
/// the "other properties" sections of the rendered page.
pub fn extract_parcel(html: &str) -> Result<ParcelLookup> {
    let document = Html::parse_document(html);

    for title in document.select(&sel("span.item-title")?) {
        let text = title.text().collect::<String>();
        if text.trim() != "Details" {
            continue;
        }

        let sibling_list = title
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "ul");

        if let Some(list) = sibling_list {
            for item in list.select(&sel("li")?) {
                let text = item.text().collect::<String>();
                if let Some((_, number)) = text.split_once("Parcel Number:") {
                    return Ok(ParcelLookup::Found(number.trim().to_string()));
                }
            }
        }
    }

    for item in document.select(&sel("section.other-property li")?) {
        let text = item.text().collect::<String>();
        if let Some((_, number)) = text.split_once("Parcel Number:") {
            return Ok(ParcelLookup::Found(number.trim().to_string()));
        }
    }

    Ok(ParcelLookup::Absent)
}

fn parse_number(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.is_empty() {
        None
    } else {
        cleaned.parse().ok()
    }
}

/// Extract a full canonical record from a rendered detail page. Used by the
/// browser pipeline, which has no feed record to normalize from.
pub fn extract_listing(html: &str, link: Url, category: Category) -> Result<Listing> {
    let document = Html::parse_document(html);
    let mut listing = Listing::new(link, category);

    if let Some(address) = document
        .select(&sel("article.summary p.summary__address")?)
        .next()
    {
        let full = address.text().collect::<String>();
        let (street, zip) = split_full_address(full.trim())?;
        listing.street = street;
        listing.zip = zip;
    }

    if let Some(price) = document
        .select(&sel("article.summary p.summary__price.total-price")?)
        .next()
    {
        let text = price.text().collect::<String>();
        listing.price = parse_number(&text).unwrap_or(0);
    }

    let span_sel = sel("span")?;
    for item in document.select(&sel(
        "article.summary ul.summary__properties li.summary__property",
    )?) {
        let spans: Vec<String> = item
            .select(&span_sel)
            .map(|s| s.text().collect::<String>().trim().to_string())
            .collect();
        if spans.len() < 2 {
            continue;
        }

        let value = spans[0].replace(',', "");
        let Ok(number) = value.parse::<i64>() else {
            continue;
        };
        match spans[1].as_str() {
            "Beds" => listing.beds = number.max(0),
            "Baths" => listing.baths = number.max(0),
            "sqft" => listing.sf1 = number.max(0),
            "sqft lot" => listing.sf2 = number.max(0),
            _ => {}
        }
    }

    let label_sel = sel("div.highlights__property-label")?;
    let value_sel = sel("div.highlights__property-value")?;
    for property in document.select(&sel("div.highlights__properties div.highlights__property")?) {
        let label = property
            .select(&label_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let value = property
            .select(&value_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        match label.as_str() {
            "Year built" => {
                if let Ok(year) = value.parse::<i64>() {
                    if (1000..=9999).contains(&year) {
                        listing.year = year;
                    }
                }
            }
            "Home Type" => listing.property_and_building_type = value,
            _ => {}
        }
    }

    listing.agent = extract_contact(html, ContactSection::Agent)?.unwrap_or_default();
    listing.office = extract_contact(html, ContactSection::Office)?.unwrap_or_default();
    listing.parcel_number = extract_parcel(html)?.into_field();

    Ok(listing)
}
