use crate::feed::{FeedHome, BASE_URL};
use cozycrawl_core::{Category, CrawlError, Listing, Result};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;
use url::Url;

fn zip_pattern() -> Result<&'static Regex> {
    static ZIP: OnceLock<Regex> = OnceLock::new();
    if let Some(pattern) = ZIP.get() {
        return Ok(pattern);
    }

    let pattern = Regex::new(r"^\d{5}(?:-\d{4})?$")
        .map_err(|e| CrawlError::Scraping(e.to_string()))?;
    Ok(ZIP.get_or_init(|| pattern))
}

/// Split a full address on the first comma. The zip is the last whitespace
/// token of the remainder, accepted only when it has a numeric ZIP shape; a
/// trailing state abbreviation or similar yields an empty zip, not a bogus one.
pub fn split_full_address(full_address: &str) -> Result<(String, String)> {
    let Some((street, rest)) = full_address.split_once(',') else {
        return Ok((full_address.trim().to_string(), String::new()));
    };

    let street = street.trim().to_string();
    let candidate = rest.split_whitespace().last().unwrap_or("");

    if zip_pattern()?.is_match(candidate) {
        Ok((street, candidate.to_string()))
    } else {
        if !candidate.is_empty() {
            warn!(
                "Address {:?} ends in non-numeric token {:?}; leaving zip empty",
                full_address, candidate
            );
        }
        Ok((street, String::new()))
    }
}

fn non_negative(value: Option<f64>) -> i64 {
    (value.unwrap_or(0.0) as i64).max(0)
}

/// Map a raw feed record onto the canonical flat schema. Pure except for
/// data-quality warnings; contact and parcel fields are left at their
/// defaults for the enrichment stage.
pub fn normalize(home: &FeedHome, category: Category) -> Result<Listing> {
    if home.url.is_empty() {
        return Err(CrawlError::Feed("feed record without a detail url".to_string()));
    }

    let link = if home.url.starts_with("http") {
        Url::parse(&home.url)?
    } else {
        Url::parse(&format!("{}{}", BASE_URL, home.url))?
    };

    let (street, zip) = split_full_address(&home.full_address)?;

    let mut listing = Listing::new(link, category);
    listing.street = street;
    listing.zip = zip;
    listing.price = non_negative(home.price);
    listing.beds = non_negative(home.beds);
    listing.baths = non_negative(home.baths);
    listing.sf1 = non_negative(home.size);
    listing.sf2 = non_negative(home.lot_size_sqft);
    listing.year = match home.year_built {
        Some(year) if (1000..=9999).contains(&year) => year,
        _ => 0,
    };

    // The two feeds name the building-type field differently.
    let property_type = match category {
        Category::Sale => &home.cozying_property_type,
        Category::Rent => &home.property_type,
    };
    listing.property_and_building_type = property_type.clone().unwrap_or_default();

    Ok(listing)
}
