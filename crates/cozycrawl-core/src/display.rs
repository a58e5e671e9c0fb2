use tabled::settings::{object::Columns, Modify, Style, Width};
use tabled::{Table, Tabled};

#[derive(Tabled)]
pub struct ListingTableRow {
    #[tabled(rename = "Street")]
    pub street: String,
    #[tabled(rename = "Zip")]
    pub zip: String,
    #[tabled(rename = "Price", display_with = "display_right_12")]
    pub price: String,
    #[tabled(rename = "Bd", display_with = "display_right_3")]
    pub beds: String,
    #[tabled(rename = "Ba", display_with = "display_right_3")]
    pub baths: String,
    #[tabled(rename = "Type")]
    pub property_type: String,
    #[tabled(rename = "Agent")]
    pub agent: String,
}

fn display_right_12(s: &str) -> String {
    format!("{:>12}", s)
}

fn display_right_3(s: &str) -> String {
    format!("{:>3}", s)
}

impl ListingTableRow {
    pub fn from_listing(listing: &crate::Listing) -> Self {
        Self {
            street: listing.street.clone(),
            zip: listing.zip.clone(),
            price: format!("${}", listing.price),
            beds: listing.beds.to_string(),
            baths: listing.baths.to_string(),
            property_type: listing.property_and_building_type.clone(),
            agent: listing.agent.name.clone(),
        }
    }
}

pub fn create_listing_table(listings: &[crate::Listing]) -> String {
    let rows: Vec<ListingTableRow> = listings.iter().map(ListingTableRow::from_listing).collect();

    let mut table = Table::new(&rows);

    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(0)).with(Width::truncate(36)))
        .with(Modify::new(Columns::single(2)).with(Width::truncate(12)))
        .with(Modify::new(Columns::single(5)).with(Width::truncate(24)))
        .with(Modify::new(Columns::single(6)).with(Width::truncate(24)));

    table.to_string()
}
