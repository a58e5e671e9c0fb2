use crate::{Listing, Result};
use rust_xlsxwriter::Workbook;
use std::path::Path;

const HEADERS: [&str; 19] = [
    "link",
    "category",
    "street",
    "zip",
    "price",
    "beds",
    "baths",
    "sf1",
    "sf2",
    "year",
    "property_and_building_type",
    "agent_name",
    "agent_email",
    "agent_phone",
    "office_name",
    "office_email",
    "office_phone",
    "parcel_number",
    "scraped_at",
];

fn text_fields(listing: &Listing) -> [&str; 11] {
    [
        listing.link.as_str(),
        listing.category.as_str(),
        &listing.street,
        &listing.zip,
        &listing.property_and_building_type,
        &listing.agent.name,
        &listing.agent.email,
        &listing.agent.phone,
        &listing.office.name,
        &listing.office.email,
        &listing.office.phone,
    ]
}

/// Dump the given rows verbatim into a CSV file.
pub fn export_csv(listings: &[Listing], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(HEADERS)?;

    for listing in listings {
        writer.write_record([
            listing.link.as_str(),
            listing.category.as_str(),
            &listing.street,
            &listing.zip,
            &listing.price.to_string(),
            &listing.beds.to_string(),
            &listing.baths.to_string(),
            &listing.sf1.to_string(),
            &listing.sf2.to_string(),
            &listing.year.to_string(),
            &listing.property_and_building_type,
            &listing.agent.name,
            &listing.agent.email,
            &listing.agent.phone,
            &listing.office.name,
            &listing.office.email,
            &listing.office.phone,
            &listing.parcel_number,
            &listing.scraped_at.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Dump the given rows verbatim into an xlsx workbook with one sheet.
pub fn export_xlsx(listings: &[Listing], path: impl AsRef<Path>) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, listing) in listings.iter().enumerate() {
        let row = (i + 1) as u32;
        let [link, category, street, zip, ptype, an, ae, ap, on, oe, op] = text_fields(listing);

        worksheet.write_string(row, 0, link)?;
        worksheet.write_string(row, 1, category)?;
        worksheet.write_string(row, 2, street)?;
        worksheet.write_string(row, 3, zip)?;
        worksheet.write_number(row, 4, listing.price as f64)?;
        worksheet.write_number(row, 5, listing.beds as f64)?;
        worksheet.write_number(row, 6, listing.baths as f64)?;
        worksheet.write_number(row, 7, listing.sf1 as f64)?;
        worksheet.write_number(row, 8, listing.sf2 as f64)?;
        worksheet.write_number(row, 9, listing.year as f64)?;
        worksheet.write_string(row, 10, ptype)?;
        worksheet.write_string(row, 11, an)?;
        worksheet.write_string(row, 12, ae)?;
        worksheet.write_string(row, 13, ap)?;
        worksheet.write_string(row, 14, on)?;
        worksheet.write_string(row, 15, oe)?;
        worksheet.write_string(row, 16, op)?;
        worksheet.write_string(row, 17, &listing.parcel_number)?;
        worksheet.write_string(row, 18, &listing.scraped_at.to_rfc3339())?;
    }

    workbook.save(path.as_ref())?;
    Ok(())
}
