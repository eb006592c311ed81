pub mod detail;
pub mod html;
pub mod rows;

use crate::model::Category;
use rows::TableParse;

/// Listing page HTML → tables → per-row outcomes.
pub fn parse_listing(category: Category, html: &str) -> TableParse {
    let tables = html::listing_tables(html);
    rows::parse_tables(category, &tables)
}
