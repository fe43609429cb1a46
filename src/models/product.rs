use serde::{Deserialize, Serialize};

use crate::parsers::parse_price;

/// One tracked item, read from the product sheet. `prev_price_raw` is the
/// previously recorded total (price + shipping) exactly as the sheet holds it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductEntry {
    pub id: String,
    pub name: String,
    pub prev_price_raw: String,
    pub prev_seller: String,
    pub url: String,
}

impl ProductEntry {
    /// Filler rows in the sheet carry no identifier, name, or URL.
    pub fn is_blank(&self) -> bool {
        self.id.is_empty() && self.name.is_empty() && self.url.is_empty()
    }

    pub fn prev_price(&self) -> Option<i64> {
        parse_price(&self.prev_price_raw)
    }
}
