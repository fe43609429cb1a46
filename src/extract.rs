use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::models::StockState;
use crate::parsers::{determine_stock, parse_price, parse_shipping};
use crate::rules::Ruleset;

/// Shipping cell as seen on the page: the raw text (if any selector hit) and
/// the parsed cost. Text without a currency marker keeps `value` at `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingField {
    pub text: Option<String>,
    pub value: Option<i64>,
}

/// Field values produced by one fetch+parse cycle. Transient; owns plain
/// strings only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedState {
    pub price: Option<i64>,
    pub shipping: ShippingField,
    pub stock_text: Option<String>,
    pub stock: StockState,
}

impl ExtractedState {
    pub fn from_document(document: &Html, rule: &Ruleset) -> Self {
        let price = extract_price_with_coupon(document, &rule.coupon_css, &rule.price_css);
        let shipping = extract_shipping(document, &rule.ship_css);
        let stock_text = extract_text(document, &rule.stock_css);
        let stock = determine_stock(price, stock_text.as_deref());
        Self { price, shipping, stock_text, stock }
    }
}

/// First selector whose first match carries non-empty text wins. Invalid
/// selectors and empty-text matches are skipped, not returned.
pub fn extract_text(document: &Html, selectors: &[String]) -> Option<String> {
    for css in selectors {
        if css.trim().is_empty() {
            continue;
        }
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// A discounted/coupon price, when one parses, always supersedes the regular
/// listed price.
pub fn extract_price_with_coupon(
    document: &Html,
    coupon_selectors: &[String],
    price_selectors: &[String],
) -> Option<i64> {
    first_parsed_price(document, coupon_selectors)
        .or_else(|| first_parsed_price(document, price_selectors))
}

pub fn extract_shipping(document: &Html, selectors: &[String]) -> ShippingField {
    let text = extract_text(document, selectors);
    let value = text.as_deref().and_then(parse_shipping);
    ShippingField { text, value }
}

fn first_parsed_price(document: &Html, selectors: &[String]) -> Option<i64> {
    for css in selectors {
        if css.trim().is_empty() {
            continue;
        }
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<String>();
            if let Some(price) = parse_price(&text) {
                return Some(price);
            }
        }
    }
    None
}
