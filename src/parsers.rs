use std::sync::OnceLock;

use regex::Regex;

use crate::models::StockState;

/// Tokens meaning shipping is free or already included in the listed price.
const FREE_SHIPPING_KEYWORDS: &[&str] = &["무료", "포함", "무배", "free", "included"];

/// Currency unit marker required for a shipping amount to count as parsed.
const CURRENCY_MARKER: &str = "원";

const OUT_OF_STOCK_KEYWORDS: &[&str] = &["품절", "sold out", "out of stock", "재고없음", "일시품절"];
const IN_STOCK_KEYWORDS: &[&str] = &["구매", "재고", "있음", "in stock", "available"];

fn shipping_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\d,]+)\s*원").unwrap())
}

/// Parse a price by stripping every non-digit character. `None` when no
/// digits remain.
pub fn parse_price(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parse a shipping-cost cell. Free/included keywords short-circuit to 0 even
/// when digits are present. Otherwise the currency marker must appear and the
/// digits run right before it is taken; a missing marker or unparseable run
/// is a parse failure, not a zero.
pub fn parse_shipping(text: &str) -> Option<i64> {
    let stripped = text.trim();
    if stripped.is_empty() {
        return None;
    }
    let lowered = stripped.to_lowercase();
    if FREE_SHIPPING_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return Some(0);
    }
    if !stripped.contains(CURRENCY_MARKER) {
        return None;
    }
    let captures = shipping_amount_re().captures(stripped)?;
    let number = captures[1].replace(',', "");
    number.parse().ok()
}

/// Derive stock state from the parsed price and the raw stock-status text.
/// No price means unavailable regardless of what the page says. Unavailable
/// keywords win over available keywords when both appear.
pub fn determine_stock(price: Option<i64>, stock_text: Option<&str>) -> StockState {
    if price.is_none() {
        return StockState::OutOfStock;
    }
    if let Some(text) = stock_text {
        let lowered = text.to_lowercase();
        if OUT_OF_STOCK_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return StockState::OutOfStock;
        }
        if IN_STOCK_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return StockState::InStock;
        }
    }
    StockState::InStock
}
