use crate::extract::ExtractedState;
use crate::models::{ChangeRecord, StockState};

pub const LABEL_INCREASE: &str = "increase";
pub const LABEL_DECREASE: &str = "decrease";
pub const LABEL_SOLD_OUT: &str = "sold out";
pub const LABEL_STOCK_TRANSITION: &str = "in-stock → out-of-stock";

pub const MEMO_PRICE_PARSE_FAILED: &str = "price-parse-failed";
pub const MEMO_SHIPPING_PARSE_FAILED: &str = "shipping-parse-failed";
pub const MEMO_SEPARATOR: &str = "; ";

/// Outcome of comparing one extracted state against the recorded baseline.
/// Produced only when a record is warranted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub price_changed: bool,
    pub stock_changed: bool,
    pub change_type: String,
    pub diff: String,
    pub memo: String,
}

/// Deterministic classification of (previous price, current state, threshold).
/// Returns `None` when the entry is unchanged: price delta below threshold,
/// no stock transition, and a parseable current price.
pub fn classify(prev_price: Option<i64>, state: &ExtractedState, threshold: i64) -> Option<Verdict> {
    let current_total = ChangeRecord::current_total(state.price, state.shipping.value);

    let mut price_changed = false;
    let mut change_type = String::new();
    let mut diff = String::new();

    match (prev_price, current_total) {
        (Some(prev), Some(total)) => {
            let delta = total - prev;
            if delta.abs() >= threshold {
                price_changed = true;
                change_type = if delta > 0 { LABEL_INCREASE } else { LABEL_DECREASE }.to_string();
                diff = format!("{delta:+}");
            }
        }
        _ => {
            if state.price.is_none() {
                change_type = LABEL_SOLD_OUT.to_string();
            }
        }
    }

    let mut stock_changed = false;
    if prev_price.is_some() && state.stock == StockState::OutOfStock {
        stock_changed = true;
        change_type = if change_type.is_empty() {
            LABEL_STOCK_TRANSITION.to_string()
        } else {
            format!("{change_type}, {LABEL_STOCK_TRANSITION}")
        };
    }

    if !(price_changed || stock_changed || state.price.is_none()) {
        return None;
    }

    let mut memo_parts = Vec::new();
    if state.price.is_none() {
        memo_parts.push(MEMO_PRICE_PARSE_FAILED);
    }
    if state.shipping.value.is_none() {
        memo_parts.push(MEMO_SHIPPING_PARSE_FAILED);
    }
    let memo = memo_parts.join(MEMO_SEPARATOR);

    Some(Verdict { price_changed, stock_changed, change_type, diff, memo })
}
