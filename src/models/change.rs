use serde::{Deserialize, Serialize};

use crate::models::StockState;

/// One emitted row describing a detected price or stock change (or a
/// per-entry failure) for a tracked item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRecord {
    pub timestamp: String,
    pub product_id: String,
    pub product_name: String,
    pub seller: String,
    pub url: String,
    pub prev_price: Option<i64>,
    pub curr_price: Option<i64>,
    /// Current price + shipping. Defined iff `curr_price` is defined.
    pub curr_total: Option<i64>,
    pub ship_cost: Option<i64>,
    /// Signed delta string with explicit sign, e.g. `+1200` or `-300`.
    pub diff: String,
    pub change_type: String,
    pub prev_stock: StockState,
    pub curr_stock: StockState,
    pub memo: String,
}

impl ChangeRecord {
    /// Shipping counts as 0 toward the total when it failed to parse; the
    /// unparsed state is still visible through the memo.
    pub fn current_total(curr_price: Option<i64>, ship_cost: Option<i64>) -> Option<i64> {
        curr_price.map(|price| price + ship_cost.unwrap_or(0))
    }

    /// Sheet row layout for the change log.
    pub fn to_row(&self) -> Vec<String> {
        let opt = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();
        vec![
            self.timestamp.clone(),
            self.product_id.clone(),
            self.product_name.clone(),
            self.seller.clone(),
            self.url.clone(),
            opt(self.prev_price),
            opt(self.curr_price),
            opt(self.curr_total),
            self.diff.clone(),
            self.change_type.clone(),
            self.prev_stock.to_string(),
            self.curr_stock.to_string(),
            opt(self.ship_cost),
            self.memo.clone(),
        ]
    }

    pub fn header() -> Vec<String> {
        [
            "timestamp",
            "product_id",
            "product_name",
            "seller",
            "url",
            "prev_price",
            "curr_price",
            "curr_total",
            "diff",
            "change_type",
            "prev_stock",
            "curr_stock",
            "ship_cost",
            "memo",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}
