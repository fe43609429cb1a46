use serde::{Deserialize, Serialize};

/// Aggregate statistics for one full batch pass over the product list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub batch_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_secs: f64,
    pub total: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub http_calls: u32,
    pub rate_limited: u32,
    pub forbidden: u32,
    pub timeouts: u32,
    pub other_failures: u32,
    pub price_changes: u32,
    pub stock_changes: u32,
}

impl RunSummary {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.batch_id.clone(),
            self.started_at.clone(),
            self.finished_at.clone(),
            format!("{:.2}", self.duration_secs),
            self.total.to_string(),
            self.succeeded.to_string(),
            self.failed.to_string(),
            self.http_calls.to_string(),
            self.rate_limited.to_string(),
            self.forbidden.to_string(),
            self.timeouts.to_string(),
            self.other_failures.to_string(),
            self.price_changes.to_string(),
            self.stock_changes.to_string(),
        ]
    }

    pub fn header() -> Vec<String> {
        [
            "batch_id",
            "started_at",
            "finished_at",
            "duration_secs",
            "total",
            "succeeded",
            "failed",
            "http_calls",
            "rate_limited",
            "forbidden",
            "timeouts",
            "other_failures",
            "price_changes",
            "stock_changes",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_layout_matches_header() {
        let summary = RunSummary {
            batch_id: "20260804-100000".to_string(),
            started_at: "2026-08-04 10:00:00".to_string(),
            finished_at: "2026-08-04 10:00:42".to_string(),
            duration_secs: 42.5,
            total: 12,
            succeeded: 10,
            failed: 2,
            http_calls: 11,
            rate_limited: 1,
            forbidden: 0,
            timeouts: 1,
            other_failures: 0,
            price_changes: 3,
            stock_changes: 1,
        };

        let row = summary.to_row();
        assert_eq!(row.len(), RunSummary::header().len());
        assert_eq!(row[3], "42.50");
        assert_eq!(row[4], "12");
        assert_eq!(row[12], "3");
    }
}
