use std::time::{Duration, Instant};

use scraper::Html;
use tracing::{debug, info};

use crate::classify::classify;
use crate::config::AppConfig;
use crate::extract::ExtractedState;
use crate::fetcher::{FailureClass, FetchError, FetchOptions, HttpFetcher};
use crate::models::{ChangeRecord, ProductEntry, RunSummary, StockState};
use crate::render;
use crate::rules::{RuleBook, Ruleset};
use crate::store::{ChangeSink, ProductSource, RuleRowSource, RunLogSink};
use crate::utils::error::Result;
use crate::utils::time::{batch_id, now_kst, timestamp};

const MEMO_NO_URL: &str = "no URL/unreachable";

/// Drives one batch pass: resolve rules, fetch, extract, classify, and
/// append records, accumulating run statistics. A single entry's failure
/// never aborts the batch; it becomes a change record with a failure memo.
pub struct Runner {
    config: AppConfig,
    fetcher: HttpFetcher,
}

impl Runner {
    pub fn new(config: AppConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new()?;
        Ok(Self { config, fetcher })
    }

    pub async fn run_once(
        &self,
        products: &dyn ProductSource,
        rules: &dyn RuleRowSource,
        changes: &dyn ChangeSink,
        runlog: &dyn RunLogSink,
    ) -> Result<RunSummary> {
        let started = now_kst();
        let clock = Instant::now();

        let book = RuleBook::from_rows(&rules.rule_rows().await?);
        let entries = products.product_entries().await?;
        info!(entries = entries.len(), rules = book.len(), "starting batch");

        let mut summary = RunSummary {
            batch_id: batch_id(started),
            started_at: timestamp(started),
            ..Default::default()
        };

        for entry in &entries {
            if entry.is_blank() {
                continue;
            }
            summary.total += 1;

            if entry.url.is_empty() {
                // Nothing to fetch; record the entry as unreachable.
                changes.append_change(&unreachable_record(entry)).await?;
                if entry.prev_price().is_some() {
                    summary.stock_changes += 1;
                }
                summary.succeeded += 1;
                continue;
            }

            let rule = book.select(&entry.url);
            debug!(id = %entry.id, url = %entry.url, seller = ?rule.seller, "processing entry");

            let gap = rule.gap_ms.unwrap_or(0);
            if gap > 0 {
                tokio::time::sleep(Duration::from_millis(gap)).await;
            }

            match self.fetch_page(&entry.url, &rule).await {
                Ok(body) => {
                    summary.http_calls += 1;
                    self.classify_entry(entry, &rule, &body, changes, &mut summary)
                        .await?;
                    summary.succeeded += 1;
                }
                Err(err) => {
                    // The change log is the audit trail; the console only
                    // sees aggregate counters.
                    debug!(id = %entry.id, url = %entry.url, error = %err, "entry fetch failed");
                    match err.class {
                        FailureClass::RateLimited => summary.rate_limited += 1,
                        FailureClass::Forbidden => summary.forbidden += 1,
                        FailureClass::Timeout => summary.timeouts += 1,
                        FailureClass::Other => summary.other_failures += 1,
                    }
                    changes.append_change(&failure_record(entry, &err)).await?;
                    summary.failed += 1;
                }
            }
        }

        let finished = now_kst();
        summary.finished_at = timestamp(finished);
        summary.duration_secs = clock.elapsed().as_secs_f64();
        runlog.append_run(&summary).await?;

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            price_changes = summary.price_changes,
            stock_changes = summary.stock_changes,
            "batch finished"
        );
        Ok(summary)
    }

    async fn fetch_page(&self, url: &str, rule: &Ruleset) -> std::result::Result<String, FetchError> {
        let fetcher_cfg = &self.config.fetcher;
        let timeout = Duration::from_secs(rule.timeout_secs.unwrap_or(fetcher_cfg.timeout_secs));

        if rule.render {
            return render::fetch_rendered_html(url, timeout, fetcher_cfg.chrome_path.clone())
                .await
                .map_err(|err| FetchError {
                    class: FailureClass::Other,
                    status: None,
                    message: format!("render failed: {err}"),
                });
        }

        let opts = FetchOptions {
            user_agent: rule
                .user_agent
                .clone()
                .unwrap_or_else(|| fetcher_cfg.user_agent.clone()),
            timeout,
            retry: rule.retry.unwrap_or(fetcher_cfg.retry),
            backoff: Duration::from_millis(rule.backoff_ms.unwrap_or(fetcher_cfg.backoff_ms)),
        };
        self.fetcher.fetch(url, &opts).await.map(|response| response.body)
    }

    async fn classify_entry(
        &self,
        entry: &ProductEntry,
        rule: &Ruleset,
        body: &str,
        changes: &dyn ChangeSink,
        summary: &mut RunSummary,
    ) -> Result<()> {
        // Parsed document stays inside this block; only owned strings leave.
        let state = {
            let document = Html::parse_document(body);
            ExtractedState::from_document(&document, rule)
        };
        let prev_price = entry.prev_price();
        let threshold = rule.threshold.unwrap_or(self.config.run.price_threshold);

        let Some(verdict) = classify(prev_price, &state, threshold) else {
            debug!(id = %entry.id, "no significant change");
            return Ok(());
        };

        let record = ChangeRecord {
            timestamp: timestamp(now_kst()),
            product_id: entry.id.clone(),
            product_name: entry.name.clone(),
            seller: rule
                .seller
                .clone()
                .unwrap_or_else(|| entry.prev_seller.clone()),
            url: entry.url.clone(),
            prev_price,
            curr_price: state.price,
            curr_total: ChangeRecord::current_total(state.price, state.shipping.value),
            ship_cost: state.shipping.value,
            diff: verdict.diff.clone(),
            change_type: verdict.change_type.clone(),
            prev_stock: StockState::InStock,
            curr_stock: state.stock,
            memo: verdict.memo.clone(),
        };
        changes.append_change(&record).await?;

        if verdict.price_changed {
            summary.price_changes += 1;
        }
        if verdict.stock_changed || state.price.is_none() {
            summary.stock_changes += 1;
        }
        Ok(())
    }
}

fn unreachable_record(entry: &ProductEntry) -> ChangeRecord {
    ChangeRecord {
        timestamp: timestamp(now_kst()),
        product_id: entry.id.clone(),
        product_name: entry.name.clone(),
        seller: entry.prev_seller.clone(),
        url: String::new(),
        prev_price: entry.prev_price(),
        curr_price: None,
        curr_total: None,
        ship_cost: None,
        diff: String::new(),
        change_type: String::new(),
        prev_stock: StockState::InStock,
        curr_stock: StockState::OutOfStock,
        memo: MEMO_NO_URL.to_string(),
    }
}

fn failure_record(entry: &ProductEntry, err: &FetchError) -> ChangeRecord {
    ChangeRecord {
        timestamp: timestamp(now_kst()),
        product_id: entry.id.clone(),
        product_name: entry.name.clone(),
        seller: entry.prev_seller.clone(),
        url: entry.url.clone(),
        prev_price: entry.prev_price(),
        curr_price: None,
        curr_total: None,
        ship_cost: None,
        diff: String::new(),
        change_type: String::new(),
        prev_stock: StockState::InStock,
        curr_stock: StockState::OutOfStock,
        memo: format!("fetch error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetcherConfig, RunConfig, SchedulerConfig, StoreConfig};
    use crate::store::MemoryStore;

    fn test_config() -> AppConfig {
        AppConfig {
            store: StoreConfig { workbook: String::new() },
            fetcher: FetcherConfig {
                user_agent: "pricewatch-test/1.0".to_string(),
                timeout_secs: 2,
                retry: 0,
                backoff_ms: 5,
                chrome_path: None,
            },
            run: RunConfig { price_threshold: 500 },
            scheduler: SchedulerConfig { cron: "0 0 * * * *".to_string() },
        }
    }

    fn entry(id: &str, prev: &str, url: &str) -> ProductEntry {
        ProductEntry {
            id: id.to_string(),
            name: format!("product {id}"),
            prev_price_raw: prev.to_string(),
            prev_seller: "old-seller".to_string(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_blank_rows_are_skipped_entirely() {
        let store = MemoryStore::new(
            vec![ProductEntry::default(), entry("A-001", "10000", "")],
            Vec::new(),
        );
        let runner = Runner::new(test_config()).unwrap();

        let summary = runner
            .run_once(&store, &store, &store, &store)
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(store.changes().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_url_synthesizes_unreachable_record() {
        let store = MemoryStore::new(vec![entry("A-001", "12,000", "")], Vec::new());
        let runner = Runner::new(test_config()).unwrap();

        let summary = runner
            .run_once(&store, &store, &store, &store)
            .await
            .unwrap();

        let records = store.changes();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].curr_stock, StockState::OutOfStock);
        assert_eq!(records[0].memo, "no URL/unreachable");
        assert_eq!(records[0].prev_price, Some(12000));
        assert_eq!(records[0].curr_price, None);

        // The entry still counts as processed, and the prior price implies a
        // stock transition.
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.stock_changes, 1);
        assert_eq!(summary.http_calls, 0);
    }

    #[tokio::test]
    async fn test_missing_url_without_prior_price_counts_no_transition() {
        let store = MemoryStore::new(vec![entry("A-002", "", "")], Vec::new());
        let runner = Runner::new(test_config()).unwrap();

        let summary = runner
            .run_once(&store, &store, &store, &store)
            .await
            .unwrap();

        assert_eq!(store.changes().len(), 1);
        assert_eq!(summary.stock_changes, 0);
    }

    #[tokio::test]
    async fn test_summary_is_logged_once_per_run() {
        let store = MemoryStore::new(Vec::new(), Vec::new());
        let runner = Runner::new(test_config()).unwrap();

        runner.run_once(&store, &store, &store, &store).await.unwrap();

        let runs = store.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].total, 0);
        assert_eq!(runs[0].batch_id.len(), 15);
    }
}
