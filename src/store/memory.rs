use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{ChangeRecord, ProductEntry, RunSummary};
use crate::store::{ChangeSink, ProductSource, RuleRowSource, RunLogSink};
use crate::utils::error::Result;

/// In-memory store for tests and dry runs: fixed inputs, captured outputs.
#[derive(Default)]
pub struct MemoryStore {
    products: Vec<ProductEntry>,
    rule_rows: Vec<Vec<String>>,
    changes: Mutex<Vec<ChangeRecord>>,
    runs: Mutex<Vec<RunSummary>>,
}

impl MemoryStore {
    pub fn new(products: Vec<ProductEntry>, rule_rows: Vec<Vec<String>>) -> Self {
        Self {
            products,
            rule_rows,
            ..Default::default()
        }
    }

    pub fn changes(&self) -> Vec<ChangeRecord> {
        self.changes.lock().expect("change log poisoned").clone()
    }

    pub fn runs(&self) -> Vec<RunSummary> {
        self.runs.lock().expect("run log poisoned").clone()
    }
}

#[async_trait]
impl ProductSource for MemoryStore {
    async fn product_entries(&self) -> Result<Vec<ProductEntry>> {
        Ok(self.products.clone())
    }
}

#[async_trait]
impl RuleRowSource for MemoryStore {
    async fn rule_rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.rule_rows.clone())
    }
}

#[async_trait]
impl ChangeSink for MemoryStore {
    async fn append_change(&self, record: &ChangeRecord) -> Result<()> {
        self.changes
            .lock()
            .expect("change log poisoned")
            .push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl RunLogSink for MemoryStore {
    async fn append_run(&self, summary: &RunSummary) -> Result<()> {
        self.runs
            .lock()
            .expect("run log poisoned")
            .push(summary.clone());
        Ok(())
    }
}
