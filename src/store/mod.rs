use async_trait::async_trait;

use crate::models::{ChangeRecord, ProductEntry, RunSummary};
use crate::utils::error::Result;

pub mod memory;
pub mod workbook;

pub use memory::MemoryStore;
pub use workbook::Workbook;

/// Ordered product rows from the external tabular store.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn product_entries(&self) -> Result<Vec<ProductEntry>>;
}

/// Raw settings-sheet rows; the rule table parses them itself.
#[async_trait]
pub trait RuleRowSource: Send + Sync {
    async fn rule_rows(&self) -> Result<Vec<Vec<String>>>;
}

/// Append-only change log. Appends are synchronous and ordered.
#[async_trait]
pub trait ChangeSink: Send + Sync {
    async fn append_change(&self, record: &ChangeRecord) -> Result<()>;
}

/// Append-only run log; one row per batch.
#[async_trait]
pub trait RunLogSink: Send + Sync {
    async fn append_run(&self, summary: &RunSummary) -> Result<()>;
}
