use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::models::{ChangeRecord, ProductEntry, RunSummary};
use crate::store::{ChangeSink, ProductSource, RuleRowSource, RunLogSink};
use crate::utils::error::{AppError, Result};

const SHEET_PRODUCTS: &str = "products.tsv";
const SHEET_RULES: &str = "rules.tsv";
const SHEET_CHANGES: &str = "changes.tsv";
const SHEET_RUNLOG: &str = "runlog.tsv";

/// Directory-of-TSV-sheets workbook. Each sheet is rows of tab-separated
/// cells; `products`/`rules` are read per run, `changes`/`runlog` are
/// append-only.
pub struct Workbook {
    dir: PathBuf,
}

impl Workbook {
    /// The directory must already exist; it is never created implicitly.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(AppError::Store(format!(
                "workbook directory not found: {}",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn read_rows(&self, name: &str) -> Result<Vec<Vec<String>>> {
        let path = self.sheet_path(name);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(content
            .lines()
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect())
    }

    async fn append_row(&self, name: &str, header: Vec<String>, row: Vec<String>) -> Result<()> {
        let path = self.sheet_path(name);
        let mut line = String::new();
        if !path.is_file() {
            line.push_str(&join_row(&header));
            line.push('\n');
        }
        line.push_str(&join_row(&row));
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Cells may carry anything (memos quote error text); tabs and newlines are
/// flattened to spaces so the sheet stays one row per line.
fn join_row(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| cell.replace(['\t', '\n', '\r'], " "))
        .collect::<Vec<_>>()
        .join("\t")
}

fn cell(row: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .map(|c| c.trim().to_string())
        .unwrap_or_default()
}

fn column(header: &[String], name: &str) -> Option<usize> {
    header
        .iter()
        .position(|cell| cell.trim().eq_ignore_ascii_case(name))
}

#[async_trait]
impl ProductSource for Workbook {
    async fn product_entries(&self) -> Result<Vec<ProductEntry>> {
        let rows = self.read_rows(SHEET_PRODUCTS).await?;
        let Some(header) = rows.first() else {
            return Err(AppError::Store(format!(
                "{SHEET_PRODUCTS} is missing or empty in {}",
                self.dir.display()
            )));
        };

        let id = column(header, "id");
        let name = column(header, "name");
        let prev_price = column(header, "prev_price");
        let seller = column(header, "seller");
        let url = column(header, "url");
        if id.is_none() || url.is_none() {
            return Err(AppError::Store(format!(
                "{SHEET_PRODUCTS} header must carry at least `id` and `url` columns"
            )));
        }

        Ok(rows
            .iter()
            .skip(1)
            .map(|row| ProductEntry {
                id: cell(row, id),
                name: cell(row, name),
                prev_price_raw: cell(row, prev_price),
                prev_seller: cell(row, seller),
                url: cell(row, url),
            })
            .collect())
    }
}

#[async_trait]
impl RuleRowSource for Workbook {
    async fn rule_rows(&self) -> Result<Vec<Vec<String>>> {
        // A missing rules sheet simply means every domain uses the defaults.
        self.read_rows(SHEET_RULES).await
    }
}

#[async_trait]
impl ChangeSink for Workbook {
    async fn append_change(&self, record: &ChangeRecord) -> Result<()> {
        self.append_row(SHEET_CHANGES, ChangeRecord::header(), record.to_row())
            .await
    }
}

#[async_trait]
impl RunLogSink for Workbook {
    async fn append_run(&self, summary: &RunSummary) -> Result<()> {
        self.append_row(SHEET_RUNLOG, RunSummary::header(), summary.to_row())
            .await
    }
}
