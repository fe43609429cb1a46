use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Reserved key for the fallback ruleset.
pub const DEFAULT_RULE_KEY: &str = "DEFAULT";

/// Per-domain extraction and retry configuration. Unset fields fall back to
/// the global defaults at the point of use.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ruleset {
    /// Seller display name written into change records.
    pub seller: Option<String>,
    pub price_css: Vec<String>,
    /// Discounted/coupon price selectors; a parsed coupon price supersedes
    /// the regular listed price.
    pub coupon_css: Vec<String>,
    pub ship_css: Vec<String>,
    pub stock_css: Vec<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub retry: Option<u32>,
    pub backoff_ms: Option<u64>,
    /// Politeness delay before fetching, per request.
    pub gap_ms: Option<u64>,
    /// Minimum absolute price delta to classify a change as significant.
    pub threshold: Option<i64>,
    /// Fetch through the headless-browser fallback instead of plain HTTP.
    pub render: bool,
}

/// Domain-pattern keyed ruleset table loaded from the settings sheet.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: BTreeMap<String, Ruleset>,
}

impl RuleBook {
    /// Build the table from raw sheet rows. The first row containing a
    /// `domain` column is the header and maps column names to fields; rows
    /// above it and rows without a domain are ignored. Selector cells hold
    /// newline-separated selector lists.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut rules = BTreeMap::new();

        let Some((header_index, header)) = find_header(rows) else {
            return Self { rules };
        };
        let columns: Vec<String> = header
            .iter()
            .map(|cell| cell.trim().to_lowercase())
            .collect();

        for row in rows.iter().skip(header_index + 1) {
            let mut domain = String::new();
            let mut rule = Ruleset::default();

            for (index, name) in columns.iter().enumerate() {
                let cell = row.get(index).map(|c| c.trim()).unwrap_or("");
                if cell.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "domain" => domain = cell.to_string(),
                    "seller" | "shop" => rule.seller = Some(cell.to_string()),
                    "price_css" => rule.price_css = split_selectors(cell),
                    "coupon_css" => rule.coupon_css = split_selectors(cell),
                    "ship_css" => rule.ship_css = split_selectors(cell),
                    "stock_css" => rule.stock_css = split_selectors(cell),
                    "user_agent" | "ua" => rule.user_agent = Some(cell.to_string()),
                    "timeout" => rule.timeout_secs = cell.parse().ok(),
                    "retry" => rule.retry = cell.parse().ok(),
                    "backoff_ms" => rule.backoff_ms = cell.parse().ok(),
                    "gap_ms" => rule.gap_ms = cell.parse().ok(),
                    "threshold" | "spread" => rule.threshold = cell.parse().ok(),
                    "render" => rule.render = is_truthy(cell),
                    _ => {}
                }
            }

            if !domain.is_empty() {
                rules.insert(domain, rule);
            }
        }

        Self { rules }
    }

    pub fn insert(&mut self, domain: impl Into<String>, rule: Ruleset) {
        self.rules.insert(domain.into(), rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve the ruleset for a target URL: longest domain-pattern that is a
    /// substring of the URL's host wins (ties broken by key order), then the
    /// `DEFAULT` entry, then an empty ruleset. Never fails.
    pub fn select(&self, url: &str) -> Ruleset {
        let host = host_of(url);

        let mut best: Option<(&String, &Ruleset)> = None;
        for (pattern, rule) in &self.rules {
            if pattern == DEFAULT_RULE_KEY || !host.contains(pattern.as_str()) {
                continue;
            }
            // Strict comparison keeps the first (lexicographically smallest)
            // key among equal-length matches.
            if best.is_none_or(|(current, _)| pattern.len() > current.len()) {
                best = Some((pattern, rule));
            }
        }

        if let Some((_, rule)) = best {
            return rule.clone();
        }
        self.rules
            .get(DEFAULT_RULE_KEY)
            .cloned()
            .unwrap_or_default()
    }
}

fn find_header(rows: &[Vec<String>]) -> Option<(usize, &Vec<String>)> {
    rows.iter()
        .enumerate()
        .find(|(_, row)| row.iter().any(|cell| cell.trim().eq_ignore_ascii_case("domain")))
}

fn split_selectors(cell: &str) -> Vec<String> {
    cell.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_truthy(cell: &str) -> bool {
    matches!(cell.to_lowercase().as_str(), "1" | "true" | "y" | "yes")
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        // Malformed URLs still resolve; match against the raw string.
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_longest_domain_pattern_wins() {
        let mut book = RuleBook::default();
        book.insert("shop.com", Ruleset { seller: Some("A".to_string()), ..Default::default() });
        book.insert("sub.shop.com", Ruleset { seller: Some("B".to_string()), ..Default::default() });
        book.insert(DEFAULT_RULE_KEY, Ruleset { seller: Some("C".to_string()), ..Default::default() });

        let rule = book.select("https://sub.shop.com/x");
        assert_eq!(rule.seller.as_deref(), Some("B"));
    }

    #[test]
    fn test_fallback_to_default_entry() {
        let mut book = RuleBook::default();
        book.insert("shop.com", Ruleset { seller: Some("A".to_string()), ..Default::default() });
        book.insert(DEFAULT_RULE_KEY, Ruleset { seller: Some("C".to_string()), ..Default::default() });

        let rule = book.select("https://other.example.net/item");
        assert_eq!(rule.seller.as_deref(), Some("C"));
    }

    #[test]
    fn test_empty_ruleset_when_no_default() {
        let book = RuleBook::default();
        let rule = book.select("https://anywhere.example/item");
        assert_eq!(rule, Ruleset::default());
    }

    #[test]
    fn test_tie_broken_by_key_order() {
        let mut book = RuleBook::default();
        book.insert("op.com", Ruleset { seller: Some("late".to_string()), ..Default::default() });
        book.insert("ho.com", Ruleset { seller: Some("early".to_string()), ..Default::default() });

        // Both six-character patterns match the host; key order decides.
        let rule = book.select("https://op.com.ho.com/item");
        assert_eq!(rule.seller.as_deref(), Some("early"));
    }

    #[test]
    fn test_from_rows_header_mapping() {
        let table = rows(&[
            &["설정 시트"],
            &[""],
            &["domain", "seller", "price_css", "coupon_css", "timeout", "retry", "threshold", "render"],
            &["shop.com", "샵닷컴", ".price\n#total-price", ".coupon-price", "8", "3", "1000", "y"],
            &["DEFAULT", "", ".price", "", "", "", "", ""],
            &["", "ignored: no domain", "", "", "", "", "", ""],
        ]);

        let book = RuleBook::from_rows(&table);
        assert_eq!(book.len(), 2);

        let rule = book.select("https://shop.com/p/1");
        assert_eq!(rule.seller.as_deref(), Some("샵닷컴"));
        assert_eq!(rule.price_css, vec![".price".to_string(), "#total-price".to_string()]);
        assert_eq!(rule.coupon_css, vec![".coupon-price".to_string()]);
        assert_eq!(rule.timeout_secs, Some(8));
        assert_eq!(rule.retry, Some(3));
        assert_eq!(rule.threshold, Some(1000));
        assert!(rule.render);

        let fallback = book.select("https://elsewhere.net/p/1");
        assert_eq!(fallback.price_css, vec![".price".to_string()]);
        assert!(!fallback.render);
    }

    #[test]
    fn test_from_rows_without_header_is_empty() {
        let table = rows(&[&["just", "some", "cells"]]);
        let book = RuleBook::from_rows(&table);
        assert!(book.is_empty());
    }

    #[test]
    fn test_unparseable_numeric_cells_fall_back() {
        let table = rows(&[
            &["domain", "timeout", "spread"],
            &["shop.com", "soon", "많이"],
        ]);
        let book = RuleBook::from_rows(&table);
        let rule = book.select("https://shop.com/");
        assert_eq!(rule.timeout_secs, None);
        assert_eq!(rule.threshold, None);
    }
}
