use crate::domain::categories::CategoryMap;
use crate::domain::recipe::{parse_layers, LayerBreakdown, RecipeRules};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inclusive reporting window for sales transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap_or_default(),
        }
    }
}

/// How a requested identifier is matched against stored article keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Stored key must equal the identifier.
    Exact,
    /// Stored key equals or contains the identifier.
    #[default]
    Contains,
}

impl MatchStrategy {
    pub fn matches(&self, stored_key: &str, requested: &str) -> bool {
        match self {
            MatchStrategy::Exact => stored_key == requested,
            MatchStrategy::Contains => stored_key == requested || stored_key.contains(requested),
        }
    }
}

/// When the article was last sold, relative to the reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum SaleReference {
    InWindow(NaiveDate),
    BeforeWindow(NaiveDate),
}

impl SaleReference {
    pub fn to_cell(&self) -> String {
        match self {
            SaleReference::InWindow(d) => d.format("%Y-%m-%d").to_string(),
            SaleReference::BeforeWindow(d) => format!("before window: {}", d.format("%Y-%m-%d")),
        }
    }
}

/// Aggregated in-window row for one stored article key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowRow {
    pub key: String,
    pub width: Option<i64>,
    pub thickness: [Option<String>; 3],
    pub recipe: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub last_sale: Option<NaiveDate>,
}

/// Most recent sale before the window for one stored article key.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub key: String,
    pub last_sale: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub key: String,
    pub width: Option<i64>,
    pub thickness: [Option<String>; 3],
    pub recipe: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub sale: Option<SaleReference>,
}

impl ArticleRecord {
    pub fn from_window_row(row: WindowRow) -> Self {
        Self {
            key: row.key,
            width: row.width,
            thickness: row.thickness,
            recipe: row.recipe,
            quantity: row.quantity,
            unit: row.unit,
            sale: row.last_sale.map(SaleReference::InWindow),
        }
    }

    /// Fallback matches only carry the last sale date.
    pub fn from_history_row(row: HistoryRow) -> Self {
        Self {
            key: row.key,
            width: None,
            thickness: [None, None, None],
            recipe: None,
            quantity: None,
            unit: None,
            sale: row.last_sale.map(SaleReference::BeforeWindow),
        }
    }

    pub fn thickness_fields(&self) -> [Option<&str>; 3] {
        [
            self.thickness[0].as_deref(),
            self.thickness[1].as_deref(),
            self.thickness[2].as_deref(),
        ]
    }

    /// Recomputed on every call.
    pub fn layers(&self, rules: &RecipeRules, categories: &CategoryMap) -> LayerBreakdown {
        parse_layers(
            self.recipe.as_deref(),
            self.thickness_fields(),
            rules,
            categories,
        )
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.sale, Some(SaleReference::BeforeWindow(_)))
    }
}

pub type LookupResult = HashMap<String, ArticleRecord>;

/// Header row plus data rows. Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Returns the index of `name`, appending an empty column if missing.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.resize(self.headers.len(), None);
        }
        self.headers.len() - 1
    }

    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len().max(row.len()), None);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: Option<String>) {
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() <= col {
                cells.resize(col + 1, None);
            }
            cells[col] = value;
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub identifiers: usize,
    pub in_window_matches: usize,
    pub fallback_matches: usize,
    pub unmatched: usize,
    pub enriched_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_match_strategy() {
        assert!(MatchStrategy::Exact.matches("12345", "12345"));
        assert!(!MatchStrategy::Exact.matches("12345-A", "12345"));
        assert!(MatchStrategy::Contains.matches("12345-A", "12345"));
        assert!(MatchStrategy::Contains.matches("X-12345", "12345"));
        assert!(!MatchStrategy::Contains.matches("1234", "12345"));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = DateWindow::new(date(2024, 10, 1), date(2025, 9, 30));
        assert!(window.contains(date(2024, 10, 1)));
        assert!(window.contains(date(2025, 9, 30)));
        assert!(!window.contains(date(2024, 9, 30)));
    }

    #[test]
    fn test_history_row_has_no_quantitative_fields() {
        let record = ArticleRecord::from_history_row(HistoryRow {
            key: "A1".to_string(),
            last_sale: Some(date(2023, 5, 1)),
        });
        assert!(record.is_fallback());
        assert_eq!(record.width, None);
        assert_eq!(record.quantity, None);
        assert_eq!(record.thickness, [None, None, None]);
        assert_eq!(
            record.sale.map(|s| s.to_cell()),
            Some("before window: 2023-05-01".to_string())
        );
    }

    #[test]
    fn test_ensure_column_reuses_existing() {
        let mut dataset = Dataset::new(vec!["A".to_string()]);
        dataset.push_row(vec![Some("1".to_string())]);

        let b = dataset.ensure_column("B");
        assert_eq!(b, 1);
        assert_eq!(dataset.rows[0].len(), 2);
        assert_eq!(dataset.ensure_column("B"), 1);
        assert_eq!(dataset.headers.len(), 2);

        dataset.set_cell(0, b, Some("x".to_string()));
        assert_eq!(dataset.cell(0, b), Some("x"));
    }
}
