mod common;

use anyhow::Result;
use article_enricher::core::ArticleLookup;
use article_enricher::{
    DateWindow, EnrichError, LookupRepository, MatchStrategy, SaleReference, SqliteSalesSource,
};
use chrono::NaiveDate;
use common::{create_sales_db, ids, Sale};
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn window() -> DateWindow {
    DateWindow::new(date(2024, 10, 1), date(2025, 9, 30))
}

fn sample_sales() -> Vec<Sale<'static>> {
    vec![
        Sale::film("12345-A", "PE/PA/PE", [Some("20"), Some("5"), Some("20")], 100.0, "2024-11-02"),
        Sale::film("12345-A", "PE/PA/PE", [Some("20"), Some("5"), Some("20")], 250.0, "2025-03-14"),
        Sale::film("12345-A", "PE/PA/PE", [Some("20"), Some("5"), Some("20")], 999.0, "2023-01-01"),
        Sale::new("777", "2022-06-01"),
        Sale::new("777", "2024-09-30"),
        Sale::film("888", "PET/PE", [Some("12"), Some("50"), None], 10.0, "2025-09-30"),
        Sale::new("888", "2020-01-01"),
    ]
}

#[test]
fn test_window_match_correlates_partial_key() -> Result<()> {
    let dir = TempDir::new()?;
    let db = create_sales_db(dir.path(), &sample_sales());
    let repo = LookupRepository::new(SqliteSalesSource::new(db, "ZO"), window(), MatchStrategy::Contains);

    let result = repo.resolve(&ids(&["12345"]))?;

    let record = result.get("12345").expect("12345 should match 12345-A");
    assert_eq!(record.key, "12345-A");
    assert_eq!(record.quantity, Some(350.0));
    assert_eq!(record.width, Some(420));
    assert_eq!(record.sale, Some(SaleReference::InWindow(date(2025, 3, 14))));
    Ok(())
}

#[test]
fn test_fallback_record_has_only_sale_date() -> Result<()> {
    let dir = TempDir::new()?;
    let db = create_sales_db(dir.path(), &sample_sales());
    let repo = LookupRepository::new(SqliteSalesSource::new(db, "ZO"), window(), MatchStrategy::Contains);

    let result = repo.resolve(&ids(&["777"]))?;

    let record = &result["777"];
    assert_eq!(record.sale, Some(SaleReference::BeforeWindow(date(2024, 9, 30))));
    assert_eq!(record.quantity, None);
    assert_eq!(record.width, None);
    assert_eq!(record.recipe, None);
    assert_eq!(record.unit, None);
    Ok(())
}

#[test]
fn test_in_window_wins_over_history() -> Result<()> {
    let dir = TempDir::new()?;
    let db = create_sales_db(dir.path(), &sample_sales());
    let repo = LookupRepository::new(SqliteSalesSource::new(db, "ZO"), window(), MatchStrategy::Contains);

    let result = repo.resolve(&ids(&["888", "777", "NOPE"]))?;

    assert_eq!(result.len(), 2);
    assert_eq!(result["888"].sale, Some(SaleReference::InWindow(date(2025, 9, 30))));
    assert_eq!(result["888"].quantity, Some(10.0));
    assert!(result["777"].is_fallback());
    assert!(!result.contains_key("NOPE"));
    Ok(())
}

#[test]
fn test_history_row_is_not_handed_to_looser_identifier() -> Result<()> {
    let dir = TempDir::new()?;
    let db = create_sales_db(
        dir.path(),
        &[
            Sale::film("1234-5", "PE/PA", [Some("20"), Some("5"), None], 1.0, "2025-01-01"),
            Sale::new("1234-5", "2020-01-01"),
        ],
    );
    let repo = LookupRepository::new(SqliteSalesSource::new(db, "ZO"), window(), MatchStrategy::Contains);

    let result = repo.resolve(&ids(&["1234", "234"]))?;

    assert_eq!(result.len(), 1);
    assert_eq!(result["1234"].sale, Some(SaleReference::InWindow(date(2025, 1, 1))));
    assert!(!result.contains_key("234"));
    Ok(())
}

#[test]
fn test_exact_strategy_requires_full_key() -> Result<()> {
    let dir = TempDir::new()?;
    let db = create_sales_db(dir.path(), &sample_sales());
    let repo = LookupRepository::new(SqliteSalesSource::new(db, "ZO"), window(), MatchStrategy::Exact);

    let result = repo.resolve(&ids(&["12345", "12345-A"]))?;

    assert_eq!(result.len(), 1);
    assert!(result.contains_key("12345-A"));
    Ok(())
}

#[test]
fn test_empty_request_does_not_touch_database() {
    // the database file does not exist; resolving nothing must still succeed
    let repo = LookupRepository::new(
        SqliteSalesSource::new("/nonexistent/sales.db", "ZO"),
        window(),
        MatchStrategy::Contains,
    );
    assert!(repo.resolve(&[]).unwrap().is_empty());
}

#[test]
fn test_missing_database_is_repository_error() {
    let dir = TempDir::new().unwrap();
    let repo = LookupRepository::new(
        SqliteSalesSource::new(dir.path().join("missing.db"), "ZO"),
        window(),
        MatchStrategy::Contains,
    );

    let err = repo.resolve(&ids(&["12345"])).unwrap_err();
    assert!(matches!(err, EnrichError::RepositoryError(_)));
}

#[test]
fn test_missing_table_is_repository_error() {
    let dir = TempDir::new().unwrap();
    let db = create_sales_db(dir.path(), &[]);
    let repo = LookupRepository::new(SqliteSalesSource::new(db, "SALES"), window(), MatchStrategy::Contains);

    let err = repo.resolve(&ids(&["12345"])).unwrap_err();
    assert!(matches!(err, EnrichError::RepositoryError(_)));
}
