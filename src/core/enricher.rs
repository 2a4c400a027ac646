use crate::core::lookup::unique_identifiers;
use crate::domain::categories::CategoryMap;
use crate::domain::model::{ArticleRecord, Dataset, LookupResult, RunSummary};
use crate::domain::ports::ArticleLookup;
use crate::domain::recipe::{round2, LayerBreakdown, RecipeRules};
use crate::utils::error::{EnrichError, Result};

pub const DEFAULT_ITEM_COLUMN: &str = "Purchase item number";

pub const WIDTH_COLUMN: &str = "SZEROKOSC_1";
pub const THICKNESS_COLUMNS: [&str; 3] = ["GRUBOSC_11", "GRUBOSC_21", "GRUBOSC_31"];
pub const RECIPE_COLUMN: &str = "RECEPTURA_1";
pub const QUANTITY_COLUMN: &str = "TECH";
pub const UNIT_COLUMN: &str = "JM2";
pub const TOTAL_THICKNESS_COLUMN: &str = "TOTAL_THICKNESS";
pub const SALES_DATES_COLUMN: &str = "SALES_DATES";

/// Contact flag for the layer at `index` (0-based) of a `count`-layer
/// recipe. Positional only: the first and last layers face the product or
/// the environment, inner layers do not.
pub fn contact_flag(index: usize, count: usize) -> &'static str {
    if index == 0 || index + 1 == count {
        "YES"
    } else {
        "NO"
    }
}

/// Output column names in the order they are appended.
pub fn output_columns() -> Vec<String> {
    let mut columns = vec![WIDTH_COLUMN.to_string()];
    columns.extend(THICKNESS_COLUMNS.iter().map(|c| c.to_string()));
    columns.extend(
        [RECIPE_COLUMN, QUANTITY_COLUMN, UNIT_COLUMN, TOTAL_THICKNESS_COLUMN]
            .iter()
            .map(|c| c.to_string()),
    );
    for idx in 1..=LayerBreakdown::EXPOSED_LAYERS {
        columns.push(layer_material_column(idx));
        columns.push(layer_type_column(idx));
        columns.push(layer_percent_column(idx));
        columns.push(layer_contact_column(idx));
    }
    columns.push(SALES_DATES_COLUMN.to_string());
    columns
}

pub fn layer_material_column(idx: usize) -> String {
    format!("WARSTWA_{}", idx)
}

pub fn layer_type_column(idx: usize) -> String {
    format!("Material_type_{}", idx)
}

pub fn layer_percent_column(idx: usize) -> String {
    format!("Material_type_{}_percent", idx)
}

pub fn layer_contact_column(idx: usize) -> String {
    format!("Material_type_{}_contact", idx)
}

/// Writes article attributes and the layer breakdown onto a dataset.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    rules: RecipeRules,
    categories: CategoryMap,
}

impl Enricher {
    pub fn new(rules: RecipeRules, categories: CategoryMap) -> Self {
        Self { rules, categories }
    }

    /// Unique identifiers of `column`, in first-seen order. Empty cells are skipped.
    pub fn identifiers(dataset: &Dataset, column: &str) -> Result<Vec<String>> {
        let col = dataset
            .column_index(column)
            .ok_or_else(|| EnrichError::MissingColumnError {
                column: column.to_string(),
            })?;

        let raw: Vec<String> = (0..dataset.len())
            .filter_map(|row| dataset.cell(row, col))
            .map(str::to_string)
            .collect();
        Ok(unique_identifiers(&raw))
    }

    /// Resolves and applies in one synchronous step.
    pub fn enrich<L: ArticleLookup + ?Sized>(
        &self,
        lookup: &L,
        dataset: &mut Dataset,
        column: &str,
    ) -> Result<RunSummary> {
        let identifiers = Self::identifiers(dataset, column)?;
        let result = lookup.resolve(&identifiers)?;
        self.apply(dataset, column, &result)
    }

    pub fn apply(
        &self,
        dataset: &mut Dataset,
        column: &str,
        result: &LookupResult,
    ) -> Result<RunSummary> {
        let id_col = dataset
            .column_index(column)
            .ok_or_else(|| EnrichError::MissingColumnError {
                column: column.to_string(),
            })?;

        let identifiers = Self::identifiers(dataset, column)?;
        let columns: Vec<usize> = output_columns()
            .iter()
            .map(|name| dataset.ensure_column(name))
            .collect();

        let mut summary = RunSummary {
            rows: dataset.len(),
            identifiers: identifiers.len(),
            in_window_matches: result.values().filter(|r| !r.is_fallback()).count(),
            fallback_matches: result.values().filter(|r| r.is_fallback()).count(),
            ..Default::default()
        };
        summary.unmatched = identifiers
            .iter()
            .filter(|id| !result.contains_key(*id))
            .count();

        for row in 0..dataset.len() {
            // 先清空輸出欄位，重複執行時結果一致
            for &col in &columns {
                dataset.set_cell(row, col, None);
            }

            let Some(id) = dataset.cell(row, id_col).map(str::trim).filter(|id| !id.is_empty())
            else {
                continue;
            };
            let Some(record) = result.get(id) else {
                tracing::debug!("Row {}: no article found for '{}'", row + 2, id);
                continue;
            };

            for (name, value) in self.row_values(record) {
                let col = dataset.ensure_column(&name);
                dataset.set_cell(row, col, value);
            }
            summary.enriched_rows += 1;
        }

        Ok(summary)
    }

    fn row_values(&self, record: &ArticleRecord) -> Vec<(String, Option<String>)> {
        let mut values = vec![(WIDTH_COLUMN.to_string(), record.width.map(|w| w.to_string()))];
        for (name, thickness) in THICKNESS_COLUMNS.iter().zip(&record.thickness) {
            values.push((name.to_string(), thickness.clone()));
        }
        values.push((RECIPE_COLUMN.to_string(), record.recipe.clone()));
        values.push((QUANTITY_COLUMN.to_string(), record.quantity.map(|q| q.to_string())));
        values.push((UNIT_COLUMN.to_string(), record.unit.clone()));

        let breakdown = record.layers(&self.rules, &self.categories);
        if !breakdown.is_empty() {
            values.push((
                TOTAL_THICKNESS_COLUMN.to_string(),
                Some(round2(breakdown.total_thickness()).to_string()),
            ));
        }
        if breakdown.len() > LayerBreakdown::EXPOSED_LAYERS {
            tracing::debug!(
                "Article '{}' has {} layers, only the first {} are exported",
                record.key,
                breakdown.len(),
                LayerBreakdown::EXPOSED_LAYERS
            );
        }
        for (idx, layer) in breakdown.exposed().iter().enumerate() {
            let position = idx + 1;
            values.push((layer_material_column(position), Some(layer.material.clone())));
            values.push((layer_type_column(position), Some(layer.category.clone())));
            values.push((
                layer_percent_column(position),
                Some(format!("{:.2}", round2(layer.proportion))),
            ));
            values.push((
                layer_contact_column(position),
                Some(contact_flag(idx, breakdown.len()).to_string()),
            ));
        }

        values.push((
            SALES_DATES_COLUMN.to_string(),
            record.sale.map(|s| s.to_cell()),
        ));
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{HistoryRow, WindowRow};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn dataset(ids: &[Option<&str>]) -> Dataset {
        let mut dataset = Dataset::new(vec!["Supplier".to_string(), DEFAULT_ITEM_COLUMN.to_string()]);
        for id in ids {
            dataset.push_row(vec![Some("ACME".to_string()), id.map(str::to_string)]);
        }
        dataset
    }

    fn window_record(key: &str, recipe: &str, t: [&str; 3]) -> ArticleRecord {
        ArticleRecord::from_window_row(WindowRow {
            key: key.to_string(),
            width: Some(420),
            thickness: t.map(|v| (!v.is_empty()).then(|| v.to_string())),
            recipe: Some(recipe.to_string()),
            quantity: Some(1500.0),
            unit: Some("KG".to_string()),
            last_sale: NaiveDate::from_ymd_opt(2025, 3, 14),
        })
    }

    fn get<'a>(dataset: &'a Dataset, row: usize, column: &str) -> Option<&'a str> {
        dataset.cell(row, dataset.column_index(column).unwrap())
    }

    #[test]
    fn test_missing_item_column_is_fatal() {
        let mut data = Dataset::new(vec!["Other".to_string()]);
        let err = Enricher::default()
            .apply(&mut data, DEFAULT_ITEM_COLUMN, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, EnrichError::MissingColumnError { .. }));
    }

    #[test]
    fn test_matched_row_gets_layer_columns() {
        let mut data = dataset(&[Some("12345")]);
        let mut result = HashMap::new();
        result.insert("12345".to_string(), window_record("12345-A", "PE/PA/PE", ["20", "5", "20"]));

        let summary = Enricher::default()
            .apply(&mut data, DEFAULT_ITEM_COLUMN, &result)
            .unwrap();

        assert_eq!(summary.enriched_rows, 1);
        assert_eq!(summary.in_window_matches, 1);
        assert_eq!(get(&data, 0, WIDTH_COLUMN), Some("420"));
        assert_eq!(get(&data, 0, QUANTITY_COLUMN), Some("1500"));
        assert_eq!(get(&data, 0, TOTAL_THICKNESS_COLUMN), Some("45"));
        assert_eq!(get(&data, 0, "WARSTWA_2"), Some("PA"));
        assert_eq!(get(&data, 0, "Material_type_1_percent"), Some("44.44"));
        assert_eq!(get(&data, 0, "Material_type_2_percent"), Some("11.11"));
        assert_eq!(get(&data, 0, "Material_type_1_contact"), Some("YES"));
        assert_eq!(get(&data, 0, "Material_type_2_contact"), Some("NO"));
        assert_eq!(get(&data, 0, "Material_type_3_contact"), Some("YES"));
        assert_eq!(get(&data, 0, SALES_DATES_COLUMN), Some("2025-03-14"));
        // original columns are untouched and come first
        assert_eq!(data.headers[0], "Supplier");
        assert_eq!(get(&data, 0, "Supplier"), Some("ACME"));
    }

    #[test]
    fn test_unmatched_and_empty_rows_stay_blank() {
        let mut data = dataset(&[None, Some("999"), Some("  ")]);
        let summary = Enricher::default()
            .apply(&mut data, DEFAULT_ITEM_COLUMN, &HashMap::new())
            .unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.identifiers, 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.enriched_rows, 0);
        for row in 0..3 {
            assert_eq!(get(&data, row, WIDTH_COLUMN), None);
            assert_eq!(get(&data, row, SALES_DATES_COLUMN), None);
        }
        assert_eq!(data.headers.len(), 2 + output_columns().len());
    }

    #[test]
    fn test_fallback_row_only_has_sale_date() {
        let mut data = dataset(&[Some("777")]);
        let mut result = HashMap::new();
        result.insert(
            "777".to_string(),
            ArticleRecord::from_history_row(HistoryRow {
                key: "777".to_string(),
                last_sale: NaiveDate::from_ymd_opt(2023, 5, 1),
            }),
        );

        let summary = Enricher::default()
            .apply(&mut data, DEFAULT_ITEM_COLUMN, &result)
            .unwrap();

        assert_eq!(summary.fallback_matches, 1);
        assert_eq!(get(&data, 0, SALES_DATES_COLUMN), Some("before window: 2023-05-01"));
        assert_eq!(get(&data, 0, QUANTITY_COLUMN), None);
        assert_eq!(get(&data, 0, TOTAL_THICKNESS_COLUMN), None);
        assert_eq!(get(&data, 0, "Material_type_1"), None);
    }

    #[test]
    fn test_two_layer_recipe_leaves_third_layer_blank() {
        let mut data = dataset(&[Some("A")]);
        let mut result = HashMap::new();
        result.insert("A".to_string(), window_record("A", "PE-EVOH/PET", ["30", "10", ""]));

        Enricher::default()
            .apply(&mut data, DEFAULT_ITEM_COLUMN, &result)
            .unwrap();

        assert_eq!(get(&data, 0, "WARSTWA_1"), Some("PE"));
        assert_eq!(get(&data, 0, "Material_type_1_percent"), Some("75.00"));
        assert_eq!(get(&data, 0, "Material_type_2_percent"), Some("25.00"));
        assert_eq!(get(&data, 0, "Material_type_3"), None);
        // 兩層時第二層就是外層
        assert_eq!(get(&data, 0, "Material_type_1_contact"), Some("YES"));
        assert_eq!(get(&data, 0, "Material_type_2_contact"), Some("YES"));
        assert_eq!(get(&data, 0, "Material_type_3_contact"), None);
    }

    #[test]
    fn test_contact_flag_follows_outer_layers() {
        assert_eq!(contact_flag(0, 1), "YES");
        assert_eq!(contact_flag(1, 3), "NO");
        assert_eq!(contact_flag(2, 3), "YES");
        // 第四層才是外層，第三欄是內層
        assert_eq!(contact_flag(2, 4), "NO");
        assert_eq!(contact_flag(3, 4), "YES");
    }

    #[test]
    fn test_total_thickness_is_rounded() {
        let mut data = dataset(&[Some("A")]);
        let mut result = HashMap::new();
        result.insert("A".to_string(), window_record("A", "PE/PA", ["0,1", "0,2", ""]));

        Enricher::default()
            .apply(&mut data, DEFAULT_ITEM_COLUMN, &result)
            .unwrap();

        assert_eq!(get(&data, 0, TOTAL_THICKNESS_COLUMN), Some("0.3"));
        assert_eq!(get(&data, 0, "Material_type_1_percent"), Some("33.33"));
        assert_eq!(get(&data, 0, "Material_type_2_percent"), Some("66.67"));
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let mut data = dataset(&[Some("A"), Some("B")]);
        let mut result = HashMap::new();
        result.insert("A".to_string(), window_record("A", "OPP/PE", ["20", "40", ""]));

        let enricher = Enricher::default();
        enricher.apply(&mut data, DEFAULT_ITEM_COLUMN, &result).unwrap();
        let first = data.clone();
        enricher.apply(&mut data, DEFAULT_ITEM_COLUMN, &result).unwrap();

        assert_eq!(first, data);
    }

    #[test]
    fn test_identifiers_are_unique() {
        let data = dataset(&[Some("B"), Some("A"), Some("B"), None]);
        let ids = Enricher::identifiers(&data, DEFAULT_ITEM_COLUMN).unwrap();
        assert_eq!(ids, vec!["B".to_string(), "A".to_string()]);
    }
}
