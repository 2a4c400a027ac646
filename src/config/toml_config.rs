use crate::adapters::sqlite::DEFAULT_TABLE;
use crate::adapters::storage::extension;
use crate::core::enricher::DEFAULT_ITEM_COLUMN;
use crate::core::ConfigProvider;
use crate::domain::categories::CategoryMap;
use crate::domain::model::{DateWindow, MatchStrategy};
use crate::domain::recipe::{ExclusionPolicy, RecipeRules, DEFAULT_MARKER};
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Run configuration. Every section is optional; the CLI fills in or
/// overrides whatever the file leaves out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub dataset: DatasetConfig,
    pub source: SourceConfig,
    pub window: Option<WindowConfig>,
    pub matching: MatchingConfig,
    pub recipe: RecipeConfig,
    pub categories: CategoriesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub input: Option<String>,
    pub output: Option<String>,
    pub item_column: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub database: Option<String>,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub strategy: Option<MatchStrategy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    pub marker: Option<String>,
    pub exclusion_policy: Option<ExclusionPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoriesConfig {
    pub fallback: Option<String>,
    /// Extra or overriding material code → category entries.
    pub mapping: HashMap<String, String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EnrichError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${SALES_DB})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EnrichError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn database_path(&self) -> Option<&str> {
        self.source.database.as_deref()
    }

    pub fn table(&self) -> &str {
        self.source.table.as_deref().unwrap_or(DEFAULT_TABLE)
    }

    /// `<stem>_enriched.<ext>` next to the input file, in the input's format.
    pub fn suggested_output(input: &str) -> String {
        let path = Path::new(input);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let ext = match extension(path).as_str() {
            "xlsx" => "xlsx",
            _ => "csv",
        };
        let file_name = format!("{}_enriched.{}", stem, ext);
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                parent.join(file_name).to_string_lossy().to_string()
            }
            _ => file_name,
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let input = validation::validate_required_field("dataset.input", &self.dataset.input)?;
        validation::validate_path("dataset.input", input)?;
        validation::validate_file_extension("dataset.input", input, &["csv", "xlsx"])?;

        let output = self.output_path();
        validation::validate_path("dataset.output", &output)?;
        validation::validate_file_extension("dataset.output", &output, &["csv", "xlsx"])?;

        validation::validate_non_empty_string("dataset.item_column", self.item_column())?;

        let database = validation::validate_required_field("source.database", &self.source.database)?;
        validation::validate_path("source.database", database)?;
        validation::validate_sql_identifier("source.table", self.table())?;

        validation::validate_date_window("window", &self.date_window())?;

        if let Some(marker) = &self.recipe.marker {
            validation::validate_non_empty_string("recipe.marker", marker)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        self.dataset.input.as_deref().unwrap_or("")
    }

    fn output_path(&self) -> String {
        self.dataset
            .output
            .clone()
            .unwrap_or_else(|| Self::suggested_output(self.input_path()))
    }

    fn item_column(&self) -> &str {
        self.dataset
            .item_column
            .as_deref()
            .unwrap_or(DEFAULT_ITEM_COLUMN)
    }

    fn date_window(&self) -> DateWindow {
        self.window
            .as_ref()
            .map(|w| DateWindow::new(w.start, w.end))
            .unwrap_or_default()
    }

    fn match_strategy(&self) -> MatchStrategy {
        self.matching.strategy.unwrap_or_default()
    }

    fn recipe_rules(&self) -> RecipeRules {
        RecipeRules {
            marker: self
                .recipe
                .marker
                .clone()
                .unwrap_or_else(|| DEFAULT_MARKER.to_string()),
            policy: self.recipe.exclusion_policy.unwrap_or_default(),
        }
    }

    fn category_map(&self) -> CategoryMap {
        let mut map = CategoryMap::default();
        if let Some(fallback) = &self.categories.fallback {
            map.set_fallback(fallback.clone());
        }
        map.extend(self.categories.mapping.iter());
        map
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_CONFIG: &str = r#"
[dataset]
input = "data/purchases.xlsx"
output = "data/purchases_out.csv"
item_column = "Item"

[source]
database = "sales.db"
table = "ZO_ARCHIVE"

[window]
start = "2024-01-01"
end = "2024-12-31"

[matching]
strategy = "exact"

[recipe]
marker = "-evoh"
exclusion_policy = "drop"

[categories]
fallback = "Unclassified"

[categories.mapping]
PAPER = "Paper"
"#;

    #[test]
    fn test_parse_full_toml_config() {
        let config = TomlConfig::from_toml_str(FULL_CONFIG).unwrap();

        assert_eq!(config.input_path(), "data/purchases.xlsx");
        assert_eq!(config.output_path(), "data/purchases_out.csv");
        assert_eq!(config.item_column(), "Item");
        assert_eq!(config.table(), "ZO_ARCHIVE");
        assert_eq!(config.match_strategy(), MatchStrategy::Exact);
        assert_eq!(config.recipe_rules().policy, ExclusionPolicy::Drop);
        assert_eq!(
            config.date_window().start,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );

        let categories = config.category_map();
        assert_eq!(categories.category_for("paper"), "Paper");
        assert_eq!(categories.category_for("XYZ"), "Unclassified");
        assert!(categories.category_for("PE").starts_with("4-LDPE"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = TomlConfig::from_toml_str(
            r#"
[dataset]
input = "in.csv"

[source]
database = "sales.db"
"#,
        )
        .unwrap();

        assert_eq!(config.item_column(), DEFAULT_ITEM_COLUMN);
        assert_eq!(config.output_path(), "in_enriched.csv");
        assert_eq!(config.table(), DEFAULT_TABLE);
        assert_eq!(config.date_window(), DateWindow::default());
        assert_eq!(config.match_strategy(), MatchStrategy::Contains);
        assert_eq!(config.recipe_rules(), RecipeRules::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_SALES_DB", "/srv/sales.db");

        let config = TomlConfig::from_toml_str(
            r#"
[source]
database = "${TEST_SALES_DB}"
"#,
        )
        .unwrap();
        assert_eq!(config.database_path(), Some("/srv/sales.db"));

        std::env::remove_var("TEST_SALES_DB");
    }

    #[test]
    fn test_config_validation() {
        let missing_db = TomlConfig::from_toml_str("[dataset]\ninput = \"in.csv\"\n").unwrap();
        assert!(matches!(
            missing_db.validate(),
            Err(EnrichError::MissingConfigError { .. })
        ));

        let inverted = TomlConfig::from_toml_str(
            r#"
[dataset]
input = "in.csv"

[source]
database = "sales.db"

[window]
start = "2025-01-01"
end = "2024-01-01"
"#,
        )
        .unwrap();
        assert!(inverted.validate().is_err());

        let text_output = TomlConfig::from_toml_str(
            r#"
[dataset]
input = "in.csv"
output = "out.txt"

[source]
database = "sales.db"
"#,
        )
        .unwrap();
        assert!(text_output.validate().is_err());
    }

    #[test]
    fn test_xlsx_output_may_overwrite_input() {
        let config = TomlConfig::from_toml_str(
            r#"
[dataset]
input = "purchases.xlsx"
output = "purchases.xlsx"

[source]
database = "sales.db"
"#,
        )
        .unwrap();

        assert_eq!(config.output_path(), config.input_path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(FULL_CONFIG.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.database_path(), Some("sales.db"));
    }

    #[test]
    fn test_suggested_output() {
        assert_eq!(
            TomlConfig::suggested_output("reports/q4.xlsx"),
            Path::new("reports").join("q4_enriched.xlsx").to_string_lossy()
        );
        assert_eq!(TomlConfig::suggested_output("Q4.XLSX"), "Q4_enriched.xlsx");
        assert_eq!(TomlConfig::suggested_output("q4.csv"), "q4_enriched.csv");
    }
}
