use crate::config::toml_config::{TomlConfig, WindowConfig};
use crate::domain::model::{DateWindow, MatchStrategy};
use crate::domain::recipe::ExclusionPolicy;
use crate::utils::error::Result;
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "article-enricher")]
#[command(about = "Enrich purchase spreadsheets with article data and material layer breakdowns")]
pub struct CliConfig {
    /// Input spreadsheet (.csv or .xlsx)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output file, .csv or .xlsx; may equal the input (default: <input>_enriched.<ext>)
    #[arg(short, long)]
    pub output: Option<String>,

    /// SQLite database holding the sales table
    #[arg(long, env = "ARTICLE_ENRICHER_DB")]
    pub database: Option<String>,

    /// Sales table name
    #[arg(long)]
    pub table: Option<String>,

    /// Header of the column holding item identifiers
    #[arg(long)]
    pub item_column: Option<String>,

    /// First day of the reporting window (YYYY-MM-DD)
    #[arg(long)]
    pub date_start: Option<NaiveDate>,

    /// Last day of the reporting window (YYYY-MM-DD)
    #[arg(long)]
    pub date_end: Option<NaiveDate>,

    #[arg(long, value_enum)]
    pub match_strategy: Option<MatchStrategy>,

    #[arg(long, value_enum)]
    pub exclusion_policy: Option<ExclusionPolicy>,

    /// Marker substring handled by the exclusion policy
    #[arg(long)]
    pub marker: Option<String>,

    /// TOML configuration file; command line flags take precedence
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub log_json: bool,

    #[arg(long, help = "Load and validate everything without querying the database")]
    pub dry_run: bool,
}

impl CliConfig {
    /// Loads the optional TOML file and applies command line overrides on top.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(input) = &self.input {
            config.dataset.input = Some(input.clone());
        }
        if let Some(output) = &self.output {
            config.dataset.output = Some(output.clone());
        }
        if let Some(column) = &self.item_column {
            config.dataset.item_column = Some(column.clone());
        }
        if let Some(database) = &self.database {
            config.source.database = Some(database.clone());
        }
        if let Some(table) = &self.table {
            config.source.table = Some(table.clone());
        }
        if self.date_start.is_some() || self.date_end.is_some() {
            let current = config
                .window
                .as_ref()
                .map(|w| DateWindow::new(w.start, w.end))
                .unwrap_or_default();
            config.window = Some(WindowConfig {
                start: self.date_start.unwrap_or(current.start),
                end: self.date_end.unwrap_or(current.end),
            });
        }
        if let Some(strategy) = self.match_strategy {
            config.matching.strategy = Some(strategy);
        }
        if let Some(policy) = self.exclusion_policy {
            config.recipe.exclusion_policy = Some(policy);
        }
        if let Some(marker) = &self.marker {
            config.recipe.marker = Some(marker.clone());
        }
    }
}
