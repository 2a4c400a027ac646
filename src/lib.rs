pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{LocalStorage, SqliteSalesSource};
pub use core::{
    enricher::Enricher, etl::EnrichmentEngine, lookup::LookupRepository,
    pipeline::EnrichmentPipeline,
};
pub use domain::categories::CategoryMap;
pub use domain::model::{ArticleRecord, Dataset, DateWindow, MatchStrategy, SaleReference};
pub use domain::recipe::{ExclusionPolicy, LayerBreakdown, MaterialLayer, RecipeRules};
pub use utils::error::{EnrichError, Result};
