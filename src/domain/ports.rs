use crate::domain::categories::CategoryMap;
use crate::domain::model::{
    Dataset, DateWindow, HistoryRow, LookupResult, MatchStrategy, RunSummary, WindowRow,
};
use crate::domain::recipe::RecipeRules;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait Storage: Send + Sync {
    fn read_dataset(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Dataset>> + Send;
    fn write_dataset(
        &self,
        path: &str,
        dataset: &Dataset,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> String;
    fn item_column(&self) -> &str;
    fn date_window(&self) -> DateWindow;
    fn match_strategy(&self) -> MatchStrategy;
    fn recipe_rules(&self) -> RecipeRules;
    fn category_map(&self) -> CategoryMap;
}

/// A source of sales transactions. Each session owns one connection and
/// releases it when dropped.
pub trait SalesSource: Send + Sync {
    type Session: SalesSession;

    fn open_session(&self) -> Result<Self::Session>;
}

pub trait SalesSession {
    /// One aggregated row per stored key sold inside `window`.
    fn query_in_window(
        &mut self,
        identifiers: &[String],
        strategy: MatchStrategy,
        window: &DateWindow,
    ) -> Result<Vec<WindowRow>>;

    /// Latest sale strictly before `cutoff`, one row per stored key.
    fn query_before(
        &mut self,
        identifiers: &[String],
        strategy: MatchStrategy,
        cutoff: NaiveDate,
    ) -> Result<Vec<HistoryRow>>;
}

/// Resolves requested identifiers to article records.
pub trait ArticleLookup: Send + Sync {
    fn resolve(&self, identifiers: &[String]) -> Result<LookupResult>;
}

#[derive(Debug, Clone)]
pub struct EnrichedDataset {
    pub dataset: Dataset,
    pub summary: RunSummary,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<EnrichedDataset>;
    async fn load(&self, result: EnrichedDataset) -> Result<String>;
}
