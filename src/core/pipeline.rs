use crate::core::enricher::Enricher;
use crate::core::{ArticleLookup, ConfigProvider, Dataset, EnrichedDataset, Pipeline, Storage};
use crate::utils::error::{EnrichError, Result};
use std::sync::Arc;

/// Load a spreadsheet, resolve its item identifiers, write the enriched copy.
pub struct EnrichmentPipeline<S: Storage, C: ConfigProvider, L: ArticleLookup + 'static> {
    storage: S,
    config: C,
    lookup: Arc<L>,
    enricher: Enricher,
}

impl<S: Storage, C: ConfigProvider, L: ArticleLookup + 'static> EnrichmentPipeline<S, C, L> {
    pub fn new(storage: S, config: C, lookup: L) -> Self {
        let enricher = Enricher::new(config.recipe_rules(), config.category_map());
        Self {
            storage,
            config,
            lookup: Arc::new(lookup),
            enricher,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, L: ArticleLookup + 'static> Pipeline
    for EnrichmentPipeline<S, C, L>
{
    async fn extract(&self) -> Result<Dataset> {
        let input = self.config.input_path();
        tracing::debug!("Reading dataset from: {}", input);
        let dataset = self.storage.read_dataset(input).await?;

        let column = self.config.item_column();
        if dataset.column_index(column).is_none() {
            return Err(EnrichError::MissingColumnError {
                column: column.to_string(),
            });
        }

        Ok(dataset)
    }

    async fn transform(&self, mut data: Dataset) -> Result<EnrichedDataset> {
        let column = self.config.item_column();
        let identifiers = Enricher::identifiers(&data, column)?;
        tracing::info!("🔑 {} unique identifiers in '{}'", identifiers.len(), column);

        // 查詢在背景執行緒完成後才開始寫入欄位
        let lookup = Arc::clone(&self.lookup);
        let result = tokio::task::spawn_blocking(move || lookup.resolve(&identifiers)).await??;

        let summary = self.enricher.apply(&mut data, column, &result)?;
        Ok(EnrichedDataset {
            dataset: data,
            summary,
        })
    }

    async fn load(&self, result: EnrichedDataset) -> Result<String> {
        let output_path = self.config.output_path();
        tracing::debug!(
            "Writing {} rows with {} columns",
            result.dataset.len(),
            result.dataset.headers.len()
        );
        self.storage
            .write_dataset(&output_path, &result.dataset)
            .await?;
        Ok(output_path)
    }
}
