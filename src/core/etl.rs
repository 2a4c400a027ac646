use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output_path: String,
    pub summary: RunSummary,
}

pub struct EnrichmentEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EnrichmentEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Runs extract → transform → load. Nothing is written unless every
    /// earlier phase succeeded.
    pub async fn run(&self) -> Result<RunOutcome> {
        let started = Instant::now();
        tracing::info!("🚀 Starting enrichment run");

        // Extract
        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Loaded {} rows ({} columns) in {:?}",
            dataset.len(),
            dataset.headers.len(),
            started.elapsed()
        );

        // Transform
        let enriched = self.pipeline.transform(dataset).await?;
        let summary = enriched.summary.clone();
        tracing::info!(
            "🧪 Enriched {} of {} rows: {} in-window, {} fallback, {} unmatched identifiers",
            summary.enriched_rows,
            summary.rows,
            summary.in_window_matches,
            summary.fallback_matches,
            summary.unmatched
        );

        // Load
        let output_path = self.pipeline.load(enriched).await?;
        tracing::info!(
            "💾 Output saved to: {} (total {:?})",
            output_path,
            started.elapsed()
        );

        Ok(RunOutcome {
            output_path,
            summary,
        })
    }
}
