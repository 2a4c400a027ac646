pub mod enricher;
pub mod etl;
pub mod lookup;
pub mod pipeline;

pub use crate::domain::model::{Dataset, LookupResult, RunSummary};
pub use crate::domain::ports::{
    ArticleLookup, ConfigProvider, EnrichedDataset, Pipeline, SalesSession, SalesSource, Storage,
};
pub use crate::utils::error::Result;
