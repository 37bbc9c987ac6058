//! `shiptrack-recon`: shipment status reconciliation core.
//!
//! Pure engine crate: classifies scraped carrier statuses, deduplicates
//! import rows and reconciles observed statuses against internal ones.
//! File, sheet and network access live behind the traits in [`pipeline`].

pub mod classify;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod summary;

pub use classify::{classify, KeywordRule, StatusClassifier};
pub use config::RunOptions;
pub use dedup::deduplicate;
pub use engine::{reconcile, ReconciliationEngine};
pub use error::{ReconError, StoreError};
pub use model::{
    CanonicalStatus, DifferencesReport, FetchOutcome, ImportBatch, RawImportRow,
    ReconciliationResult, TrackingRecord,
};
pub use pipeline::{Clock, Pipeline, RecordStore, SourceImporter, SystemClock, TrackingFetcher};
pub use summary::RunSummary;
