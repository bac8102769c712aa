//! Core business logic abstractions

pub mod analytics;
pub mod analyzer;
pub mod config;
pub mod log;
pub mod model;

// Re-export main types for cleaner imports
pub use analytics::Dashboard;
pub use analyzer::{IngestError, IngestionOutcome, StatementAnalyzer, StatementFile};
pub use model::{AnalysisRecord, MerchantInsights, Transaction, TransactionType};
