//! Core business logic abstractions

pub mod field;
pub mod log;
pub mod sources;

// Re-export main types for cleaner imports
pub use field::{FieldValue, Fields};
pub use sources::{
    DistributionRecord, DistributionSource, DistributionTable, ProfileSource, Quote, QuoteSource,
};
