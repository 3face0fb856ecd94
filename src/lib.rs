//! `Volumatic` - Drinking-water quality lookup for Pakistani cities
//!
//! This library resolves free-text queries and device positions to monitored
//! cities, and fetches a live, source-backed water-safety summary for the
//! resolved location.

pub mod ai;
pub mod analysis;
pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod session;
pub mod web;

// Re-export core types for public API
pub use ai::{AiError, CannedIntelligence, DisabledIntelligence, GeminiClient, WaterIntelligence};
pub use analysis::{AnalysisOutcome, AnalysisSnapshot, AnalysisTracker, fetch_analysis};
pub use config::VolumaticConfig;
pub use dataset::{CityDataset, Suggestion, SuggestionKind};
pub use error::VolumaticError;
pub use models::{AnalysisResult, CityRecord, MatchStrategy, Resolution, ResolutionResult, WaterStatus};
pub use resolver::ResolutionPipeline;
pub use session::{GeolocationFix, Session};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, VolumaticError>;
