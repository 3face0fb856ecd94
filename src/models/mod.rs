//! Data models for the Volumatic application
//!
//! This module contains the core domain models organized by concern:
//! - City: bundled water-quality records and sample points
//! - Analysis: live summaries and their citations
//! - Resolution: which record a query or position resolved to

pub mod analysis;
pub mod city;
pub mod resolution;

// Re-export all public types for convenient access
pub use analysis::{AnalysisResult, Source};
pub use city::{CityRecord, PointStatus, SamplePoint, WaterStatus};
pub use resolution::{MatchStrategy, Resolution, ResolutionResult};
