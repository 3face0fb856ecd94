//! Live analysis fetching and the generation counter
//!
//! Every user action that changes the displayed location starts a new
//! analysis generation. Fetches run in the background and may finish in any
//! order; only the fetch belonging to the latest generation is allowed to
//! update what the user sees.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::ai::WaterIntelligence;
use crate::models::AnalysisResult;

/// Label sent to the analyst, scoped to Pakistan.
#[must_use]
pub fn search_context(label: &str) -> String {
    if label.to_lowercase().contains("pakistan") {
        label.to_string()
    } else {
        format!("{label}, Pakistan")
    }
}

/// Result of one live analysis request
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Ready(AnalysisResult),
    Unavailable,
}

/// Ask the collaborator for a summary of `label`. Never fails; every
/// problem is reported as [`AnalysisOutcome::Unavailable`].
pub async fn fetch_analysis(intelligence: &dyn WaterIntelligence, label: &str) -> AnalysisOutcome {
    let context = search_context(label);
    debug!("Requesting live analysis for '{}'", context);

    match intelligence.analyze(&context).await {
        Ok(Some(result)) if !result.text.trim().is_empty() => AnalysisOutcome::Ready(result),
        Ok(_) => {
            info!("No live analysis available for '{}'", context);
            AnalysisOutcome::Unavailable
        }
        Err(e) => {
            error!(error = %e, "Live analysis failed for '{}'", context);
            AnalysisOutcome::Unavailable
        }
    }
}

/// State of the analysis slot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisSlot {
    Idle,
    Loading { label: String },
    Ready { label: String, result: AnalysisResult },
    Unavailable { label: String },
}

/// Proof of which generation a fetch belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTicket {
    pub generation: u64,
    pub label: String,
}

/// Point-in-time view of the analysis slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub generation: u64,
    #[serde(flatten)]
    pub slot: AnalysisSlot,
    /// When the current result was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct TrackerState {
    latest: u64,
    slot: AnalysisSlot,
    completed_at: Option<DateTime<Utc>>,
}

/// Latest-wins holder for the live analysis
#[derive(Debug)]
pub struct AnalysisTracker {
    state: Mutex<TrackerState>,
}

impl Default for AnalysisTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                latest: 0,
                slot: AnalysisSlot::Idle,
                completed_at: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the slot as loading for an action that started at `generation`.
    ///
    /// Returns `None` when a newer action has been started since, in which
    /// case the slot is left alone.
    pub fn begin_if_current(&self, generation: u64, label: &str) -> Option<AnalysisTicket> {
        let mut state = self.lock();
        if generation != state.latest {
            debug!(
                stale = generation,
                latest = state.latest,
                "Not starting analysis for superseded '{}'",
                label
            );
            return None;
        }

        state.slot = AnalysisSlot::Loading {
            label: label.to_string(),
        };
        state.completed_at = None;
        debug!(generation, "Analysis started for '{}'", label);

        Some(AnalysisTicket {
            generation,
            label: label.to_string(),
        })
    }

    /// Apply a finished fetch. Returns `false` when a newer generation has
    /// been issued since the ticket was handed out.
    pub fn complete(&self, ticket: &AnalysisTicket, outcome: AnalysisOutcome) -> bool {
        let mut state = self.lock();
        if ticket.generation != state.latest {
            debug!(
                stale = ticket.generation,
                latest = state.latest,
                "Dropping stale analysis for '{}'",
                ticket.label
            );
            return false;
        }

        let label = ticket.label.clone();
        state.slot = match outcome {
            AnalysisOutcome::Ready(result) => AnalysisSlot::Ready { label, result },
            AnalysisOutcome::Unavailable => AnalysisSlot::Unavailable { label },
        };
        state.completed_at = Some(Utc::now());
        true
    }

    /// Start a new action: invalidate any in-flight fetch, clear the slot
    /// and return the action's generation
    pub fn reset(&self) -> u64 {
        let mut state = self.lock();
        state.latest += 1;
        state.slot = AnalysisSlot::Idle;
        state.completed_at = None;
        state.latest
    }

    #[must_use]
    pub fn snapshot(&self) -> AnalysisSnapshot {
        let state = self.lock();
        AnalysisSnapshot {
            generation: state.latest,
            slot: state.slot.clone(),
            completed_at: state.completed_at,
        }
    }
}
