//! User session: the selected city and the live analysis slot
//!
//! Each action resolves a location, stores the next selection and starts a
//! background analysis fetch for the resolved label. The caller gets the
//! resolution back immediately; the analysis lands in the tracker later.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::info;

use crate::ai::WaterIntelligence;
use crate::analysis::{AnalysisSnapshot, AnalysisTracker, fetch_analysis};
use crate::dataset::{CityDataset, MAX_SUGGESTIONS, Suggestion, SuggestionKind};
use crate::models::{CityRecord, MatchStrategy, Resolution, ResolutionResult};
use crate::resolver::ResolutionPipeline;
use crate::{Result, VolumaticError};

/// Message shown when the browser refuses to share a position
pub const LOCATION_DENIED_MESSAGE: &str = "Location access denied. Please select a city manually.";

/// What the geolocation provider reported
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeolocationFix {
    Coordinates { latitude: f64, longitude: f64 },
    Denied,
}

/// Result of a user action
#[derive(Debug)]
pub struct ActionOutcome {
    pub resolution: Resolution,
    /// Generation issued when the action started
    pub analysis_generation: u64,
    /// Selection in effect after the action
    pub selected_city: Option<String>,
    /// Background fetch, resolving to whether its result was applied.
    /// `None` when a newer action started before this one finished.
    pub analysis_task: Option<JoinHandle<bool>>,
}

pub struct Session {
    dataset: Arc<CityDataset>,
    pipeline: ResolutionPipeline,
    intelligence: Arc<dyn WaterIntelligence>,
    selected: Mutex<Option<String>>,
    analysis: Arc<AnalysisTracker>,
}

impl Session {
    #[must_use]
    pub fn new(
        dataset: Arc<CityDataset>,
        intelligence: Arc<dyn WaterIntelligence>,
        exact_match_radius_km: f64,
    ) -> Self {
        let pipeline = ResolutionPipeline::new(
            Arc::clone(&dataset),
            Arc::clone(&intelligence),
            exact_match_radius_km,
        );

        Self {
            dataset,
            pipeline,
            intelligence,
            selected: Mutex::new(None),
            analysis: Arc::new(AnalysisTracker::new()),
        }
    }

    fn selection(&self) -> MutexGuard<'_, Option<String>> {
        self.selected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn selected_city(&self) -> Option<String> {
        self.selection().clone()
    }

    /// Free-text search.
    ///
    /// # Errors
    ///
    /// Blank input is rejected before anything changes.
    pub async fn search(&self, query: &str) -> Result<ActionOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(VolumaticError::validation("Please enter a location to search"));
        }

        info!("Searching for '{}'", query);
        let generation = self.analysis.reset();

        let prior = self.selected_city();
        let resolution = self.pipeline.resolve(query, prior.as_deref()).await;
        Ok(self.apply(generation, resolution))
    }

    /// Pick a city from the selector.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for names outside the dataset.
    pub fn select_city(&self, name: &str) -> Result<ActionOutcome> {
        let city = self.known_city(name)?;
        info!("Selected city {}", city.name);
        let generation = self.analysis.reset();

        let resolution = Resolution {
            result: ResolutionResult::exact(city.clone()),
            strategy: MatchStrategy::Selected,
            live_query: city.name.clone(),
            selection: Some(city.name.clone()),
        };
        Ok(self.apply(generation, resolution))
    }

    /// Pick an entry from the as-you-type list.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the city or area is not in the dataset.
    pub fn select_suggestion(&self, suggestion: &Suggestion) -> Result<ActionOutcome> {
        match suggestion.kind {
            SuggestionKind::City => self.select_city(&suggestion.name),
            SuggestionKind::Area => {
                let parent = suggestion.parent_city.as_deref().ok_or_else(|| {
                    VolumaticError::validation("Area suggestions must name their city")
                })?;
                let city = self.known_city(parent)?;
                let area = city
                    .sample_points
                    .iter()
                    .find(|point| point.name.eq_ignore_ascii_case(&suggestion.name))
                    .ok_or_else(|| {
                        VolumaticError::not_found(format!(
                            "Unknown area in {}: {}",
                            city.name, suggestion.name
                        ))
                    })?;

                info!("Selected area '{}' in {}", area.name, city.name);
                let generation = self.analysis.reset();

                let resolution = Resolution {
                    result: ResolutionResult::exact(city.clone()),
                    strategy: MatchStrategy::Selected,
                    live_query: format!("{} in {}", area.name, city.name),
                    selection: Some(city.name.clone()),
                };
                Ok(self.apply(generation, resolution))
            }
        }
    }

    /// Use a position from the geolocation provider.
    ///
    /// # Errors
    ///
    /// A denial clears the selection and analysis, then returns
    /// [`VolumaticError::GeolocationDenied`]. Out-of-range coordinates are a
    /// validation error.
    pub fn locate(&self, fix: GeolocationFix) -> Result<ActionOutcome> {
        match fix {
            GeolocationFix::Denied => {
                info!("Geolocation denied");
                let mut selected = self.selection();
                self.analysis.reset();
                *selected = None;
                Err(VolumaticError::geolocation_denied(LOCATION_DENIED_MESSAGE))
            }
            GeolocationFix::Coordinates {
                latitude,
                longitude,
            } => {
                let resolution = self.pipeline.locate(latitude, longitude)?;
                info!(
                    "Located near {} ({:.1} km)",
                    resolution.result.city.name, resolution.result.distance_km
                );
                let generation = self.analysis.reset();
                Ok(self.apply(generation, resolution))
            }
        }
    }

    /// As-you-type suggestions for partial input
    #[must_use]
    pub fn suggest(&self, input: &str) -> Vec<Suggestion> {
        self.dataset.suggestions(input, MAX_SUGGESTIONS)
    }

    #[must_use]
    pub fn analysis(&self) -> AnalysisSnapshot {
        self.analysis.snapshot()
    }

    /// Cities offered by the selector, in dataset order
    #[must_use]
    pub fn cities(&self) -> &[CityRecord] {
        self.dataset.cities()
    }

    fn known_city(&self, name: &str) -> Result<&CityRecord> {
        self.dataset
            .find_by_name(name.trim())
            .ok_or_else(|| VolumaticError::not_found(format!("Unknown city: {}", name.trim())))
    }

    /// Store the next selection and start the live analysis, unless an
    /// action newer than `generation` has started meanwhile.
    fn apply(&self, generation: u64, resolution: Resolution) -> ActionOutcome {
        // Selection is locked before the tracker everywhere
        let mut selected = self.selection();
        let Some(ticket) = self
            .analysis
            .begin_if_current(generation, &resolution.live_query)
        else {
            info!("'{}' was superseded by a newer action", resolution.live_query);
            return ActionOutcome {
                selected_city: selected.clone(),
                resolution,
                analysis_generation: generation,
                analysis_task: None,
            };
        };
        selected.clone_from(&resolution.selection);
        drop(selected);

        let tracker = Arc::clone(&self.analysis);
        let intelligence = Arc::clone(&self.intelligence);
        let analysis_task = tokio::spawn(async move {
            let outcome = fetch_analysis(intelligence.as_ref(), &ticket.label).await;
            tracker.complete(&ticket, outcome)
        });

        ActionOutcome {
            selected_city: resolution.selection.clone(),
            resolution,
            analysis_generation: generation,
            analysis_task: Some(analysis_task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::CannedIntelligence;
    use crate::analysis::AnalysisSlot;
    use crate::models::AnalysisResult;
    use std::time::Duration;

    fn session(ai: CannedIntelligence) -> (Session, Arc<CannedIntelligence>) {
        let ai = Arc::new(ai);
        let dataset = Arc::new(CityDataset::bundled().unwrap());
        let intelligence: Arc<dyn WaterIntelligence> = ai.clone();
        (Session::new(dataset, intelligence, 20.0), ai)
    }

    #[tokio::test]
    async fn test_search_dispatches_analysis() {
        let summary = AnalysisResult::new("Arsenic above limits.", vec![]);
        let (session, ai) = session(
            CannedIntelligence::new()
                .with_city_reply("Multan")
                .with_analysis(summary.clone()),
        );

        let outcome = session.search("  BZU ").await.unwrap();
        assert_eq!(outcome.resolution.live_query, "BZU in Multan");
        assert_eq!(outcome.selected_city.as_deref(), Some("Multan"));
        assert!(outcome.analysis_task.unwrap().await.unwrap());

        assert_eq!(ai.analyzed_labels(), vec!["BZU in Multan, Pakistan".to_string()]);
        let snapshot = session.analysis();
        assert_eq!(snapshot.generation, outcome.analysis_generation);
        assert_eq!(
            snapshot.slot,
            AnalysisSlot::Ready {
                label: "BZU in Multan".to_string(),
                result: summary
            }
        );
    }

    #[tokio::test]
    async fn test_empty_search_changes_nothing() {
        let (session, ai) = session(CannedIntelligence::new());
        session.select_city("Quetta").unwrap().analysis_task.unwrap().await.unwrap();
        let before = session.analysis();

        let err = session.search("   ").await.unwrap_err();
        assert!(matches!(err, VolumaticError::Validation { .. }));
        assert_eq!(session.selected_city().as_deref(), Some("Quetta"));
        assert_eq!(session.analysis(), before);
        assert!(ai.resolve_queries().is_empty());
    }

    #[tokio::test]
    async fn test_selection_threads_through_searches() {
        let (session, ai) = session(CannedIntelligence::new());

        session.search("Peshawar").await.unwrap();
        let outcome = session.search("Askari 11").await.unwrap();

        assert_eq!(outcome.resolution.result.city.name, "Peshawar");
        assert_eq!(outcome.resolution.strategy, MatchStrategy::PriorSelection);
        assert_eq!(ai.resolve_queries(), vec!["Askari 11 in Peshawar".to_string()]);
    }

    #[tokio::test]
    async fn test_newer_action_wins_over_older_fetch() {
        let (session, _) = session(CannedIntelligence::new());

        let first = session.search("Lahore").await.unwrap();
        let second = session.search("Karachi").await.unwrap();
        assert!(second.analysis_generation > first.analysis_generation);

        assert!(!first.analysis_task.unwrap().await.unwrap());
        assert!(second.analysis_task.unwrap().await.unwrap());
        assert_eq!(
            session.analysis().slot,
            AnalysisSlot::Unavailable {
                label: "Karachi".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_slow_search_does_not_override_newer_action() {
        let (session, _) = session(
            CannedIntelligence::new()
                .with_city_reply("Multan")
                .with_resolve_delay(Duration::from_millis(100)),
        );
        let session = Arc::new(session);

        let older = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.search("BZU").await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let newer = session.search("Lahore").await.unwrap();
        let older = older.await.unwrap().unwrap();

        assert!(older.analysis_generation < newer.analysis_generation);
        assert!(older.analysis_task.is_none());
        assert_eq!(older.selected_city.as_deref(), Some("Lahore"));

        assert!(newer.analysis_task.unwrap().await.unwrap());
        assert_eq!(session.selected_city().as_deref(), Some("Lahore"));
        let snapshot = session.analysis();
        assert_eq!(snapshot.generation, newer.analysis_generation);
        assert_eq!(
            snapshot.slot,
            AnalysisSlot::Unavailable {
                label: "Lahore".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_select_unknown_city() {
        let (session, _) = session(CannedIntelligence::new());
        let err = session.select_city("Atlantis").unwrap_err();
        assert!(matches!(err, VolumaticError::NotFound { .. }));
        assert!(session.selected_city().is_none());
    }

    #[tokio::test]
    async fn test_select_area_suggestion() {
        let (session, _) = session(CannedIntelligence::new());
        let suggestion = session
            .suggest("zakaria university")
            .into_iter()
            .find(|s| s.kind == SuggestionKind::Area)
            .unwrap();

        let outcome = session.select_suggestion(&suggestion).unwrap();
        assert_eq!(outcome.resolution.result.city.name, "Multan");
        assert!(outcome.resolution.result.is_exact_match);
        assert_eq!(
            outcome.resolution.live_query,
            format!("{} in Multan", suggestion.name)
        );
        assert_eq!(session.selected_city().as_deref(), Some("Multan"));
    }

    #[tokio::test]
    async fn test_denied_location_clears_selection() {
        let (session, _) = session(CannedIntelligence::new());
        session.select_city("Lahore").unwrap();

        let err = session.locate(GeolocationFix::Denied).unwrap_err();
        assert_eq!(err.user_message(), LOCATION_DENIED_MESSAGE);
        assert!(session.selected_city().is_none());
        assert_eq!(session.analysis().slot, AnalysisSlot::Idle);
    }

    #[tokio::test]
    async fn test_locate_far_away_clears_selection() {
        let (session, _) = session(CannedIntelligence::new());
        session.select_city("Lahore").unwrap();

        let outcome = session
            .locate(GeolocationFix::Coordinates {
                latitude: 35.85,
                longitude: 71.79,
            })
            .unwrap();
        assert!(!outcome.resolution.result.is_exact_match);
        assert!(session.selected_city().is_none());
        assert_eq!(outcome.resolution.live_query, outcome.resolution.result.city.name);
    }
}
