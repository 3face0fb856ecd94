//! Location Resolution Module
//!
//! Turns a free-text query or a reported position into the city record to
//! display. Text queries walk a fixed ladder and the first step that
//! produces a city wins:
//!
//! 1. exact city name
//! 2. substring of a sample point name
//! 3. hosted resolver, validated against the dataset
//! 4. the previously selected city
//! 5. a placeholder record for the raw query

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ai::WaterIntelligence;
use crate::dataset::CityDataset;
use crate::models::{CityRecord, MatchStrategy, Resolution, ResolutionResult};
use crate::{Result, VolumaticError};

/// Service for resolving queries and positions against the dataset
pub struct ResolutionPipeline {
    dataset: Arc<CityDataset>,
    intelligence: Arc<dyn WaterIntelligence>,
    exact_match_radius_km: f64,
}

impl ResolutionPipeline {
    #[must_use]
    pub fn new(
        dataset: Arc<CityDataset>,
        intelligence: Arc<dyn WaterIntelligence>,
        exact_match_radius_km: f64,
    ) -> Self {
        Self {
            dataset,
            intelligence,
            exact_match_radius_km,
        }
    }

    /// Resolve a text query given the current selection.
    ///
    /// Always produces a result; the returned [`Resolution`] also carries the
    /// selection the caller should store afterwards.
    pub async fn resolve(&self, query: &str, prior: Option<&str>) -> Resolution {
        debug!("Resolving query '{}' (selected: {:?})", query, prior);

        if let Some(city) = self.dataset.find_by_name(query) {
            debug!("'{}' is a city name", query);
            return Self::direct(city, MatchStrategy::CityName);
        }

        if let Some(city) = self.dataset.find_by_sample_point(query) {
            debug!("'{}' matches a sample point in {}", query, city.name);
            return Self::direct(city, MatchStrategy::SamplePoint);
        }

        if let Some(city) = self.infer_city(query, prior).await {
            debug!("'{}' inferred to be in {}", query, city.name);
            return Resolution {
                result: ResolutionResult::approximate(city.clone()),
                strategy: MatchStrategy::Inferred,
                live_query: format!("{query} in {}", city.name),
                selection: Some(city.name.clone()),
            };
        }

        if let Some(city) = prior.and_then(|name| self.dataset.find_by_name(name)) {
            debug!("Falling back to selected city {}", city.name);
            return Resolution {
                result: ResolutionResult::approximate(city.clone()),
                strategy: MatchStrategy::PriorSelection,
                live_query: format!("{query} in {}", city.name),
                selection: Some(city.name.clone()),
            };
        }

        debug!("No record for '{}', using placeholder", query);
        Resolution {
            result: ResolutionResult::exact(CityRecord::placeholder(query)),
            strategy: MatchStrategy::Placeholder,
            live_query: query.to_string(),
            selection: prior.map(str::to_string),
        }
    }

    /// Ask the hosted resolver and accept only a reply naming a known city
    async fn infer_city(&self, query: &str, prior: Option<&str>) -> Option<&CityRecord> {
        let context = match prior {
            Some(selected) => format!("{query} in {selected}"),
            None => query.to_string(),
        };
        let names = self.dataset.names();

        let reply = match self.intelligence.resolve_city(&context, &names).await {
            Ok(reply) => reply?,
            Err(e) => {
                warn!(error = %e, "City resolution failed for '{}'", context);
                return None;
            }
        };

        let city = self.dataset.find_by_name(&reply);
        if city.is_none() {
            debug!("Ignoring resolver reply '{}': not a supported city", reply);
        }
        city
    }

    /// Nearest city to a reported position.
    ///
    /// # Errors
    ///
    /// Returns a validation error for coordinates outside the valid ranges.
    pub fn locate(&self, latitude: f64, longitude: f64) -> Result<Resolution> {
        validate_coordinates(latitude, longitude)?;

        let (city, distance_km) = self
            .dataset
            .nearest(latitude, longitude)
            .ok_or_else(|| VolumaticError::dataset("No cities to compare against"))?;
        let is_exact_match = within_radius(distance_km, self.exact_match_radius_km);

        debug!(
            "Nearest city to ({}, {}) is {} at {:.1} km",
            latitude, longitude, city.name, distance_km
        );

        Ok(Resolution {
            result: ResolutionResult {
                city: city.clone(),
                distance_km,
                is_exact_match,
            },
            strategy: MatchStrategy::Nearest,
            live_query: city.name.clone(),
            selection: is_exact_match.then(|| city.name.clone()),
        })
    }

    fn direct(city: &CityRecord, strategy: MatchStrategy) -> Resolution {
        Resolution {
            result: ResolutionResult::exact(city.clone()),
            strategy,
            live_query: city.name.clone(),
            selection: Some(city.name.clone()),
        }
    }
}

/// The boundary distance itself still counts as a match.
#[must_use]
pub fn within_radius(distance_km: f64, radius_km: f64) -> bool {
    distance_km <= radius_km
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(VolumaticError::validation(format!(
            "Latitude must be between -90 and 90, got: {latitude}"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(VolumaticError::validation(format!(
            "Longitude must be between -180 and 180, got: {longitude}"
        )));
    }
    Ok(())
}
