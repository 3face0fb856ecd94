//! Outcome of resolving a query or a position to a city record

use serde::{Deserialize, Serialize};

use super::city::{CityRecord, WaterStatus};

/// Which step of the resolution ladder produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Query equals a city name
    CityName,
    /// Query is part of a sample point name
    SamplePoint,
    /// The resolver collaborator named a known city
    Inferred,
    /// Previously selected city re-used
    PriorSelection,
    /// Nothing matched; a placeholder record was synthesized
    Placeholder,
    /// Nearest city to a reported position
    Nearest,
    /// Chosen directly from the city selector or a suggestion
    Selected,
}

/// The record chosen for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub city: CityRecord,
    /// Kilometres to the city; 0 unless the match came from a position
    pub distance_km: f64,
    /// True when the record was taken directly from the dataset
    pub is_exact_match: bool,
}

impl ResolutionResult {
    #[must_use]
    pub fn exact(city: CityRecord) -> Self {
        Self {
            city,
            distance_km: 0.0,
            is_exact_match: true,
        }
    }

    #[must_use]
    pub fn approximate(city: CityRecord) -> Self {
        Self {
            city,
            distance_km: 0.0,
            is_exact_match: false,
        }
    }

    /// Badge text for the status card
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        self.city.status.label()
    }

    /// Note explaining why the shown city may not be where the user asked about
    #[must_use]
    pub fn disclaimer(&self) -> Option<String> {
        if self.is_exact_match || self.city.status == WaterStatus::Unknown {
            return None;
        }

        if self.distance_km > 0.0 {
            Some(format!(
                "Nearest monitored city ({:.1} km)",
                self.distance_km
            ))
        } else {
            Some(format!("Showing general city data for {}", self.city.name))
        }
    }
}

/// Full pipeline output: what to show, what to ask the analyst, what to remember
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub result: ResolutionResult,
    pub strategy: MatchStrategy,
    /// Label to request a live analysis for
    pub live_query: String,
    /// Selected city after this resolution
    pub selection: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disclaimer_variants() {
        let exact = ResolutionResult::exact(CityRecord::placeholder("Chitral"));
        assert!(exact.disclaimer().is_none());
        assert_eq!(exact.status_label(), "UNKNOWN");

        let mut city = CityRecord::placeholder("Multan");
        city.status = WaterStatus::Unsafe;

        let inferred = ResolutionResult::approximate(city.clone());
        assert_eq!(
            inferred.disclaimer().as_deref(),
            Some("Showing general city data for Multan")
        );

        let nearest = ResolutionResult {
            city,
            distance_km: 42.07,
            is_exact_match: false,
        };
        assert_eq!(
            nearest.disclaimer().as_deref(),
            Some("Nearest monitored city (42.1 km)")
        );
    }

    #[test]
    fn test_unknown_never_gets_disclaimer() {
        let result = ResolutionResult::approximate(CityRecord::placeholder("Skardu"));
        assert!(result.disclaimer().is_none());
    }
}
