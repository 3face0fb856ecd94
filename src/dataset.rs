//! Bundled water-quality dataset
//!
//! The city records ship inside the binary and are parsed once at startup.
//! Lookups here are plain scans in dataset order; the order is significant
//! because the first matching city wins.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::CityRecord;
use crate::{Result, VolumaticError};

const BUNDLED_CITIES: &str = include_str!("../data/cities.json");

/// Upper bound on as-you-type suggestions
pub const MAX_SUGGESTIONS: usize = 6;

/// Kind of entry offered while the user types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestionKind {
    City,
    Area,
}

/// A city or sample point matching partial input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub kind: SuggestionKind,
    /// Owning city for `Area` suggestions
    pub parent_city: Option<String>,
}

/// Read-only set of city records
#[derive(Debug, Clone)]
pub struct CityDataset {
    cities: Vec<CityRecord>,
}

impl CityDataset {
    /// Load the records compiled into the binary
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CITIES)
    }

    /// Parse a JSON array of city records
    pub fn from_json(json: &str) -> Result<Self> {
        let cities: Vec<CityRecord> = serde_json::from_str(json)
            .map_err(|e| VolumaticError::dataset(format!("Invalid city data: {e}")))?;

        if cities.is_empty() {
            return Err(VolumaticError::dataset("City data contains no records"));
        }

        Ok(Self::new(cities))
    }

    #[must_use]
    pub fn new(cities: Vec<CityRecord>) -> Self {
        for city in cities.iter().filter(|c| !c.percentages_consistent()) {
            warn!(
                "City '{}' percentages do not add up: {} safe + {} unsafe",
                city.name, city.safe_percentage, city.unsafe_percentage
            );
        }

        debug!(
            "Loaded {} cities with {} sample points",
            cities.len(),
            cities.iter().map(|c| c.sample_points.len()).sum::<usize>()
        );

        Self { cities }
    }

    #[must_use]
    pub fn cities(&self) -> &[CityRecord] {
        &self.cities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Display names in dataset order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.cities.iter().map(|c| c.name.as_str()).collect()
    }

    /// Case-insensitive exact lookup by display name
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&CityRecord> {
        self.cities.iter().find(|city| city.is_named(name))
    }

    /// First city owning a sample point whose name contains `query`.
    ///
    /// Several cities can own matching points ("dha" hits both Dhamial Road
    /// in Rawalpindi and DHA Phase 1 in Lahore); the earlier city wins.
    #[must_use]
    pub fn find_by_sample_point(&self, query: &str) -> Option<&CityRecord> {
        self.cities
            .iter()
            .find(|city| city.sample_point_containing(query).is_some())
    }

    /// Closest city to a position with its great-circle distance in km
    #[must_use]
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Option<(&CityRecord, f64)> {
        let mut nearest: Option<(&CityRecord, f64)> = None;

        for city in &self.cities {
            let distance = distance_km(latitude, longitude, city.latitude, city.longitude);
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((city, distance)),
            }
        }

        nearest
    }

    /// Cities and sample points containing `input`, at most `limit` entries
    #[must_use]
    pub fn suggestions(&self, input: &str, limit: usize) -> Vec<Suggestion> {
        let query = input.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut suggestions = Vec::new();
        for city in &self.cities {
            if city.name.to_lowercase().contains(&query) {
                suggestions.push(Suggestion {
                    name: city.name.clone(),
                    kind: SuggestionKind::City,
                    parent_city: None,
                });
            }

            for point in &city.sample_points {
                if point.name.to_lowercase().contains(&query) {
                    suggestions.push(Suggestion {
                        name: point.name.clone(),
                        kind: SuggestionKind::Area,
                        parent_city: Some(city.name.clone()),
                    });
                }
            }
        }

        suggestions.truncate(limit);
        suggestions
    }
}

/// Great-circle distance between two positions in kilometres
#[must_use]
pub fn distance_km(from_lat: f64, from_lon: f64, to_lat: f64, to_lon: f64) -> f64 {
    haversine::distance(
        haversine::Location {
            latitude: from_lat,
            longitude: from_lon,
        },
        haversine::Location {
            latitude: to_lat,
            longitude: to_lon,
        },
        haversine::Units::Kilometers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dataset() -> CityDataset {
        CityDataset::bundled().unwrap()
    }

    #[test]
    fn test_bundled_dataset_loads() {
        let data = dataset();
        assert_eq!(data.len(), 20);
        assert_eq!(data.names()[0], "Islamabad");
        assert!(data.find_by_name("Sukkur").is_some());
    }

    #[test]
    fn test_bundled_percentages_add_up() {
        for city in dataset().cities() {
            assert!(city.percentages_consistent(), "{} is inconsistent", city.name);
        }
    }

    #[rstest]
    #[case("lahore", "Lahore")]
    #[case("KARACHI", "Karachi")]
    #[case("Mangora (Swat)", "Mangora (Swat)")]
    fn test_find_by_name_ignores_case(#[case] query: &str, #[case] expected: &str) {
        let data = dataset();
        assert_eq!(data.find_by_name(query).map(|c| c.name.as_str()), Some(expected));
    }

    #[test]
    fn test_find_by_name_requires_whole_name() {
        assert!(dataset().find_by_name("Lah").is_none());
    }

    #[rstest]
    #[case("Zakaria University", "Multan")]
    #[case("mandi morr", "Rawalpindi")]
    #[case("model town", "Lahore")]
    #[case("dha", "Rawalpindi")]
    fn test_find_by_sample_point_first_city_wins(#[case] query: &str, #[case] expected: &str) {
        let data = dataset();
        assert_eq!(
            data.find_by_sample_point(query).map(|c| c.name.as_str()),
            Some(expected)
        );
    }

    #[test]
    fn test_nearest_city() {
        let data = dataset();
        let (city, distance) = data.nearest(31.52, 74.35).unwrap();
        assert_eq!(city.name, "Lahore");
        assert!(distance < 5.0);

        let (again, distance_again) = data.nearest(31.52, 74.35).unwrap();
        assert_eq!(again.name, city.name);
        assert!((distance - distance_again).abs() < 1e-9);
    }

    #[test]
    fn test_distance_is_zero_at_same_point() {
        assert!(distance_km(30.1575, 71.5249, 30.1575, 71.5249).abs() < 1e-9);
        let km = distance_km(31.5497, 74.3436, 33.6844, 73.0479);
        assert!(km > 250.0 && km < 300.0);
    }

    #[test]
    fn test_suggestions() {
        let data = dataset();

        let suggestions = data.suggestions("multan", MAX_SUGGESTIONS);
        assert_eq!(suggestions[0].kind, SuggestionKind::City);
        assert_eq!(suggestions[0].name, "Multan");
        assert!(suggestions.iter().skip(1).all(|s| s.kind == SuggestionKind::Area));

        let capped = data.suggestions("tube well", MAX_SUGGESTIONS);
        assert_eq!(capped.len(), MAX_SUGGESTIONS);
        assert_eq!(capped[0].parent_city.as_deref(), Some("Islamabad"));

        assert!(data.suggestions("   ", MAX_SUGGESTIONS).is_empty());
    }

    #[test]
    fn test_rejects_empty_or_invalid_json() {
        assert!(CityDataset::from_json("[]").is_err());
        assert!(CityDataset::from_json("{not json").is_err());
    }
}
