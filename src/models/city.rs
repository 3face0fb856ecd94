//! City water-quality records and their monitored sample points

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate water-quality classification of a city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterStatus {
    Safe,
    Moderate,
    Unsafe,
    Unknown,
}

impl WaterStatus {
    /// Upper-case badge text shown on the status card
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            WaterStatus::Safe => "SAFE",
            WaterStatus::Moderate => "MODERATE",
            WaterStatus::Unsafe => "UNSAFE",
            WaterStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for WaterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaterStatus::Safe => "Safe",
            WaterStatus::Moderate => "Moderate",
            WaterStatus::Unsafe => "Unsafe",
            WaterStatus::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Classification of a single monitored source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointStatus {
    Safe,
    Unsafe,
    Unknown,
}

/// A single monitored water source within a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Source name, including the source type in parentheses
    pub name: String,
    pub status: PointStatus,
    /// Contaminants detected at this source
    #[serde(default)]
    pub contaminants: Vec<String>,
}

/// Water-quality record for one monitored city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Short stable identifier (e.g. "lhr")
    pub id: String,
    /// English display name
    pub name: String,
    /// Roman Urdu transliteration
    pub name_urdu: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Share of sampled sources found safe (0-100)
    pub safe_percentage: u8,
    /// Share of sampled sources found unsafe (0-100)
    pub unsafe_percentage: u8,
    pub status: WaterStatus,
    /// Contaminants found anywhere in the city
    #[serde(default)]
    pub contaminants: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub sample_points: Vec<SamplePoint>,
}

impl CityRecord {
    /// Placeholder shown for a query with no historical record at all.
    #[must_use]
    pub fn placeholder(query: &str) -> Self {
        Self {
            id: "custom".to_string(),
            name: query.to_string(),
            name_urdu: query.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            safe_percentage: 0,
            unsafe_percentage: 0,
            status: WaterStatus::Unknown,
            contaminants: Vec::new(),
            description: "No historical record found. Performing live database scan..."
                .to_string(),
            sample_points: Vec::new(),
        }
    }

    /// Case-insensitive comparison against the display name
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// First sample point whose name contains `needle`, ignoring case
    #[must_use]
    pub fn sample_point_containing(&self, needle: &str) -> Option<&SamplePoint> {
        let needle = needle.to_lowercase();
        self.sample_points
            .iter()
            .find(|point| point.name.to_lowercase().contains(&needle))
    }

    /// Whether the percentages add up the way the dataset promises
    #[must_use]
    pub fn percentages_consistent(&self) -> bool {
        self.status == WaterStatus::Unknown
            || u16::from(self.safe_percentage) + u16::from(self.unsafe_percentage) == 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lahore() -> CityRecord {
        CityRecord {
            id: "lhr".to_string(),
            name: "Lahore".to_string(),
            name_urdu: "Lahore".to_string(),
            latitude: 31.5497,
            longitude: 74.3436,
            safe_percentage: 69,
            unsafe_percentage: 31,
            status: WaterStatus::Moderate,
            contaminants: vec!["Arsenic".to_string()],
            description: "Mostly safe".to_string(),
            sample_points: vec![
                SamplePoint {
                    name: "Tube Well, DHA Phase 1 (T.Well)".to_string(),
                    status: PointStatus::Safe,
                    contaminants: vec![],
                },
                SamplePoint {
                    name: "Tube Well, Samanabad (T.Well)".to_string(),
                    status: PointStatus::Unsafe,
                    contaminants: vec!["Arsenic".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_placeholder_record() {
        let record = CityRecord::placeholder("Gilgit");
        assert_eq!(record.id, "custom");
        assert_eq!(record.name, "Gilgit");
        assert_eq!(record.status, WaterStatus::Unknown);
        assert_eq!(record.safe_percentage, 0);
        assert!(record.contaminants.is_empty());
        assert!(record.sample_points.is_empty());
        assert!(record.description.starts_with("No historical record found"));
    }

    #[test]
    fn test_name_and_point_matching() {
        let city = lahore();
        assert!(city.is_named("LAHORE"));
        assert!(!city.is_named("Lahor"));

        let point = city.sample_point_containing("dha phase");
        assert_eq!(point.map(|p| p.name.as_str()), Some("Tube Well, DHA Phase 1 (T.Well)"));
        assert!(city.sample_point_containing("clifton").is_none());
    }

    #[test]
    fn test_percentages_consistent() {
        let mut city = lahore();
        assert!(city.percentages_consistent());

        city.unsafe_percentage = 40;
        assert!(!city.percentages_consistent());

        assert!(CityRecord::placeholder("x").percentages_consistent());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(WaterStatus::Safe.label(), "SAFE");
        assert_eq!(WaterStatus::Unknown.label(), "UNKNOWN");
        assert_eq!(WaterStatus::Moderate.to_string(), "Moderate");

        let parsed: WaterStatus = serde_json::from_str("\"Unsafe\"").unwrap();
        assert_eq!(parsed, WaterStatus::Unsafe);
    }
}
