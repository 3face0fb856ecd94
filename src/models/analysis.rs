//! Live analysis summaries and their source citations

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A web page the analysis was grounded on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

impl Source {
    #[must_use]
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

/// Natural-language water-safety summary for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Summary text as returned by the model
    pub text: String,
    /// Unique citations, in first-seen order
    pub sources: Vec<Source>,
}

impl AnalysisResult {
    /// Build a result, collapsing citations that share a URI.
    #[must_use]
    pub fn new(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            text: text.into(),
            sources: unique_sources(sources),
        }
    }
}

/// Keep the first entry for every URI, preserving order.
#[must_use]
pub fn unique_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| seen.insert(source.uri.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_uri_keeps_first_title() {
        let result = AnalysisResult::new(
            "Arsenic above WHO limits.",
            vec![
                Source::new("PCRWR Report 2023", "https://pcrwr.gov.pk/report"),
                Source::new("WHO JMP", "https://washdata.org"),
                Source::new("PCRWR (mirror)", "https://pcrwr.gov.pk/report"),
            ],
        );

        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].title, "PCRWR Report 2023");
        assert_eq!(result.sources[1].uri, "https://washdata.org");
    }
}
