//! Prompt templates sent to the hosted model

/// Appended to the analysis prompt when live search is not permitted.
pub const OFFLINE_NOTE: &str = "\n\n(Note: Live search is unavailable, please provide analysis based on your internal knowledge base.)";

/// Prompt asking the model to map a query onto one supported city
#[must_use]
pub fn city_resolution(query: &str, known_cities: &[&str]) -> String {
    format!(
        r#"You are a smart location resolver for a Water Safety App in Pakistan.

Supported Cities Database:
[{cities}]

User Search Query: "{query}"

Task:
1. Determine if the search query refers to a location, landmark, university, hospital, colony, or area inside or very close to one of the Supported Cities.
2. If yes, return the exact name of that City from the Supported Cities list.
3. Handles abbreviations: "BZ University" or "BZU" -> "Multan". "LUMS" -> "Lahore". "NUST" -> "Islamabad".
4. If the query is unrelated to Pakistan or these cities, return "null".

Return ONLY the City Name or "null". No punctuation."#,
        cities = known_cities.join(", "),
    )
}

/// Prompt asking for a short, source-backed water-quality summary
#[must_use]
pub fn water_quality_analysis(location: &str) -> String {
    format!(
        r#"You are a Water Quality Data Analyst for Pakistan.

Task: Search for the latest available drinking water quality data for "{location}".

MANDATORY: You must prioritize and strictly reference information from these OFFICIAL sources if available:
1. PCRWR Drinking Water Quality Reports (2021, 2023, or later)
2. Punjab HUD&PHED Water Quality Dashboard (hudpunjab.gov.pk)
3. Urban Unit Punjab Water Reports (urbanunit.gov.pk)
4. WHO-UNICEF JMP WASH Data for Pakistan
5. EPA Punjab Quarterly Bulletins

Output Requirements:
- Provide a concise 2-3 sentence summary of the water safety status.
- Specifically mention latest values for TDS, Arsenic, pH, or Bacteria if found in these live sources.
- If recent data confirms the water is unsafe, clearly state why.
- Do not provide generic advice; provide data-backed analysis."#
    )
}
