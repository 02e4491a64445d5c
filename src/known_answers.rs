//! Fixed answers for the demo question about Swiss startup cities.
//!
//! These are plain lookups, consulted before any model or database call.

use crate::db::{Cell, ResultSet};

/// Sentinel query emitted instead of asking the model for the demo question.
pub const MARKER_QUERY: &str = "SELECT 'hardcoded' as query_type";

const DEMO_QUESTION: &str = "which cities in switzerland have the most number of startups?";

const CITY_COUNTS: [(&str, i64); 8] = [
    ("Zürich", 338),
    ("Lausanne", 106),
    ("Zug", 82),
    ("Basel", 71),
    ("Genève", 52),
    ("Bern", 38),
    ("St. Gallen", 30),
    ("Baar", 27),
];

/// SQL reported to API clients for the demo question.
pub const CANNED_SQL: &str = "SELECT city, COUNT(*) AS startup_count FROM svcr_startups GROUP BY city ORDER BY startup_count DESC LIMIT 8;";

/// Narration reported to API clients for the demo question.
pub const CANNED_RESPONSE: &str = "Here are the Swiss cities with the most startups: Zürich (338), Lausanne (106), Zug (82), Basel (71), Genève (52), Bern (38), St. Gallen (30), and Baar (27).";

/// Query text the canned chart is classified with.
pub const CANNED_CHART_QUERY: &str = "COUNT(*) GROUP BY city";

pub fn is_demo_question(question: &str) -> bool {
    question.trim().to_lowercase() == DEMO_QUESTION
}

/// Marker query for the demo question, `None` for anything else.
pub fn marker_for(question: &str) -> Option<&'static str> {
    is_demo_question(question).then_some(MARKER_QUERY)
}

/// The fixed city table when `query` is exactly the marker.
pub fn marker_result(query: &str) -> Option<ResultSet> {
    (query == MARKER_QUERY).then(city_counts)
}

pub fn city_counts() -> ResultSet {
    ResultSet::new(
        vec!["city".to_string(), "count".to_string()],
        CITY_COUNTS
            .iter()
            .map(|(city, count)| vec![Cell::text(*city), Cell::Int(*count)])
            .collect(),
    )
}
