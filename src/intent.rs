//! Flight intent detection and parameter extraction
//!
//! Heuristic, single-turn extraction used by the deterministic fallback
//! path. Output depends only on the message text and the injected date.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::airports::AirportResolver;
use crate::models::{FlightQueryParams, flight::DATE_FORMAT};

/// Phrases that mark a message as flight-related wherever they occur
const TRIGGER_PHRASES: &[&str] = &[
    "flight", "flights", "fly", "plane", "ticket", "from", "go to", "fly to",
];

/// Words that mark a message as flight-related only as whole words
const TRIGGER_WORDS: &[&str] = &["go", "travel", "trip", "holiday", "vacation"];

static ORIGIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"from\s+([a-z0-9/\-\s\x{00C0}-\x{017F}]+?)(?:\s+to\b|$)")
        .expect("valid origin pattern")
});

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("valid date pattern"));

/// Coarse filter: does the message look like a flight question?
#[must_use]
pub fn is_flight_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    if TRIGGER_PHRASES.iter().any(|t| lower.contains(t)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| TRIGGER_WORDS.contains(&word))
}

/// First canonical date in the text that is also a real calendar date
#[must_use]
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    DATE_PATTERN
        .captures_iter(text)
        .find_map(|caps| NaiveDate::parse_from_str(&caps[1], DATE_FORMAT).ok())
}

/// Builds one-way search parameters from free text
#[derive(Debug, Clone)]
pub struct ParamExtractor {
    resolver: AirportResolver,
    home_airports: Vec<String>,
}

impl ParamExtractor {
    #[must_use]
    pub fn new(resolver: AirportResolver, home_airports: Vec<String>) -> Self {
        let home_airports = home_airports
            .into_iter()
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        Self {
            resolver,
            home_airports,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &AirportResolver {
        &self.resolver
    }

    #[must_use]
    pub fn home_airports(&self) -> &[String] {
        &self.home_airports
    }

    /// Extract search parameters, or `None` when no usable destination exists
    #[must_use]
    pub fn extract_params(&self, text: &str, today: NaiveDate) -> Option<FlightQueryParams> {
        let lower = text.to_lowercase();

        let origin_match = ORIGIN_PATTERN
            .captures(&lower)
            .and_then(|caps| caps.get(1))
            .filter(|m| !m.as_str().trim().is_empty());

        let origin = origin_match
            .and_then(|m| self.resolver.resolve_by_phrase(m.as_str()))
            .map(|hit| vec![hit.code()])
            .unwrap_or_else(|| self.home_airports.clone());

        let remainder = match origin_match {
            Some(m) => format!("{} {}", &lower[..m.start()], &lower[m.end()..]),
            None => lower.clone(),
        };

        let Some(destination) = self.resolver.extract_destination(&remainder) else {
            debug!("No destination found in message");
            return None;
        };

        let departure_date = extract_date(&lower).unwrap_or_else(|| tomorrow(today));

        let params = FlightQueryParams::one_way(origin, destination, departure_date);
        if params.is_self_referential() {
            debug!("Destination {} is also an origin", params.destination);
            return None;
        }

        debug!(
            "Extracted {} -> {} on {}",
            params.origin_csv(),
            params.destination,
            departure_date
        );
        Some(params)
    }
}

fn tomorrow(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::Gazetteer;
    use crate::models::{AirportRecord, FlightType};
    use rstest::rstest;
    use std::sync::Arc;

    fn extractor() -> ParamExtractor {
        let records = vec![
            AirportRecord::new("EGLL", "LHR", "London", "London Heathrow Airport"),
            AirportRecord::new("EGKK", "LGW", "London", "London Gatwick Airport"),
            AirportRecord::new("LFPG", "CDG", "Paris", "Charles de Gaulle International Airport"),
            AirportRecord::new("EDDB", "BER", "Berlin", "Berlin Brandenburg Airport"),
            AirportRecord::new("KJFK", "JFK", "New York", "John F Kennedy International Airport"),
        ];
        let resolver = AirportResolver::new(Arc::new(Gazetteer::new(records)));
        ParamExtractor::new(resolver, vec!["lgw".into(), "LHR".into()])
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("Any flights to Rome?", true)]
    #[case("can I fly to Berlin", true)]
    #[case("cheapest ticket please", true)]
    #[case("from Paris", true)]
    #[case("I'd like to go somewhere nice", true)]
    #[case("planning a trip", true)]
    #[case("Who are you?", false)]
    #[case("good morning", false)]
    fn test_is_flight_intent(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_flight_intent(text), expected);
    }

    #[test]
    fn test_origin_and_destination() {
        let params = extractor()
            .extract_params("flight from London to Paris", date(2024, 1, 1))
            .unwrap();
        assert_eq!(params.origin, vec!["LHR"]);
        assert_eq!(params.destination, "CDG");
        assert_eq!(params.departure_date, Some(date(2024, 1, 2)));
        assert_eq!(params.flight_type, FlightType::OneWay);
    }

    #[test]
    fn test_multi_word_origin() {
        let params = extractor()
            .extract_params("Flights from New York to Berlin", date(2024, 5, 1))
            .unwrap();
        assert_eq!(params.origin, vec!["JFK"]);
        assert_eq!(params.destination, "BER");
    }

    #[test]
    fn test_home_airports_when_no_origin() {
        let params = extractor()
            .extract_params("fly to berlin", date(2024, 5, 1))
            .unwrap();
        assert_eq!(params.origin, vec!["LGW", "LHR"]);
        assert_eq!(params.destination, "BER");
    }

    #[test]
    fn test_unresolved_origin_falls_back_to_home() {
        let params = extractor()
            .extract_params("from atlantis to berlin", date(2024, 5, 1))
            .unwrap();
        assert_eq!(params.origin, vec!["LGW", "LHR"]);
    }

    #[test]
    fn test_explicit_date() {
        let params = extractor()
            .extract_params("flight to Paris on 2024-03-15", date(2024, 1, 1))
            .unwrap();
        assert_eq!(params.departure_date, Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_impossible_date_defaults_to_tomorrow() {
        let params = extractor()
            .extract_params("flight to Paris on 2024-13-45", date(2024, 1, 31))
            .unwrap();
        assert_eq!(params.departure_date, Some(date(2024, 2, 1)));
    }

    #[rstest]
    #[case("I'd like to go somewhere nice")]
    #[case("flights from London")]
    #[case("flight to the airport")]
    fn test_no_destination(#[case] text: &str) {
        assert!(extractor().extract_params(text, date(2024, 1, 1)).is_none());
    }

    #[rstest]
    #[case("fly to heathrow")]
    #[case("flight from Paris to CDG")]
    fn test_self_referential_trip_is_rejected(#[case] text: &str) {
        assert!(extractor().extract_params(text, date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = extractor();
        let today = date(2024, 6, 30);
        let first = extractor.extract_params("flight from Berlin to Paris", today);
        for _ in 0..10 {
            assert_eq!(extractor.extract_params("flight from Berlin to Paris", today), first);
        }
    }
}
