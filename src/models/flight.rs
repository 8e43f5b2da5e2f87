//! Flight search parameters and provider result models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Canonical date format for every date crossing a boundary
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Trip shape requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightType {
    RoundTrip,
    OneWay,
    MultiCity,
}

impl FlightType {
    /// Provider wire code
    #[must_use]
    pub fn provider_code(self) -> &'static str {
        match self {
            FlightType::RoundTrip => "1",
            FlightType::OneWay => "2",
            FlightType::MultiCity => "3",
        }
    }

    /// Parse a wire code or a snake_case name
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "1" | "round_trip" => Some(FlightType::RoundTrip),
            "2" | "one_way" => Some(FlightType::OneWay),
            "3" | "multi_city" => Some(FlightType::MultiCity),
            _ => None,
        }
    }
}

/// Result ordering, passed through to the provider untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    TopFlights,
    Price,
    DepartureTime,
    ArrivalTime,
    Duration,
    Emissions,
}

impl SortBy {
    #[must_use]
    pub fn provider_code(self) -> &'static str {
        match self {
            SortBy::TopFlights => "1",
            SortBy::Price => "2",
            SortBy::DepartureTime => "3",
            SortBy::ArrivalTime => "4",
            SortBy::Duration => "5",
            SortBy::Emissions => "6",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "1" | "top_flights" => Some(SortBy::TopFlights),
            "2" | "price" => Some(SortBy::Price),
            "3" | "departure_time" => Some(SortBy::DepartureTime),
            "4" | "arrival_time" => Some(SortBy::ArrivalTime),
            "5" | "duration" => Some(SortBy::Duration),
            "6" | "emissions" => Some(SortBy::Emissions),
            _ => None,
        }
    }
}

/// Validated search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightQueryParams {
    /// Upper-case IATA codes (or opaque place identifiers)
    pub origin: Vec<String>,
    pub destination: String,
    pub departure_date: Option<NaiveDate>,
    pub flight_type: FlightType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_airlines: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_airlines: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

impl FlightQueryParams {
    /// One-way search with no filters
    #[must_use]
    pub fn one_way(origin: Vec<String>, destination: String, departure_date: NaiveDate) -> Self {
        Self {
            origin,
            destination,
            departure_date: Some(departure_date),
            flight_type: FlightType::OneWay,
            return_date: None,
            exclude_airlines: None,
            include_airlines: None,
            max_price: None,
            sort_by: None,
        }
    }

    /// Origins as the provider's comma-separated list
    #[must_use]
    pub fn origin_csv(&self) -> String {
        self.origin.join(",")
    }

    /// Whether the destination also appears among the origins
    #[must_use]
    pub fn is_self_referential(&self) -> bool {
        self.origin
            .iter()
            .any(|o| o.eq_ignore_ascii_case(&self.destination))
    }

    /// Exclusion wins when both airline filters are present
    pub fn normalize_airline_filters(&mut self) {
        if self.exclude_airlines.is_some() && self.include_airlines.is_some() {
            self.include_airlines = None;
        }
    }
}

/// Departure or arrival point of a leg
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirportStop {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    /// "YYYY-MM-DD HH:MM"
    #[serde(default)]
    pub time: Option<String>,
}

impl AirportStop {
    /// Date half of `time`
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.time.as_deref()?.split_whitespace().next()
    }

    /// Clock half of `time`
    #[must_use]
    pub fn clock_time(&self) -> Option<&str> {
        self.time.as_deref()?.split_whitespace().nth(1)
    }
}

/// One flight segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightLeg {
    #[serde(default)]
    pub departure_airport: AirportStop,
    #[serde(default)]
    pub arrival_airport: AirportStop,
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

/// One search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    #[serde(rename = "flights", default)]
    pub legs: Vec<FlightLeg>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub trip_type: Option<String>,
    /// Provider layover records, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layovers: Option<serde_json::Value>,
}

impl FlightOffer {
    #[must_use]
    pub fn first_leg(&self) -> Option<&FlightLeg> {
        self.legs.first()
    }
}

impl Display for FlightOffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.first_leg() {
            Some(leg) => write!(
                f,
                "{} {} -> {}",
                leg.airline.as_deref().unwrap_or("?"),
                leg.departure_airport.id.as_deref().unwrap_or("?"),
                leg.arrival_airport.id.as_deref().unwrap_or("?"),
            )?,
            None => write!(f, "(no legs)")?,
        }
        if let Some(price) = self.price {
            write!(f, " {price}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("1", Some(FlightType::RoundTrip))]
    #[case("2", Some(FlightType::OneWay))]
    #[case("multi_city", Some(FlightType::MultiCity))]
    #[case(" One_Way ", Some(FlightType::OneWay))]
    #[case("4", None)]
    #[case("", None)]
    fn test_flight_type_parse(#[case] input: &str, #[case] expected: Option<FlightType>) {
        assert_eq!(FlightType::parse(input), expected);
    }

    #[test]
    fn test_sort_by_codes() {
        assert_eq!(SortBy::parse("2"), Some(SortBy::Price));
        assert_eq!(SortBy::parse("emissions"), Some(SortBy::Emissions));
        assert_eq!(SortBy::Duration.provider_code(), "5");
        assert_eq!(SortBy::parse("7"), None);
    }

    #[test]
    fn test_self_referential() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let params =
            FlightQueryParams::one_way(vec!["LGW".into(), "LHR".into()], "lhr".into(), date);
        assert!(params.is_self_referential());

        let params = FlightQueryParams::one_way(vec!["LGW".into()], "CDG".into(), date);
        assert!(!params.is_self_referential());
        assert_eq!(params.origin_csv(), "LGW");
    }

    #[test]
    fn test_exclude_airlines_wins() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut params = FlightQueryParams::one_way(vec!["LGW".into()], "CDG".into(), date);
        params.exclude_airlines = Some("BA".into());
        params.include_airlines = Some("AF".into());
        params.normalize_airline_filters();
        assert_eq!(params.exclude_airlines.as_deref(), Some("BA"));
        assert!(params.include_airlines.is_none());
    }

    #[test]
    fn test_params_serialize_canonical_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let params = FlightQueryParams::one_way(vec!["LHR".into()], "CDG".into(), date);
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["departure_date"], "2024-01-02");
        assert_eq!(value["flight_type"], "one_way");
        assert!(value.get("return_date").is_none());
    }

    #[test]
    fn test_offer_from_provider_shape() {
        let offer: FlightOffer = serde_json::from_value(json!({
            "flights": [{
                "departure_airport": {"name": "Heathrow", "id": "LHR", "time": "2024-01-02 08:15"},
                "arrival_airport": {"name": "Charles de Gaulle", "id": "CDG", "time": "2024-01-02 10:30"},
                "airline": "Air France",
                "flight_number": "AF 1081",
                "duration": 75
            }],
            "price": 112,
            "type": "One way"
        }))
        .unwrap();

        let leg = offer.first_leg().unwrap();
        assert_eq!(leg.departure_airport.date(), Some("2024-01-02"));
        assert_eq!(leg.departure_airport.clock_time(), Some("08:15"));
        assert_eq!(offer.price, Some(112.0));
        assert_eq!(offer.to_string(), "Air France LHR -> CDG 112");
        assert!(offer.layovers.is_none());
    }

    #[test]
    fn test_offer_keeps_layovers_for_the_model() {
        let offer: FlightOffer = serde_json::from_value(json!({
            "flights": [],
            "price": 240,
            "layovers": [{"duration": 95, "name": "Frankfurt Airport", "id": "FRA"}]
        }))
        .unwrap();

        let value = serde_json::to_value(&offer).unwrap();
        assert_eq!(value["layovers"][0]["id"], "FRA");
        assert_eq!(value["layovers"][0]["duration"], 95);
    }
}
