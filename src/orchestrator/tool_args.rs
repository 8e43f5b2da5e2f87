//! Validation of AI-proposed search arguments
//!
//! Arguments arrive as untrusted JSON. Anything with the wrong shape is
//! rejected, never coerced.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use crate::dialogue::{SEARCH_FLIGHTS_TOOL, ToolCall};
use crate::models::{FlightQueryParams, FlightType, SortBy, flight::DATE_FORMAT};
use crate::{AssistantError, Result};

static CANONICAL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

const PLACE_ID_PREFIX: &str = "/m/";

/// Validate a tool call into search parameters
pub fn validate_tool_call(call: &ToolCall, home_airports: &[String]) -> Result<FlightQueryParams> {
    if call.name != SEARCH_FLIGHTS_TOOL {
        return Err(AssistantError::validation(format!(
            "Unknown tool '{}'",
            call.name
        )));
    }

    let args = call
        .args
        .as_object()
        .ok_or_else(|| AssistantError::validation("Tool arguments must be an object"))?;

    let destination = optional_str(args, "destination")?
        .map(codes)
        .filter(|codes| !codes.is_empty())
        .ok_or_else(|| AssistantError::validation("destination is required"))?;

    let flight_type = optional_str(args, "flight_type")?
        .ok_or_else(|| AssistantError::validation("flight_type is required"))?;
    let flight_type = FlightType::parse(flight_type).ok_or_else(|| {
        AssistantError::validation(format!("Unsupported flight_type '{flight_type}'"))
    })?;

    let departure_date = optional_date(args, "departure_date")?;
    let return_date = optional_date(args, "return_date")?;
    if flight_type == FlightType::RoundTrip && return_date.is_none() {
        return Err(AssistantError::validation(
            "return_date is required for a round trip",
        ));
    }
    if let (Some(out), Some(back)) = (departure_date, return_date) {
        if back < out {
            return Err(AssistantError::validation(
                "return_date precedes departure_date",
            ));
        }
    }

    let origin = optional_str(args, "origin")?
        .map(codes)
        .filter(|codes| !codes.is_empty())
        .unwrap_or_else(|| home_airports.to_vec());

    if let Some(code) = destination
        .iter()
        .find(|d| origin.iter().any(|o| o.eq_ignore_ascii_case(d)))
    {
        return Err(AssistantError::validation(format!(
            "{code} is both origin and destination"
        )));
    }

    let mut params = FlightQueryParams {
        origin,
        destination: destination.join(","),
        departure_date,
        flight_type,
        return_date,
        exclude_airlines: optional_str(args, "exclude_airlines")?.map(String::from),
        include_airlines: optional_str(args, "include_airlines")?.map(String::from),
        max_price: optional_price(args)?,
        sort_by: optional_sort(args)?,
    };
    params.normalize_airline_filters();
    Ok(params)
}

/// String argument; absent, null and blank all read as `None`
fn optional_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then_some(s))
        }
        Some(other) => Err(AssistantError::validation(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}

fn optional_date(args: &Map<String, Value>, key: &str) -> Result<Option<NaiveDate>> {
    let Some(raw) = optional_str(args, key)? else {
        return Ok(None);
    };
    if !CANONICAL_DATE.is_match(raw) {
        return Err(AssistantError::validation(format!(
            "{key} must be YYYY-MM-DD, got '{raw}'"
        )));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|e| AssistantError::validation(format!("{key} '{raw}' is not a date: {e}")))
}

fn optional_price(args: &Map<String, Value>) -> Result<Option<f64>> {
    let price = match args.get("max_price") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match price {
        Some(p) if p.is_finite() && p > 0.0 => Ok(Some(p)),
        _ => Err(AssistantError::validation(
            "max_price must be a positive number",
        )),
    }
}

fn optional_sort(args: &Map<String, Value>) -> Result<Option<SortBy>> {
    let raw = match args.get("sort_by") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(AssistantError::validation(format!(
                "sort_by must be a string, got {other}"
            )));
        }
    };
    SortBy::parse(&raw)
        .map(Some)
        .ok_or_else(|| AssistantError::validation(format!("Unsupported sort_by '{raw}'")))
}

/// Comma separated airport codes; IATA codes upper-cased, place ids kept
fn codes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| {
            if code.starts_with(PLACE_ID_PREFIX) {
                code.to_string()
            } else {
                code.to_uppercase()
            }
        })
        .collect()
}
