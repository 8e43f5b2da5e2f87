//! Gazetteer Loading Module
//!
//! Builds the read-only airport index from static data. The index is
//! constructed once and shared by reference; it is never mutated afterwards.

use crate::models::AirportRecord;
use crate::{AssistantError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Raw airport entry as found in the data file; extra fields are ignored
#[derive(Debug, Deserialize)]
struct RawAirport {
    #[serde(default)]
    icao: String,
    #[serde(default)]
    iata: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    name: String,
}

/// Accepted data file layouts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AirportFile {
    List(Vec<RawAirport>),
    /// Keyed by ICAO; iterated in key order
    Keyed(BTreeMap<String, RawAirport>),
}

/// Ordered airport records plus code and city indexes
#[derive(Debug, Default)]
pub struct Gazetteer {
    records: Vec<AirportRecord>,
    by_iata: HashMap<String, usize>,
    by_icao: HashMap<String, usize>,
    by_city: HashMap<String, usize>,
}

impl Gazetteer {
    /// Build indexes over `records`; the first record wins on duplicate keys
    #[must_use]
    pub fn new(records: Vec<AirportRecord>) -> Self {
        let mut by_iata = HashMap::new();
        let mut by_icao = HashMap::new();
        let mut by_city = HashMap::new();

        for (idx, record) in records.iter().enumerate() {
            by_iata.entry(record.iata.clone()).or_insert(idx);
            if !record.icao.is_empty() {
                by_icao.entry(record.icao.clone()).or_insert(idx);
            }
            if !record.city.is_empty() {
                by_city.entry(record.city.clone()).or_insert(idx);
            }
        }

        Self {
            records,
            by_iata,
            by_icao,
            by_city,
        }
    }

    /// Parse a gazetteer from JSON (array of records or object keyed by ICAO)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: AirportFile = serde_json::from_str(json)?;
        let raw: Vec<RawAirport> = match file {
            AirportFile::List(list) => list,
            AirportFile::Keyed(map) => map.into_values().collect(),
        };

        let total = raw.len();
        let records: Vec<AirportRecord> = raw
            .into_iter()
            .filter(|a| !a.iata.trim().is_empty())
            .map(|a| AirportRecord::new(&a.icao, &a.iata, &a.city, &a.name))
            .collect();

        if records.len() < total {
            debug!(
                "Skipped {} airports without an IATA code",
                total - records.len()
            );
        }

        if records.is_empty() {
            return Err(AssistantError::data("Gazetteer contains no usable airports"));
        }

        Ok(Self::new(records))
    }

    /// Load the gazetteer from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AssistantError::data(format!(
                "Failed to read gazetteer {}: {e}",
                path.display()
            ))
        })?;
        let gazetteer = Self::from_json_str(&json)?;
        info!(
            "Loaded {} airports from {}",
            gazetteer.len(),
            path.display()
        );
        Ok(gazetteer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in load order
    pub fn records(&self) -> impl Iterator<Item = &AirportRecord> {
        self.records.iter()
    }

    /// Exact IATA lookup; `code` must already be case-folded
    #[must_use]
    pub fn by_iata(&self, code: &str) -> Option<&AirportRecord> {
        self.by_iata.get(code).map(|&i| &self.records[i])
    }

    /// Exact ICAO lookup; `code` must already be case-folded
    #[must_use]
    pub fn by_icao(&self, code: &str) -> Option<&AirportRecord> {
        self.by_icao.get(code).map(|&i| &self.records[i])
    }

    /// Exact city lookup; `city` must already be case-folded
    #[must_use]
    pub fn by_city(&self, city: &str) -> Option<&AirportRecord> {
        self.by_city.get(city).map(|&i| &self.records[i])
    }

    /// First record whose name contains `fragment`
    #[must_use]
    pub fn by_name_fragment(&self, fragment: &str) -> Option<&AirportRecord> {
        if fragment.is_empty() {
            return None;
        }
        self.records.iter().find(|r| r.name.contains(fragment))
    }
}
