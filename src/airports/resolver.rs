//! Airport Resolution Module
//!
//! Resolves codes, place phrases and free-text words against the gazetteer.
//! Every strategy returns `None` on no match; nothing here fails.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use super::Gazetteer;
use crate::models::AirportRecord;

/// Prefix of opaque knowledge-graph place identifiers, passed through unresolved
const PLACE_ID_PREFIX: &str = "/m/";

/// Words never treated as a destination
const STOP_WORDS: &[&str] = &[
    // articles and prepositions
    "the", "a", "an", "to", "from", "on", "at", "in", "into", "for", "with", "of", "by",
    // pronouns, auxiliaries and question words
    "i", "me", "my", "we", "us", "you", "it", "is", "are", "be", "do", "does", "can", "would",
    "there", "any", "some", "this", "next", "what", "when", "how", "and", "or", "please",
    // travel verbs
    "help", "want", "like", "fly", "find", "get", "flight", "flights", "go", "travel", "book",
];

static WORD_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9/]+").expect("valid word split pattern"));

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AirportMatch<'a> {
    /// A gazetteer record
    Airport(&'a AirportRecord),
    /// An opaque place identifier, not looked up
    PlaceId(String),
}

impl AirportMatch<'_> {
    /// Code to send to the search provider
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            AirportMatch::Airport(record) => record.iata_code(),
            AirportMatch::PlaceId(id) => id.clone(),
        }
    }

    #[must_use]
    pub fn record(&self) -> Option<&AirportRecord> {
        match self {
            AirportMatch::Airport(record) => Some(record),
            AirportMatch::PlaceId(_) => None,
        }
    }
}

/// Exact and fuzzy lookups over a shared gazetteer
#[derive(Debug, Clone)]
pub struct AirportResolver {
    gazetteer: Arc<Gazetteer>,
}

impl AirportResolver {
    #[must_use]
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        Self { gazetteer }
    }

    #[must_use]
    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// Exact IATA or ICAO lookup, any letter case
    #[must_use]
    pub fn resolve_by_code(&self, code: &str) -> Option<&AirportRecord> {
        let code = code.trim().to_lowercase();
        if code.is_empty() {
            return None;
        }
        self.gazetteer
            .by_iata(&code)
            .or_else(|| self.gazetteer.by_icao(&code))
    }

    /// Resolve a place phrase; the first successful strategy wins
    #[must_use]
    pub fn resolve_by_phrase(&self, phrase: &str) -> Option<AirportMatch<'_>> {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            return None;
        }

        if let Some(record) = self.exact_code(&phrase) {
            return Some(AirportMatch::Airport(record));
        }

        if phrase.starts_with(PLACE_ID_PREFIX) {
            return Some(AirportMatch::PlaceId(phrase));
        }

        if let Some(record) = self.gazetteer.by_city(&phrase) {
            return Some(AirportMatch::Airport(record));
        }

        if let Some(record) = self.gazetteer.by_name_fragment(&phrase) {
            return Some(AirportMatch::Airport(record));
        }

        let tokens: Vec<&str> = phrase.split_whitespace().collect();

        // Contiguous windows, longest first
        for len in (1..=tokens.len()).rev() {
            for window in tokens.windows(len) {
                let window = window.join(" ");
                if let Some(record) = self
                    .gazetteer
                    .by_city(&window)
                    .or_else(|| self.gazetteer.by_name_fragment(&window))
                {
                    debug!("Resolved '{}' via window '{}'", phrase, window);
                    return Some(AirportMatch::Airport(record));
                }
            }
        }

        for &token in &tokens {
            let hit = self.gazetteer.records().find(|r| {
                r.iata == token || r.icao == token || r.city == token || r.name.contains(token)
            });
            if let Some(record) = hit {
                debug!("Resolved '{}' via token '{}'", phrase, token);
                return Some(AirportMatch::Airport(record));
            }
        }

        None
    }

    /// First destination code found among the message's content words
    #[must_use]
    pub fn extract_destination(&self, text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        location_words(&lower)
            .find_map(|word| self.resolve_word(word))
            .map(|m| m.code())
    }

    /// Single-word strategies: codes, place id, city, then name fragment
    fn resolve_word(&self, word: &str) -> Option<AirportMatch<'_>> {
        if let Some(record) = self.exact_code(word) {
            return Some(AirportMatch::Airport(record));
        }

        if word.starts_with(PLACE_ID_PREFIX) {
            return Some(AirportMatch::PlaceId(word.to_string()));
        }

        if let Some(record) = self.gazetteer.by_city(word) {
            return Some(AirportMatch::Airport(record));
        }

        // "airport", "airfield" and friends would match almost any name
        if !word.contains("air") {
            if let Some(record) = self.gazetteer.by_name_fragment(word) {
                return Some(AirportMatch::Airport(record));
            }
        }

        None
    }

    fn exact_code(&self, code: &str) -> Option<&AirportRecord> {
        self.gazetteer
            .by_iata(code)
            .or_else(|| self.gazetteer.by_icao(code))
    }
}

/// Lower-cased content words: split on non-alphanumerics, drop short words and stop words
fn location_words(lower: &str) -> impl Iterator<Item = &str> {
    WORD_SPLIT
        .split(lower)
        .filter(|w| w.len() > 1 && !STOP_WORDS.contains(w))
}
