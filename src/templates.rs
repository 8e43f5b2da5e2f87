//! Response Template Store
//!
//! Categorised reply templates and trigger-phrase canned answers, loaded
//! once from static data. Until loading completes every lookup returns
//! `None`; callers must wait on [`TemplateStore::load`] before serving.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rand::RngExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::{AssistantError, Result};

/// Template category names used by the assistant
pub mod category {
    pub const GENERIC_ERROR: &str = "genericError";
    pub const UNKNOWN_QUESTION: &str = "unknownQuestion";
    pub const NO_DESTINATION: &str = "noDestIATA";
    pub const NO_FLIGHTS_FOUND: &str = "noFlightsFound";
    pub const FLIGHT_RESULT: &str = "flightResult";
}

/// A canned topic: any trigger phrase selects one of the responses
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEntry {
    #[serde(default)]
    pub trigger_words: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
}

/// Parsed template file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseCatalog {
    /// Topic name -> trigger entry, matched in name order
    #[serde(default)]
    pub about: BTreeMap<String, TriggerEntry>,
    /// Category name -> candidate templates
    #[serde(flatten)]
    pub categories: HashMap<String, Vec<String>>,
}

impl ResponseCatalog {
    /// Parse a catalog; a one-element array wrapper is unwrapped
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let value = match value {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            Value::Array(_) => {
                return Err(AssistantError::template("Template file is an empty array"));
            }
            other => other,
        };
        Ok(serde_json::from_value(value)?)
    }
}

fn pick(candidates: &[String]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..candidates.len());
    Some(candidates[idx].clone())
}

/// Write-once template store
#[derive(Debug, Default)]
pub struct TemplateStore {
    catalog: OnceCell<ResponseCatalog>,
}

impl TemplateStore {
    /// An empty store in the not-yet-loaded state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ready store from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let store = Self::new();
        store.install(ResponseCatalog::from_json_str(json)?)?;
        Ok(store)
    }

    /// Build a ready store from a JSON file
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::new();
        store.load(path).await?;
        Ok(store)
    }

    /// Read and install the catalog. Fails if the store is already loaded.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            AssistantError::template(format!(
                "Failed to read templates {}: {e}",
                path.display()
            ))
        })?;
        let catalog = ResponseCatalog::from_json_str(&json)?;
        info!(
            "Loaded {} template categories and {} trigger topics",
            catalog.categories.len(),
            catalog.about.len()
        );
        self.install(catalog)
    }

    fn install(&self, catalog: ResponseCatalog) -> Result<()> {
        self.catalog
            .set(catalog)
            .map_err(|_| AssistantError::template("Templates already loaded"))
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.catalog.initialized()
    }

    /// Random template from `category`; `None` if not loaded or unknown
    #[must_use]
    pub fn random_response(&self, category: &str) -> Option<String> {
        let catalog = self.catalog.get()?;
        pick(catalog.categories.get(category)?)
    }

    /// Canned answer for the first topic whose trigger phrase occurs in `text`
    #[must_use]
    pub fn match_trigger(&self, text: &str) -> Option<String> {
        let catalog = self.catalog.get()?;
        let lower = text.to_lowercase();
        let (topic, entry) = catalog.about.iter().find(|(_, entry)| {
            entry
                .trigger_words
                .iter()
                .any(|t| !t.is_empty() && lower.contains(&t.to_lowercase()))
        })?;
        debug!("Matched predefined topic '{}'", topic);
        pick(&entry.responses)
    }

    /// Reply for messages no topic matched
    #[must_use]
    pub fn unmatched_fallback(&self) -> Option<String> {
        self.random_response(category::UNKNOWN_QUESTION)
            .or_else(|| self.random_response(category::GENERIC_ERROR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATES: &str = r#"[{
        "about": {
            "creator": {"triggerWords": ["who made you", "who built you"], "responses": ["A small team of enthusiasts."]},
            "identity": {"triggerWords": ["who are you"], "responses": ["An old aviator.", "A pilot at heart."]}
        },
        "genericError": ["Static on the line."],
        "unknownQuestion": ["I only know about flights."],
        "noDestIATA": ["Where to, exactly?"]
    }]"#;

    #[test]
    fn test_unloaded_store_returns_nothing() {
        let store = TemplateStore::new();
        assert!(!store.is_ready());
        assert!(store.random_response(category::GENERIC_ERROR).is_none());
        assert!(store.match_trigger("who are you").is_none());
        assert!(store.unmatched_fallback().is_none());
    }

    #[test]
    fn test_random_response_comes_from_category() {
        let store = TemplateStore::from_json_str(TEMPLATES).unwrap();
        assert!(store.is_ready());
        assert_eq!(
            store.random_response(category::NO_DESTINATION).as_deref(),
            Some("Where to, exactly?")
        );
        assert!(store.random_response("missingCategory").is_none());
    }

    #[test]
    fn test_match_trigger() {
        let store = TemplateStore::from_json_str(TEMPLATES).unwrap();
        let reply = store.match_trigger("Hey, WHO ARE YOU anyway?").unwrap();
        assert!(["An old aviator.", "A pilot at heart."].contains(&reply.as_str()));
        assert!(store.match_trigger("what is the weather").is_none());
    }

    #[test]
    fn test_unmatched_fallback_prefers_unknown_question() {
        let store = TemplateStore::from_json_str(TEMPLATES).unwrap();
        assert_eq!(
            store.unmatched_fallback().as_deref(),
            Some("I only know about flights.")
        );

        let store = TemplateStore::from_json_str(r#"{"genericError": ["Static."]}"#).unwrap();
        assert_eq!(store.unmatched_fallback().as_deref(), Some("Static."));
    }

    #[test]
    fn test_load_twice_is_rejected() {
        let store = TemplateStore::from_json_str(TEMPLATES).unwrap();
        let catalog = ResponseCatalog::from_json_str(TEMPLATES).unwrap();
        assert!(matches!(
            store.install(catalog),
            Err(AssistantError::Template { .. })
        ));
    }

    #[test]
    fn test_empty_array_is_rejected() {
        assert!(TemplateStore::from_json_str("[]").is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = TemplateStore::from_path("no/such/responses.json").await;
        assert!(matches!(result, Err(AssistantError::Template { .. })));
    }
}
