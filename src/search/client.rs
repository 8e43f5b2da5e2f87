//! Flight Search Client
//!
//! Turns validated query parameters into provider requests and interprets
//! the answers. Provider failures never escape [`FlightSearch::search`]; they
//! are logged and reported as `None`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{FlightSearch, ProviderTransport, SerpApiTransport};
use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::models::{FlightOffer, FlightQueryParams, flight::DATE_FORMAT};
use crate::{AssistantError, Result};

/// Error text the provider returns alongside a successful status when nothing matched
pub const NO_RESULTS_MESSAGE: &str = "Google Flights hasn't returned any results for this query.";

const SUCCESS_STATUS: &str = "Success";

#[derive(Debug, Deserialize)]
struct SearchMetadata {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    search_metadata: Option<SearchMetadata>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    best_flights: Option<Vec<FlightOffer>>,
    #[serde(default)]
    flights: Option<Vec<FlightOffer>>,
}

impl ProviderResponse {
    fn into_offers(self) -> Result<Vec<FlightOffer>> {
        let status = self.search_metadata.and_then(|m| m.status);
        if status.as_deref() != Some(SUCCESS_STATUS) {
            let detail = self.error.unwrap_or_default();
            return Err(AssistantError::provider(format!(
                "Search status {}: {detail}",
                status.as_deref().unwrap_or("missing")
            )));
        }

        if self.error.as_deref() == Some(NO_RESULTS_MESSAGE) {
            debug!("Provider reported no results");
            return Ok(Vec::new());
        }

        let offers = match (self.best_flights, self.flights) {
            (Some(best), _) if !best.is_empty() => best,
            (_, Some(flights)) => flights,
            _ => Vec::new(),
        };
        Ok(offers)
    }
}

/// SerpApi Google Flights client
pub struct FlightSearchClient {
    transport: Arc<dyn ProviderTransport>,
    clock: Arc<dyn Clock>,
    api_key: Option<String>,
    engine: String,
    currency: String,
    timeout: Duration,
    date_attempts: u32,
}

impl FlightSearchClient {
    pub fn new(
        config: &ProviderConfig,
        transport: Arc<dyn ProviderTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            clock,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            engine: config.engine.clone(),
            currency: config.currency.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            date_attempts: config.date_attempts,
        }
    }

    /// Client talking to SerpApi over HTTP
    pub fn from_config(config: &ProviderConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let transport = Arc::new(SerpApiTransport::new(config)?);
        Ok(Self::new(config, transport, clock))
    }

    /// Override the dated-search timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search, surfacing provider failures as errors
    pub async fn try_search(&self, params: &FlightQueryParams) -> Result<Vec<FlightOffer>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AssistantError::provider("SerpApi API key not configured"));
        };
        let query = self.base_query(api_key, params);

        match params.departure_date {
            Some(date) => {
                let query = with_outbound_date(query, date);
                tokio::time::timeout(self.timeout, self.fetch_offers(&query))
                    .await
                    .map_err(|_| {
                        AssistantError::provider(format!(
                            "Search timed out after {}s",
                            self.timeout.as_secs_f32()
                        ))
                    })?
            }
            None => self.search_upcoming_dates(query).await,
        }
    }

    /// Try today, tomorrow, ... until a date has offers
    async fn search_upcoming_dates(
        &self,
        query: Vec<(&'static str, String)>,
    ) -> Result<Vec<FlightOffer>> {
        let today = self.clock.today();

        for attempt in 0..self.date_attempts {
            let Some(date) = today.checked_add_days(Days::new(attempt.into())) else {
                break;
            };
            debug!("Attempt {}: trying outbound date {}", attempt + 1, date);

            let offers = self
                .fetch_offers(&with_outbound_date(query.clone(), date))
                .await?;
            if !offers.is_empty() {
                info!("Found flights on attempt {}", attempt + 1);
                return Ok(offers);
            }
        }

        debug!("No flights in the next {} days", self.date_attempts);
        Ok(Vec::new())
    }

    async fn fetch_offers(&self, query: &[(&'static str, String)]) -> Result<Vec<FlightOffer>> {
        let body: Value = self.transport.fetch(query).await?;
        let response: ProviderResponse = serde_json::from_value(body)?;
        response.into_offers()
    }

    /// Request parameters from the non-empty fields of `params`
    fn base_query(&self, api_key: &str, params: &FlightQueryParams) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("engine", self.engine.clone()),
            ("api_key", api_key.to_string()),
            ("type", params.flight_type.provider_code().to_string()),
            ("currency", self.currency.clone()),
        ];

        let origin = params.origin_csv();
        if !origin.is_empty() {
            query.push(("departure_id", origin));
        }
        if !params.destination.is_empty() {
            query.push(("arrival_id", params.destination.clone()));
        }
        if let Some(date) = params.return_date {
            query.push(("return_date", date.format(DATE_FORMAT).to_string()));
        }

        let exclude = non_empty(params.exclude_airlines.as_deref());
        let include = non_empty(params.include_airlines.as_deref());
        match (exclude, include) {
            (Some(exclude), _) => query.push(("exclude_airlines", exclude.to_string())),
            (None, Some(include)) => query.push(("include_airlines", include.to_string())),
            (None, None) => {}
        }

        if let Some(max_price) = params.max_price {
            query.push(("max_price", max_price.to_string()));
        }
        if let Some(sort_by) = params.sort_by {
            query.push(("sort_by", sort_by.provider_code().to_string()));
        }
        query
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn with_outbound_date(
    mut query: Vec<(&'static str, String)>,
    date: NaiveDate,
) -> Vec<(&'static str, String)> {
    query.retain(|(key, _)| *key != "outbound_date");
    query.push(("outbound_date", date.format(DATE_FORMAT).to_string()));
    query
}

#[async_trait]
impl FlightSearch for FlightSearchClient {
    #[instrument(
        skip(self, params),
        fields(origin = %params.origin_csv(), destination = %params.destination)
    )]
    async fn search(&self, params: &FlightQueryParams) -> Option<Vec<FlightOffer>> {
        match self.try_search(params).await {
            Ok(offers) => {
                info!("Flight search returned {} offers", offers.len());
                Some(offers)
            }
            Err(e) => {
                warn!("Flight search failed: {}", e);
                None
            }
        }
    }
}
