//! Flight search
//!
//! - Client: request building, date probing and response interpretation
//! - Transport: the HTTP call to the provider

pub mod client;
pub mod transport;

pub use client::FlightSearchClient;
pub use transport::{ProviderTransport, SerpApiTransport};

use async_trait::async_trait;

use crate::models::{FlightOffer, FlightQueryParams};

/// Flight search as seen by the orchestrator.
///
/// `None` is a provider error; `Some(vec![])` means the provider answered
/// and found nothing.
#[async_trait]
pub trait FlightSearch: Send + Sync {
    async fn search(&self, params: &FlightQueryParams) -> Option<Vec<FlightOffer>>;
}
