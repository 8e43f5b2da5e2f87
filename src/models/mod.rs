//! Data models for the flight assistant
//!
//! - Airport: gazetteer records
//! - Flight: search parameters and provider offers

pub mod airport;
pub mod flight;

// Re-export all public types for convenient access
pub use airport::AirportRecord;
pub use flight::{AirportStop, FlightLeg, FlightOffer, FlightQueryParams, FlightType, SortBy};
