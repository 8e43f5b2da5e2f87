//! `FlightChat` - Conversational flight search assistant
//!
//! This library answers chat messages about flights, either through an AI
//! dialogue engine that calls a flight search tool or through a
//! deterministic pipeline of intent detection, airport resolution, search
//! and template rendering.

pub mod airports;
pub mod clock;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod formatter;
pub mod intent;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod search;
pub mod templates;

// Re-export core types for public API
pub use airports::{AirportMatch, AirportResolver, Gazetteer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AssistantConfig;
pub use dialogue::{DialogueSession, EngineReply, GeminiSession, ToolCall};
pub use error::AssistantError;
pub use intent::{ParamExtractor, is_flight_intent};
pub use models::{AirportRecord, FlightOffer, FlightQueryParams, FlightType, SortBy};
pub use orchestrator::{Assistant, ChatReply, ReplyStatus};
pub use search::{FlightSearch, FlightSearchClient, ProviderTransport, SerpApiTransport};
pub use templates::TemplateStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AssistantError>;
