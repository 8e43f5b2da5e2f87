//! End-to-end behaviour of the assistant against the shipped data files,
//! with the dialogue engine and the provider replaced by in-process fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};

use flightchat::config::ProviderConfig;
use flightchat::search::client::NO_RESULTS_MESSAGE;
use flightchat::{
    AirportResolver, Assistant, AssistantError, DialogueSession, EngineReply, FixedClock,
    FlightOffer, FlightQueryParams, FlightSearch, FlightSearchClient, FlightType, Gazetteer,
    ParamExtractor, ProviderTransport, ReplyStatus, Result, TemplateStore,
};

const AIRPORTS: &str = "data/airports.json";
const RESPONSES: &str = "data/responses.json";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn extractor() -> ParamExtractor {
    let gazetteer = Gazetteer::from_path(AIRPORTS).unwrap();
    ParamExtractor::new(
        AirportResolver::new(Arc::new(gazetteer)),
        vec!["LGW".into(), "LHR".into()],
    )
}

async fn templates() -> Arc<TemplateStore> {
    Arc::new(TemplateStore::from_path(RESPONSES).await.unwrap())
}

/// Raw template strings of one category, for membership assertions
fn category(name: &str) -> Vec<String> {
    let raw: Value = serde_json::from_str(&std::fs::read_to_string(RESPONSES).unwrap()).unwrap();
    serde_json::from_value(raw[0][name].clone()).unwrap()
}

async fn assistant(search: Arc<dyn FlightSearch>) -> Assistant {
    Assistant::new(
        extractor(),
        templates().await,
        search,
        Arc::new(FixedClock(today())),
    )
    .unwrap()
}

/// Provider fake returning one fixed body and counting calls
struct FixedTransport {
    body: Value,
    calls: AtomicUsize,
}

impl FixedTransport {
    fn new(body: Value) -> Arc<Self> {
        Arc::new(Self {
            body,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProviderTransport for FixedTransport {
    async fn fetch(&self, _query: &[(&'static str, String)]) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

fn search_client(transport: Arc<FixedTransport>, api_key: Option<&str>) -> Arc<FlightSearchClient> {
    let config = ProviderConfig {
        api_key: api_key.map(String::from),
        ..ProviderConfig::default()
    };
    Arc::new(FlightSearchClient::new(
        &config,
        transport,
        Arc::new(FixedClock(today())),
    ))
}

/// Search fake that records every invocation
#[derive(Default)]
struct CountingSearch {
    calls: AtomicUsize,
}

#[async_trait]
impl FlightSearch for CountingSearch {
    async fn search(&self, _params: &FlightQueryParams) -> Option<Vec<FlightOffer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(Vec::new())
    }
}

/// Dialogue fake answering every turn with the same reply
struct ScriptedSession {
    reply: EngineReply,
    turns: Mutex<Vec<String>>,
}

impl ScriptedSession {
    fn new(reply: EngineReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            turns: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DialogueSession for ScriptedSession {
    async fn send_turn(&self, text: &str) -> Result<EngineReply> {
        self.turns.lock().unwrap().push(text.to_string());
        Ok(self.reply.clone())
    }

    async fn send_tool_result(&self, _name: &str, _result: Value) -> Result<EngineReply> {
        Err(AssistantError::dialogue("no tool results expected"))
    }
}

#[test]
fn scenario_a_extracts_one_way_trip() {
    let params = extractor()
        .extract_params("flight from London to Paris", today())
        .unwrap();

    assert_eq!(params.origin, vec!["LHR"]);
    assert_eq!(params.destination, "CDG");
    assert_eq!(params.departure_date, NaiveDate::from_ymd_opt(2024, 1, 2));
    assert_eq!(params.flight_type, FlightType::OneWay);
}

#[test]
fn function_words_before_destination_are_skipped() {
    let extractor = extractor();
    for text in [
        "Any flights in May to Rome?",
        "Is there a flight to Rome?",
        "fly to Rome in June",
    ] {
        let params = extractor.extract_params(text, today()).unwrap();
        assert_eq!(params.destination, "FCO", "{text}");
    }
}

#[tokio::test]
async fn scenario_b_unknown_destination() {
    let assistant = assistant(Arc::new(CountingSearch::default())).await;
    let reply = assistant.handle("I'd like to go somewhere nice").await;

    assert!(category("noDestIATA").contains(&reply.reply));
    assert!(reply.status.is_none());
}

#[tokio::test]
async fn scenario_c_provider_reports_no_results() {
    let transport = FixedTransport::new(json!({
        "search_metadata": {"status": "Success"},
        "error": NO_RESULTS_MESSAGE
    }));
    let search = search_client(transport.clone(), Some("test-key"));

    let params = extractor()
        .extract_params("flight from London to Paris on 2024-03-15", today())
        .unwrap();
    assert_eq!(search.search(&params).await, Some(vec![]));

    let assistant = assistant(search).await;
    let reply = assistant
        .handle("flight from London to Paris on 2024-03-15")
        .await;

    assert!(reply.reply.contains("LHR"));
    assert!(reply.reply.contains("CDG"));
    assert!(!reply.reply.contains("{{") && !reply.reply.contains("}}"));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scenario_d_missing_credential() {
    let transport = FixedTransport::new(json!({"search_metadata": {"status": "Success"}}));
    let assistant = assistant(search_client(transport.clone(), None)).await;

    let reply = assistant.handle("flights from London to Paris").await;

    assert!(category("genericError").contains(&reply.reply));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_e_tool_call_without_destination() {
    let search = Arc::new(CountingSearch::default());
    let session = ScriptedSession::new(EngineReply::tool_call(
        "searchFlights",
        json!({"origin": "LHR", "flight_type": "2"}),
    ));
    let assistant = assistant(search.clone()).await.with_dialogue(session);

    let reply = assistant.handle("flight from London to Paris").await;

    assert!(category("genericError").contains(&reply.reply));
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_f_plain_text_is_returned_verbatim() {
    let session = ScriptedSession::new(EngineReply::text(
        "Crossing the Atlantic was cold, lonely and utterly grand.",
    ));
    let assistant = assistant(Arc::new(CountingSearch::default()))
        .await
        .with_dialogue(session.clone());

    let reply = assistant
        .handle("What was it like crossing the Atlantic?")
        .await;

    assert_eq!(
        reply.reply,
        "Crossing the Atlantic was cold, lonely and utterly grand."
    );
    assert_eq!(reply.status, Some(ReplyStatus::Done));
    assert_eq!(
        session.turns.lock().unwrap()[0],
        "[Current Date: 2024-01-01]\nUser: What was it like crossing the Atlantic?"
    );
}

#[tokio::test]
async fn fallback_renders_offers_from_provider() {
    let transport = FixedTransport::new(json!({
        "search_metadata": {"status": "Success"},
        "best_flights": [{
            "flights": [{
                "departure_airport": {"name": "Heathrow Airport", "id": "LHR", "time": "2024-01-02 08:15"},
                "arrival_airport": {"name": "Paris Charles de Gaulle Airport", "id": "CDG", "time": "2024-01-02 10:30"},
                "airline": "Air France",
                "flight_number": "AF 1081",
                "duration": 75
            }],
            "price": 112,
            "type": "One way"
        }]
    }));
    let assistant = assistant(search_client(transport, Some("test-key"))).await;

    let reply = assistant.handle("flight from London to Paris").await;

    assert!(reply.reply.contains("Air France"));
    assert!(reply.reply.contains("08:15"));
    assert!(reply.reply.contains("£112"));
    assert!(!reply.reply.contains("{{") && !reply.reply.contains("}}"));
}

#[tokio::test]
async fn canned_topics_answer_without_ai() {
    let assistant = assistant(Arc::new(CountingSearch::default())).await;
    let reply = assistant.handle_chat_message("Who are you?").await;

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(RESPONSES).unwrap()).unwrap();
    let identity: Vec<String> =
        serde_json::from_value(raw[0]["about"]["identity"]["responses"].clone()).unwrap();
    assert!(identity.contains(&reply.reply));
}

#[test]
fn shipped_gazetteer_resolves_every_code() {
    let gazetteer = Arc::new(Gazetteer::from_path(AIRPORTS).unwrap());
    let resolver = AirportResolver::new(gazetteer.clone());

    // The shipped file carries one airfield without an IATA code
    assert_eq!(gazetteer.len(), 45);
    for record in gazetteer.records() {
        assert!(record.has_code(&record.iata));
        assert_eq!(resolver.resolve_by_code(&record.iata.to_uppercase()), Some(record));
        assert_eq!(resolver.resolve_by_code(&record.icao.to_uppercase()), Some(record));
    }
}
