//! Google Gemini dialogue session
//!
//! Talks to the `generateContent` REST endpoint with a persona system
//! instruction and a single `searchFlights` function declaration. The
//! conversation history lives in the session and is replayed on every call.
//! An exchange either completes or leaves the history as it was, and a
//! function call that never received a result is dropped before the next
//! user turn.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::{DialogueSession, EngineReply, SEARCH_FLIGHTS_TOOL, ToolCall};
use crate::config::DialogueConfig;
use crate::{AssistantError, Result};

const SYSTEM_INSTRUCTION: &str = r#"You are Amelia Earhart, the pioneering aviator. You know aviation inside out and you love helping people find flights. Speak with confidence, calm and a love of flight, and keep replies short.

PERSONA AND FORMATTING:
1. Tone: warm, enthusiastic and conversational, with an adventurous spirit.
2. Diction: phrasing of a mid-20th-century American aviator, such as "Splendid", "A fine journey", "The skies await" or "That's the ticket".
3. No markdown lists. Never use asterisks, bullets or numbering for flight details; weave them into sentences. Start a new paragraph for each flight.
4. Only mention departure and arrival times and dates, airlines and price unless asked for more. Layovers may be mentioned. Never mention flight duration.
5. Prices are in GBP and must be written with the pound sign (£).
6. For round trips state the outbound and return flights in plain sentences.

DATES:
1. Each user message starts with [Current Date: YYYY-MM-DD]. The user's words follow "User:".
2. Resolve every relative date ("tomorrow", "next weekend", "this Friday") against that date.
3. A day and month without a year, a bare day number or a bare month means the next upcoming occurrence.
4. Flights are one way unless the user asks for a return. A return without a return date comes back one week after departure.
5. Never ask for a year unless it is truly unavoidable.

Infer missing details and make reasonable assumptions rather than asking clarifying questions."#;

fn function_declaration() -> Value {
    let string_param = |description: &str| json!({"type": "STRING", "description": description});
    json!({
        "name": SEARCH_FLIGHTS_TOOL,
        "description": "Returns the best flights between two airports on the given dates.",
        "parameters": {
            "type": "OBJECT",
            "properties": {
                "origin": string_param("IATA code of the departure airport. Separate several airports with commas, e.g. CDG,ORY,/m/04jpl. For a region such as London list its airports (LGW,LHR,STN,LCY,SEN) instead of a region code."),
                "destination": string_param("IATA code of the arrival airport. Several airports may be separated with commas, e.g. CDG,ORY,/m/04jpl."),
                "departure_date": string_param("Optional departure date as YYYY-MM-DD. When absent the first available flight is returned."),
                "flight_type": string_param("1 for round trip, 2 for one way, 3 for multi-city."),
                "return_date": string_param("Return date as YYYY-MM-DD. Required when flight_type is 1."),
                "exclude_airlines": string_param("Comma separated 2-character IATA airline codes to exclude. Cannot be combined with include_airlines."),
                "include_airlines": string_param("Comma separated 2-character IATA airline codes to include. Cannot be combined with exclude_airlines."),
                "max_price": string_param("Maximum ticket price. Unlimited by default."),
                "sort_by": string_param("Sort order: 1 top flights (default), 2 price, 3 departure time, 4 arrival time, 5 duration, 6 emissions.")
            },
            "required": ["flight_type"]
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

/// Replayed conversation contents
#[derive(Debug, Default)]
struct Transcript {
    contents: Vec<Value>,
    /// Start of the exchange whose function call still awaits a result
    open_call: Option<usize>,
}

impl Transcript {
    /// Open an exchange with a user turn, discarding an unanswered call first
    fn begin_turn(&mut self, turn: Value) -> usize {
        if let Some(start) = self.open_call.take() {
            warn!("Discarding unanswered function call from history");
            self.contents.truncate(start);
        }
        let start = self.contents.len();
        self.contents.push(turn);
        start
    }

    /// Continue the open exchange with a function response
    fn begin_tool_result(&mut self, turn: Value) -> Result<usize> {
        let start = self
            .open_call
            .take()
            .ok_or_else(|| AssistantError::dialogue("No function call awaiting a result"))?;
        self.contents.push(turn);
        Ok(start)
    }

    fn commit(&mut self, start: usize, content: Value, reply: &EngineReply) {
        self.contents.push(content);
        self.open_call = reply.tool_call.is_some().then_some(start);
    }

    /// Drop the whole exchange starting at `start`
    fn rollback(&mut self, start: usize) {
        self.contents.truncate(start);
        self.open_call = None;
    }
}

/// Chat session with history guarded for sequential turns
pub struct GeminiSession {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    transcript: Mutex<Transcript>,
}

impl GeminiSession {
    pub fn new(config: &DialogueConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AssistantError::config("Gemini API key not configured"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AssistantError::config(format!("Failed to build HTTP client: {e}")))?;

        info!("Gemini session initialised with model {}", config.model);

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            transcript: Mutex::new(Transcript::default()),
        })
    }

    fn request_body(history: &[Value]) -> Value {
        json!({
            "system_instruction": {"parts": [{"text": SYSTEM_INSTRUCTION}]},
            "contents": history,
            "tools": [{"function_declarations": [function_declaration()]}]
        })
    }

    /// Ask the model with the pending turn in place; keep its content or roll back
    async fn exchange(&self, transcript: &mut Transcript, start: usize) -> Result<EngineReply> {
        let outcome = self
            .generate(&transcript.contents)
            .await
            .and_then(|content| parse_content(&content).map(|reply| (content, reply)));

        match outcome {
            Ok((content, reply)) => {
                transcript.commit(start, content, &reply);
                Ok(reply)
            }
            Err(e) => {
                transcript.rollback(start);
                Err(e)
            }
        }
    }

    async fn generate(&self, history: &[Value]) -> Result<Value> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("Sending {} turns to {}", history.len(), url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(history))
            .send()
            .await
            .map_err(|e| AssistantError::dialogue(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AssistantError::dialogue(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            error!("Gemini API error: {} - {}", status, body);
            return Err(AssistantError::dialogue(format!("HTTP {status}: {body}")));
        }

        let response: GenerateResponse = serde_json::from_str(&body)?;
        let mut content = response
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .ok_or_else(|| AssistantError::dialogue("No candidates in response"))?;

        if let Some(object) = content.as_object_mut() {
            object.entry("role").or_insert_with(|| json!("model"));
        }
        Ok(content)
    }
}

fn user_text(text: &str) -> Value {
    json!({"role": "user", "parts": [{"text": text}]})
}

/// First function call wins; otherwise the concatenated text parts
fn parse_content(content: &Value) -> Result<EngineReply> {
    let content: Content = serde_json::from_value(content.clone())?;

    let mut text = String::new();
    for part in content.parts {
        if let Some(call) = part.function_call {
            debug!("Model requested tool {}", call.name);
            return Ok(EngineReply {
                text: None,
                tool_call: Some(ToolCall {
                    name: call.name,
                    args: call.args,
                }),
            });
        }
        if let Some(chunk) = part.text {
            text.push_str(&chunk);
        }
    }

    if text.trim().is_empty() {
        return Err(AssistantError::dialogue("Model returned no text"));
    }
    Ok(EngineReply::text(text))
}

#[async_trait]
impl DialogueSession for GeminiSession {
    #[instrument(skip(self, text))]
    async fn send_turn(&self, text: &str) -> Result<EngineReply> {
        let mut transcript = self.transcript.lock().await;
        let start = transcript.begin_turn(user_text(text));
        self.exchange(&mut transcript, start).await
    }

    #[instrument(skip(self, result))]
    async fn send_tool_result(&self, name: &str, result: Value) -> Result<EngineReply> {
        let mut transcript = self.transcript.lock().await;
        let start = transcript.begin_tool_result(json!({
            "role": "user",
            "parts": [{"functionResponse": {"name": name, "response": result}}]
        }))?;
        self.exchange(&mut transcript, start).await
    }
}
