//! Chat Orchestrator
//!
//! Routes each message through intent detection, canned answers, the AI
//! dialogue engine and the deterministic fallback pipeline. Every path ends
//! in reply text; nothing escapes [`Assistant::handle`] as an error.

pub mod tool_args;

pub use tool_args::validate_tool_call;

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::dialogue::{DialogueSession, EngineReply};
use crate::formatter::{format_offers, generic_reply};
use crate::intent::{ParamExtractor, is_flight_intent};
use crate::models::{FlightQueryParams, flight::DATE_FORMAT};
use crate::search::FlightSearch;
use crate::templates::{TemplateStore, category};
use crate::{AssistantError, Result};

/// Terminal marker on replies produced by the AI engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Done,
}

/// Reply handed to the chat surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReplyStatus>,
}

impl ChatReply {
    fn plain(reply: String) -> Self {
        Self {
            reply,
            status: None,
        }
    }

    fn done(reply: String) -> Self {
        Self {
            reply,
            status: Some(ReplyStatus::Done),
        }
    }
}

/// Result of one AI exchange
#[derive(Debug)]
pub enum TurnOutcome {
    /// Final model text
    Answered(String),
    /// The model proposed a tool call that failed validation
    Rejected(AssistantError),
}

/// Steps of the two-phase tool-calling exchange
#[derive(Debug)]
enum ConversationState {
    AwaitingInitial,
    Searching {
        tool: String,
        params: FlightQueryParams,
    },
    AwaitingFinal {
        tool: String,
        result: Value,
    },
    Done(String),
}

/// The flight assistant
pub struct Assistant {
    extractor: ParamExtractor,
    templates: Arc<TemplateStore>,
    search: Arc<dyn FlightSearch>,
    dialogue: Option<Arc<dyn DialogueSession>>,
    clock: Arc<dyn Clock>,
}

impl Assistant {
    /// Build an assistant without an AI engine. Fails unless the templates are loaded.
    pub fn new(
        extractor: ParamExtractor,
        templates: Arc<TemplateStore>,
        search: Arc<dyn FlightSearch>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if !templates.is_ready() {
            return Err(AssistantError::template(
                "Templates must be loaded before serving requests",
            ));
        }
        Ok(Self {
            extractor,
            templates,
            search,
            dialogue: None,
            clock,
        })
    }

    /// Route messages through the given AI engine
    #[must_use]
    pub fn with_dialogue(mut self, dialogue: Arc<dyn DialogueSession>) -> Self {
        self.dialogue = Some(dialogue);
        self
    }

    #[must_use]
    pub fn has_dialogue(&self) -> bool {
        self.dialogue.is_some()
    }

    #[must_use]
    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Entry point for the chat surface
    pub async fn handle_chat_message(&self, text: &str) -> ChatReply {
        self.handle(text).await
    }

    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn handle(&self, text: &str) -> ChatReply {
        if text.trim().is_empty() {
            debug!("Empty message");
            return ChatReply::plain(self.generic());
        }

        let today = self.clock.today();

        let params = if is_flight_intent(text) {
            match self.extractor.extract_params(text, today) {
                Some(params) => Some(params),
                None => {
                    info!("Flight intent without a usable destination");
                    return ChatReply::plain(self.category_or_generic(category::NO_DESTINATION));
                }
            }
        } else {
            if let Some(canned) = self.templates.match_trigger(text) {
                return ChatReply::plain(canned);
            }
            if self.dialogue.is_none() {
                return ChatReply::plain(
                    self.templates
                        .unmatched_fallback()
                        .unwrap_or_else(|| self.generic()),
                );
            }
            None
        };

        let Some(dialogue) = self.dialogue.as_deref() else {
            return match params {
                Some(params) => ChatReply::plain(self.fallback_search(&params).await),
                None => ChatReply::plain(self.generic()),
            };
        };

        match self.converse(dialogue, text, today).await {
            Ok(TurnOutcome::Answered(reply)) => ChatReply::done(reply),
            Ok(TurnOutcome::Rejected(reason)) => {
                warn!("Rejected tool call: {}", reason);
                ChatReply::plain(self.generic())
            }
            Err(e) => {
                warn!("AI path failed: {}", e);
                match params {
                    Some(params) => ChatReply::plain(self.fallback_search(&params).await),
                    None => ChatReply::plain(self.generic()),
                }
            }
        }
    }

    /// Run the tool-calling exchange to completion
    pub async fn converse(
        &self,
        dialogue: &dyn DialogueSession,
        text: &str,
        today: NaiveDate,
    ) -> Result<TurnOutcome> {
        let mut state = ConversationState::AwaitingInitial;

        loop {
            state = match state {
                ConversationState::AwaitingInitial => {
                    let reply = dialogue.send_turn(&dated_prompt(text, today)).await?;
                    match reply.tool_call {
                        Some(call) => {
                            match validate_tool_call(&call, self.extractor.home_airports()) {
                                Ok(params) => ConversationState::Searching {
                                    tool: call.name,
                                    params,
                                },
                                Err(e) => return Ok(TurnOutcome::Rejected(e)),
                            }
                        }
                        None => ConversationState::Done(reply_text(reply)?),
                    }
                }
                ConversationState::Searching { tool, params } => {
                    debug!("Running {} for {}", tool, params.destination);
                    let offers = self.search.search(&params).await;
                    ConversationState::AwaitingFinal {
                        tool,
                        result: json!({ "flights": offers }),
                    }
                }
                ConversationState::AwaitingFinal { tool, result } => {
                    let reply = dialogue.send_tool_result(&tool, result).await?;
                    ConversationState::Done(reply_text(reply)?)
                }
                ConversationState::Done(text) => return Ok(TurnOutcome::Answered(text)),
            };
        }
    }

    async fn fallback_search(&self, params: &FlightQueryParams) -> String {
        let offers = self.search.search(params).await;
        format_offers(offers.as_deref(), params, &self.templates)
    }

    fn generic(&self) -> String {
        generic_reply(&self.templates)
    }

    fn category_or_generic(&self, name: &str) -> String {
        self.templates
            .random_response(name)
            .unwrap_or_else(|| self.generic())
    }
}

fn dated_prompt(text: &str, today: NaiveDate) -> String {
    format!("[Current Date: {}]\nUser: {}", today.format(DATE_FORMAT), text)
}

fn reply_text(reply: EngineReply) -> Result<String> {
    reply
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AssistantError::dialogue("Engine reply carried no text"))
}
