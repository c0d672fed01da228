//! crates/onboarding_core/src/ai.rs
//!
//! The AI-driven side of the conversation: the context handed to the model,
//! the instruction prompt, and the parsing of the model's JSON reply.
//! `LlmConversationService` implements `AiConversationService` on top of any
//! raw `CompletionService`.

use crate::data::{DataField, OnboardingData};
use crate::domain::ConversationTurn;
use crate::ports::{AiConversationService, CompletionService, PortError, PortResult};
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

const ONBOARDING_PROMPT: &str = r#"You are an AI onboarding assistant. Your goal is to collect the following information from the user:
- What is their name
- What company do they work for
- What role do they have in the company
- What are they hoping to achieve with your research
- Is their company in the food and beverage industry
- What would the ideal output look like for them

Current context:
- Collected data: {collected_data}
- Missing fields: {missing_fields}
- Conversation history: {conversation_history}
- Current focus: {current_focus}

User just said: "{user_message}"

Respond with a JSON object containing:
{
  "response": "Your conversational response to the user",
  "extractedData": {
    "userName": "extracted name or null",
    "companyName": "extracted company or null",
    "role": "extracted role or null",
    "objective": "extracted objective or null",
    "inFoodAndBeverage": "true, false or null",
    "idealOutput": "extracted ideal output or null"
  },
  "isComplete": false
}

Set "isComplete" to true only if you have all required information.
Be conversational, natural.
Only ask for one piece of information at a time.
If you have all the pieces of information, respond with a statement, and no question."#;

//=========================================================================================
// Request and Reply Types
//=========================================================================================

/// Everything the model needs to know about the session so far.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiContext {
    pub collected_data: OnboardingData,
    pub missing_fields: Vec<DataField>,
    pub conversation_history: Vec<ConversationTurn>,
    pub current_focus: Option<DataField>,
}

impl AiContext {
    pub fn new(
        collected_data: OnboardingData,
        missing_fields: Vec<DataField>,
        conversation_history: Vec<ConversationTurn>,
    ) -> Self {
        let current_focus = missing_fields.first().copied();
        Self {
            collected_data,
            missing_fields,
            conversation_history,
            current_focus,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiReply {
    pub response: String,
    pub extracted_data: OnboardingData,
    pub is_complete: bool,
    pub usage: Option<Value>,
}

/// Raw output of a completion call: the parsed JSON content and token usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub content: Value,
    pub usage: Option<Value>,
}

//=========================================================================================
// Prompt and Parsing
//=========================================================================================

pub fn render_prompt(user_message: &str, context: &AiContext) -> String {
    let missing_fields = context
        .missing_fields
        .iter()
        .map(DataField::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let current_focus = context
        .current_focus
        .map(|field| field.as_str())
        .unwrap_or("none");

    static SLOT: OnceLock<Regex> = OnceLock::new();
    let slot = SLOT.get_or_init(|| {
        Regex::new(r"\{(collected_data|missing_fields|conversation_history|current_focus|user_message)\}")
            .expect("prompt slot pattern is valid")
    });

    // One pass, so user text that looks like a slot is never substituted.
    slot.replace_all(ONBOARDING_PROMPT, |caps: &Captures| match &caps[1] {
        "collected_data" => to_json(&context.collected_data),
        "missing_fields" => missing_fields.clone(),
        "conversation_history" => to_json(&context.conversation_history),
        "current_focus" => current_focus.to_string(),
        _ => user_message.to_string(),
    })
    .into_owned()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Parses model output as JSON, tolerating a surrounding markdown code fence.
pub fn parse_json_content(raw: &str) -> PortResult<Value> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced)
        .map_err(|e| PortError::Unexpected(format!("AI content is not valid JSON: {}", e)))
}

/// Reads the `{response, extractedData, isComplete}` object the prompt asks for.
pub fn parse_reply(content: &Value) -> PortResult<AiReply> {
    let object = content
        .as_object()
        .ok_or_else(|| PortError::Unexpected("AI content is not a JSON object".to_string()))?;

    let response = object
        .get("response")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let extracted_data = object
        .get("extractedData")
        .map(OnboardingData::from_ai_json)
        .unwrap_or_default();
    let is_complete = match object.get("isComplete") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    Ok(AiReply {
        response,
        extracted_data,
        is_complete,
        usage: None,
    })
}

//=========================================================================================
// LlmConversationService
//=========================================================================================

/// Drives the conversation with a language model reached through `CompletionService`.
#[derive(Clone)]
pub struct LlmConversationService {
    completion: Arc<dyn CompletionService>,
    temperature: f32,
}

impl LlmConversationService {
    pub fn new(completion: Arc<dyn CompletionService>, temperature: f32) -> Self {
        Self {
            completion,
            temperature,
        }
    }
}

#[async_trait]
impl AiConversationService for LlmConversationService {
    async fn respond(&self, user_message: &str, context: &AiContext) -> PortResult<AiReply> {
        let prompt = render_prompt(user_message, context);
        debug!("Rendered onboarding prompt ({} chars)", prompt.len());

        let started = Instant::now();
        let completion = self.completion.complete(&prompt, self.temperature).await?;
        info!("AI conversation reply received in {:?}", started.elapsed());

        let mut reply = parse_reply(&completion.content)?;
        reply.usage = completion.usage;
        Ok(reply)
    }
}
