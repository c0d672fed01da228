//! crates/onboarding_core/src/slots.rs
//!
//! The slot schema: the ordered list of questions the wizard asks, one per
//! data field. The schema is loaded once at start-up and validated there; a
//! malformed schema is the only fatal configuration error in the system.

use crate::data::{DataField, OnboardingData};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// A single data point to collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    pub prompt: String,
    /// Acknowledgement spoken after the answer; may contain `{field}` placeholders.
    pub follow_up: String,
    pub data_field: DataField,
}

impl Slot {
    pub fn new(id: &str, prompt: &str, follow_up: &str, data_field: DataField) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            follow_up: follow_up.to_string(),
            data_field,
        }
    }

    pub fn render_prompt(&self, data: &OnboardingData) -> String {
        render_template(&self.prompt, data)
    }

    pub fn render_follow_up(&self, data: &OnboardingData) -> String {
        render_template(&self.follow_up, data)
    }

    /// The slot that confirms the company belongs to the food and beverage industry.
    pub fn is_industry_check(&self) -> bool {
        self.id == "industry" || self.data_field == DataField::IndustryConfirmed
    }
}

/// Replaces `{field}` placeholders with collected values. Placeholders that
/// cannot be resolved are left in place, braces included.
pub fn render_template(template: &str, data: &OnboardingData) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let placeholder =
        PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

    placeholder
        .replace_all(template, |caps: &Captures| {
            caps[1]
                .parse::<DataField>()
                .ok()
                .and_then(|field| data.get(field))
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

//=========================================================================================
// Schema Errors
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("The slot schema contains no slots")]
    Empty,
    #[error("Slot {0} has no id")]
    MissingId(usize),
    #[error("Slot '{0}' has no prompt")]
    MissingPrompt(String),
    #[error("Slot id '{0}' is used more than once")]
    DuplicateId(String),
    #[error("Data field {0} is collected by more than one slot")]
    DuplicateField(DataField),
    #[error("No slot collects the data field {0}")]
    MissingField(DataField),
    #[error("Could not parse the slot schema: {0}")]
    Parse(String),
}

//=========================================================================================
// SlotSchema
//=========================================================================================

/// The validated, ordered slot list. Slot order drives the deterministic flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSchema {
    slots: Vec<Slot>,
}

impl SlotSchema {
    /// Validates and wraps a slot list. Every data field must be collected by
    /// exactly one slot, and every slot needs an id and a prompt.
    pub fn new(slots: Vec<Slot>) -> Result<Self, SchemaError> {
        if slots.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut ids = HashSet::new();
        let mut fields = HashSet::new();
        for (index, slot) in slots.iter().enumerate() {
            if slot.id.trim().is_empty() {
                return Err(SchemaError::MissingId(index));
            }
            if slot.prompt.trim().is_empty() {
                return Err(SchemaError::MissingPrompt(slot.id.clone()));
            }
            if !ids.insert(slot.id.as_str()) {
                return Err(SchemaError::DuplicateId(slot.id.clone()));
            }
            if !fields.insert(slot.data_field) {
                return Err(SchemaError::DuplicateField(slot.data_field));
            }
        }

        if let Some(field) = DataField::ALL.into_iter().find(|f| !fields.contains(f)) {
            return Err(SchemaError::MissingField(field));
        }

        Ok(Self { slots })
    }

    /// Parses a JSON array of `{id, prompt, followUp, dataField}` objects.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let slots: Vec<Slot> =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::new(slots)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for SlotSchema {
    /// The built-in onboarding questions.
    fn default() -> Self {
        Self {
            slots: vec![
                Slot::new(
                    "name",
                    "Hi there! I'm your onboarding assistant. To get started, what's your name?",
                    "Nice to meet you, {userName}!",
                    DataField::UserName,
                ),
                Slot::new(
                    "company",
                    "Which company do you work for?",
                    "Thanks! {companyName}, got it.",
                    DataField::CompanyName,
                ),
                Slot::new(
                    "role",
                    "What is your role at {companyName}?",
                    "Great, so you work as {role}.",
                    DataField::Role,
                ),
                Slot::new(
                    "objective",
                    "What are you hoping to achieve with our research?",
                    "That's a clear goal, thanks for sharing it.",
                    DataField::Objective,
                ),
                Slot::new(
                    "industry",
                    "Is {companyName} part of the food and beverage industry?",
                    "Thanks for confirming.",
                    DataField::IndustryConfirmed,
                ),
                Slot::new(
                    "output",
                    "Finally, what would the ideal output look like for you?",
                    "Perfect, that's really helpful.",
                    DataField::IdealOutput,
                ),
            ],
        }
    }
}
