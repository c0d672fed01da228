//! crates/onboarding_core/src/domain.rs
//!
//! Defines the pure, core data structures for the onboarding conversation.
//! Serde derives fix the JSON shape shared with the browser client and the
//! report store.

use crate::data::OnboardingData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Speaker {
    Agent,
    User,
}

/// How a turn reached the system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputModality {
    #[default]
    Audio,
    Text,
}

/// Whether replies come from the AI service or from the slot schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseMode {
    #[default]
    Ai,
    Simple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Complete,
    Partial,
    Incomplete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStage {
    #[default]
    Landing,
    Questions,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mode: {0}")]
pub struct UnknownModeError(pub String);

impl FromStr for InputModality {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "audio" => Ok(InputModality::Audio),
            "text" => Ok(InputModality::Text),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

impl FromStr for ResponseMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ai" => Ok(ResponseMode::Ai),
            "simple" => Ok(ResponseMode::Simple),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

impl fmt::Display for ProcessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            ProcessStage::Landing => "LANDING",
            ProcessStage::Questions => "QUESTIONS",
            ProcessStage::Complete => "COMPLETE",
        };
        f.write_str(stage)
    }
}

//=========================================================================================
// Conversation
//=========================================================================================

/// One utterance in the conversation. Never mutated once logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,
    pub speaker: Speaker,
    #[serde(rename = "input")]
    pub input_modality: InputModality,
    pub text: String,
}

impl ConversationTurn {
    pub fn new(speaker: Speaker, input_modality: InputModality, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            speaker,
            input_modality,
            text: text.into(),
        }
    }

    pub fn agent(text: impl Into<String>, input_modality: InputModality) -> Self {
        Self::new(Speaker::Agent, input_modality, text)
    }

    pub fn user(text: impl Into<String>, input_modality: InputModality) -> Self {
        Self::new(Speaker::User, input_modality, text)
    }
}

//=========================================================================================
// Validation and Reports
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub industry_match: bool,
    pub company_overview: String,
}

impl ValidationResult {
    /// Stand-in used when the validator could not be reached.
    pub fn not_found() -> Self {
        Self {
            industry_match: false,
            company_overview: "Company overview not found.".to_string(),
        }
    }
}

/// The final artefact of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_data: OnboardingData,
    pub transcript: Vec<ConversationTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ValidationResult>,
    pub completion_status: CompletionStatus,
}

impl Report {
    pub fn new(
        user_data: OnboardingData,
        transcript: Vec<ConversationTurn>,
        validation_result: Option<ValidationResult>,
        completion_status: CompletionStatus,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            id: format!("onboarding-{}", timestamp.timestamp_millis()),
            timestamp,
            user_data,
            transcript,
            validation_result,
            completion_status,
        }
    }

    /// The downloadable form of the report.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn download_filename(&self) -> String {
        format!("{}.json", self.id)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            report_id: self.id.clone(),
            completed_at: self.timestamp,
            user_data: self.user_data.clone(),
            industry_validation: self.validation_result.clone(),
            conversation_length: self.transcript.len(),
        }
    }
}

/// What the completion screen shows about a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub report_id: String,
    pub completed_at: DateTime<Utc>,
    pub user_data: OnboardingData,
    pub industry_validation: Option<ValidationResult>,
    pub conversation_length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataField;
    use serde_json::json;

    #[test]
    fn turn_serializes_modality_as_input() {
        let turn = ConversationTurn::user("Heineken", InputModality::Text);
        let value = serde_json::to_value(&turn).unwrap();

        assert_eq!(value["speaker"], json!("USER"));
        assert_eq!(value["input"], json!("TEXT"));
        assert_eq!(value["text"], json!("Heineken"));
    }

    #[test]
    fn report_id_and_summary() {
        let data = OnboardingData::new().with(DataField::CompanyName, "Glanbia");
        let transcript = vec![
            ConversationTurn::agent("Which company?", InputModality::Text),
            ConversationTurn::user("Glanbia", InputModality::Text),
        ];
        let report = Report::new(data.clone(), transcript, None, CompletionStatus::Complete);

        assert!(report.id.starts_with("onboarding-"));
        let summary = report.summary();
        assert_eq!(summary.conversation_length, 2);
        assert_eq!(summary.user_data, data);
        assert_eq!(summary.industry_validation, None);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["completionStatus"], json!("COMPLETE"));
        assert!(value.get("validationResult").is_none());
    }

    #[test]
    fn download_is_named_after_the_report() {
        let data = OnboardingData::new().with(DataField::UserName, "Aoife");
        let report = Report::new(data, Vec::new(), None, CompletionStatus::Complete);

        assert_eq!(report.download_filename(), format!("{}.json", report.id));
        let pretty = report.to_pretty_json().unwrap();
        assert!(pretty.contains('\n'));
        let parsed: Report = serde_json::from_str(&pretty).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("Simple".parse::<ResponseMode>(), Ok(ResponseMode::Simple));
        assert_eq!("TEXT".parse::<InputModality>(), Ok(InputModality::Text));
        assert!("video".parse::<InputModality>().is_err());
    }
}
