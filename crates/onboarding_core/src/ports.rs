//! crates/onboarding_core/src/ports.rs
//!
//! Defines the service contracts (traits) the flow controller depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::ai::{AiContext, AiReply, Completion};
use crate::domain::{Report, ValidationResult};
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Conversation Ports
//=========================================================================================

#[async_trait]
pub trait AiConversationService: Send + Sync {
    /// Produces the next agent reply and whatever data could be read from the user's message.
    async fn respond(&self, user_message: &str, context: &AiContext) -> PortResult<AiReply>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends a prompt to a language model and returns its JSON content.
    async fn complete(&self, prompt: &str, temperature: f32) -> PortResult<Completion>;
}

#[async_trait]
pub trait CompanyValidator: Send + Sync {
    async fn validate_company(&self, company_name: &str) -> PortResult<ValidationResult>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn persist(&self, report: &Report) -> PortResult<()>;
}

//=========================================================================================
// Speech Ports
//=========================================================================================

/// Speaks agent turns to the user.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Resolves once the utterance has been delivered.
    async fn speak(&self, text: &str) -> PortResult<()>;
    async fn cancel(&self);
}

/// Controls the user's microphone.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn start_listening(&self) -> PortResult<()>;
    async fn stop_listening(&self) -> PortResult<()>;
}

#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    /// Generates audio data from a string of text.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>>;
}

#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribes a slice of audio data into text.
    async fn transcribe_audio(&self, audio_data: &[u8]) -> PortResult<String>;
}

/// Speech capabilities for deployments without audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeech;

#[async_trait]
impl TextToSpeech for NoSpeech {
    async fn speak(&self, _text: &str) -> PortResult<()> {
        Ok(())
    }

    async fn cancel(&self) {}
}

#[async_trait]
impl SpeechToText for NoSpeech {
    async fn start_listening(&self) -> PortResult<()> {
        Ok(())
    }

    async fn stop_listening(&self) -> PortResult<()> {
        Ok(())
    }
}
