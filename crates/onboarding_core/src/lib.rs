//! crates/onboarding_core/src/lib.rs
//!
//! The onboarding domain: the question schema, answer extraction, the AI
//! conversation strategy and the flow controller that drives a session. All
//! side effects go through the traits in [`ports`], which the service crate
//! implements.

pub mod ai;
pub mod conversation;
pub mod data;
pub mod domain;
pub mod extractor;
pub mod flow;
pub mod ports;
pub mod slots;
pub mod transcript;

pub use ai::{AiContext, AiReply, Completion, LlmConversationService};
pub use conversation::ConversationLog;
pub use data::{DataField, FieldValue, OnboardingData};
pub use domain::{
    CompletionStatus, ConversationTurn, InputModality, ProcessStage, Report, ReportSummary,
    ResponseMode, Speaker, ValidationResult,
};
pub use flow::{FlowController, FlowError, FlowPorts, FlowSettings, FlowState, TurnOutcome};
pub use ports::{
    AiConversationService, CompanyValidator, CompletionService, NoSpeech, PortError, PortResult,
    ReportStore, SpeechSynthesisService, SpeechToText, TextToSpeech, TranscriptionService,
};
pub use slots::{SchemaError, Slot, SlotSchema};
pub use transcript::{SpeechErrorKind, TranscriptSettler};
