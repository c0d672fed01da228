//! crates/onboarding_core/src/flow.rs
//!
//! The onboarding flow controller. It owns a session's state, conversation
//! log and collected data, and decides turn by turn whether to ask the AI
//! service or fall back to deterministic slot filling, when to validate the
//! user's company, and when the session is complete.

use crate::ai::{AiContext, AiReply};
use crate::conversation::ConversationLog;
use crate::data::OnboardingData;
use crate::domain::{
    CompletionStatus, ConversationTurn, InputModality, ProcessStage, Report, ResponseMode,
    Speaker, ValidationResult,
};
use crate::extractor;
use crate::ports::{AiConversationService, CompanyValidator, ReportStore, SpeechToText, TextToSpeech};
use crate::slots::{Slot, SlotSchema};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const DEFAULT_COMPLETION_MESSAGE: &str = "Great, I have all the details I need.";

//=========================================================================================
// Settings, Ports and States
//=========================================================================================

#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub response_mode: ResponseMode,
    pub input_mode: InputModality,
    pub speech_enabled: bool,
    pub completion_message: String,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            response_mode: ResponseMode::Ai,
            input_mode: InputModality::Audio,
            speech_enabled: true,
            completion_message: DEFAULT_COMPLETION_MESSAGE.to_string(),
        }
    }
}

/// The external collaborators a controller talks to.
#[derive(Clone)]
pub struct FlowPorts {
    pub ai: Arc<dyn AiConversationService>,
    pub validator: Arc<dyn CompanyValidator>,
    pub store: Arc<dyn ReportStore>,
    pub tts: Arc<dyn TextToSpeech>,
    pub stt: Arc<dyn SpeechToText>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Landing,
    AwaitingUserInput,
    ProcessingTurn,
    ValidatingIndustry,
    Complete,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            FlowState::Landing => "LANDING",
            FlowState::AwaitingUserInput => "AWAITING_USER_INPUT",
            FlowState::ProcessingTurn => "PROCESSING_TURN",
            FlowState::ValidatingIndustry => "VALIDATING_INDUSTRY",
            FlowState::Complete => "COMPLETE",
        };
        f.write_str(state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: FlowState,
    },
}

/// What a submitted turn led to.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The controller asked its next question and waits for the user.
    AwaitingInput,
    /// The session finished with this report.
    Completed(Box<Report>),
    /// An agent turn was recorded without further processing.
    Logged,
}

//=========================================================================================
// FlowController
//=========================================================================================

pub struct FlowController {
    schema: Arc<SlotSchema>,
    ports: FlowPorts,
    settings: FlowSettings,
    state: FlowState,
    current_step: usize,
    data: OnboardingData,
    log: ConversationLog,
    text_input: String,
    validation: Option<ValidationResult>,
    report: Option<Report>,
    is_processing: bool,
}

impl FlowController {
    pub fn new(schema: Arc<SlotSchema>, ports: FlowPorts, settings: FlowSettings) -> Self {
        Self {
            schema,
            ports,
            settings,
            state: FlowState::Landing,
            current_step: 0,
            data: OnboardingData::new(),
            log: ConversationLog::new(),
            text_input: String::new(),
            validation: None,
            report: None,
            is_processing: false,
        }
    }

    // --- Session lifecycle ---

    /// Asks the first question.
    pub async fn start_session(&mut self) -> Result<(), FlowError> {
        self.expect_state(FlowState::Landing, "start a session")?;

        self.state = FlowState::AwaitingUserInput;
        self.current_step = 0;
        info!("Onboarding session started");

        if let Some(prompt) = self.schema.get(0).map(|slot| slot.render_prompt(&self.data)) {
            self.say(prompt, InputModality::Text).await;
        }
        self.listen().await;
        Ok(())
    }

    /// Processes one user answer and produces the agent's next turn.
    pub async fn handle_user_turn(
        &mut self,
        modality: InputModality,
        text: &str,
    ) -> Result<TurnOutcome, FlowError> {
        self.expect_state(FlowState::AwaitingUserInput, "handle a user turn")?;

        self.log.append(ConversationTurn::user(text, modality));
        if modality == InputModality::Text {
            self.text_input.clear();
        } else {
            self.stop_listening().await;
        }

        self.state = FlowState::ProcessingTurn;
        match self.settings.response_mode {
            ResponseMode::Ai => self.run_ai_strategy(modality, text).await,
            ResponseMode::Simple => self.run_simple_strategy(modality, text).await,
        }

        if self.state == FlowState::Complete {
            if let Some(report) = &self.report {
                return Ok(TurnOutcome::Completed(Box::new(report.clone())));
            }
        }
        self.state = FlowState::AwaitingUserInput;
        Ok(TurnOutcome::AwaitingInput)
    }

    /// Entry point for turns arriving from outside the controller. Agent turns
    /// are only recorded; the controller never extracts from its own speech.
    pub async fn submit_turn(
        &mut self,
        speaker: Speaker,
        modality: InputModality,
        text: &str,
    ) -> Result<TurnOutcome, FlowError> {
        match speaker {
            Speaker::Agent => {
                self.log.append(ConversationTurn::agent(text, modality));
                Ok(TurnOutcome::Logged)
            }
            Speaker::User => self.handle_user_turn(modality, text).await,
        }
    }

    /// Finishes the session: validates the company if that has not happened
    /// yet, builds and persists the report, and says goodbye. Calling it again
    /// returns the existing report.
    pub async fn complete_session(&mut self) -> Report {
        if let Some(report) = &self.report {
            return report.clone();
        }

        if self.validation.is_none() {
            if let Some(company) = self.company_name() {
                self.validation = Some(self.validate(&company).await);
            }
        }

        let report = Report::new(
            self.data.clone(),
            self.log.snapshot(),
            self.validation.clone(),
            CompletionStatus::Complete,
        );

        match self.ports.store.persist(&report).await {
            Ok(()) => info!("Persisted onboarding report {}", report.id),
            Err(e) => error!("Failed to persist onboarding report {}: {}", report.id, e),
        }

        self.report = Some(report.clone());
        let closing = self.settings.completion_message.clone();
        self.say(closing, InputModality::Text).await;
        self.state = FlowState::Complete;
        self.is_processing = false;

        report
    }

    /// Back to the landing stage with nothing collected.
    pub async fn restart_session(&mut self) {
        self.shutdown().await;

        self.log.clear();
        self.data = OnboardingData::new();
        self.current_step = 0;
        self.validation = None;
        self.report = None;
        self.text_input.clear();
        self.is_processing = false;
        self.state = FlowState::Landing;
        info!("Onboarding session restarted");
    }

    /// Silences speech and releases the microphone.
    pub async fn shutdown(&self) {
        self.ports.tts.cancel().await;
        self.stop_listening().await;
    }

    // --- Strategies ---

    async fn run_ai_strategy(&mut self, modality: InputModality, text: &str) {
        let context = AiContext::new(
            self.data.clone(),
            self.data.missing_fields(&self.schema),
            self.log.snapshot(),
        );

        self.is_processing = true;
        let started = Instant::now();
        let result = self.ports.ai.respond(text, &context).await;
        self.is_processing = false;

        match result {
            Ok(reply) => {
                debug!("AI turn processed in {:?}", started.elapsed());
                self.apply_ai_reply(reply).await;
            }
            Err(e) => {
                warn!("AI conversation failed, falling back to slot filling: {}", e);
                match self.data.first_missing_step(&self.schema) {
                    Some(step) => {
                        self.current_step = step;
                        self.run_simple_strategy(modality, text).await;
                    }
                    None => {
                        self.complete_session().await;
                    }
                }
            }
        }
    }

    async fn apply_ai_reply(&mut self, reply: AiReply) {
        self.data.merge(&reply.extracted_data);

        if reply.is_complete {
            self.complete_session().await;
            return;
        }

        // Follows the number of collected fields, not the slot order.
        self.current_step = self.data.filled_count();

        let response = if reply.response.trim().is_empty() {
            // Nothing to say: ask for the first open field again.
            let prompt = self
                .data
                .first_missing_step(&self.schema)
                .and_then(|step| self.schema.get(step))
                .map(|slot| slot.render_prompt(&self.data));
            match prompt {
                Some(prompt) => prompt,
                None => {
                    self.complete_session().await;
                    return;
                }
            }
        } else {
            reply.response
        };

        self.say(response, InputModality::Audio).await;
        self.listen().await;
    }

    async fn run_simple_strategy(&mut self, modality: InputModality, text: &str) {
        let Some(slot) = self.schema.get(self.current_step).cloned() else {
            self.complete_session().await;
            return;
        };

        self.data.merge(&extractor::extract(text, slot.data_field));
        if modality == InputModality::Text {
            self.text_input.clear();
        }

        let follow_up = slot.render_follow_up(&self.data);
        self.say(follow_up, InputModality::Text).await;

        let Some(next) = self.next_open_step(self.current_step) else {
            self.complete_session().await;
            return;
        };

        self.current_step = next;
        self.validate_industry_if_needed(&slot).await;

        if let Some(prompt) = self.schema.get(next).map(|slot| slot.render_prompt(&self.data)) {
            self.say(prompt, InputModality::Text).await;
        }
        self.listen().await;
    }

    /// Validates the company right after the industry question, once per session.
    pub async fn validate_industry_if_needed(&mut self, finished: &Slot) {
        if !finished.is_industry_check() || self.validation.is_some() {
            return;
        }
        let Some(company) = self.company_name() else {
            return;
        };

        let resume = self.state;
        self.state = FlowState::ValidatingIndustry;

        let result = self.validate(&company).await;
        let summary = if result.industry_match {
            format!("Thanks, I can confirm {} is part of our food and beverage group.", company)
        } else {
            format!(
                "I couldn't find {} in our food and beverage group, but let's carry on.",
                company
            )
        };
        self.validation = Some(result);
        self.say(summary, InputModality::Text).await;

        self.state = resume;
    }

    // --- Helpers ---

    fn expect_state(&self, expected: FlowState, operation: &'static str) -> Result<(), FlowError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(FlowError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// The first slot after `step` whose field has not been collected yet.
    fn next_open_step(&self, step: usize) -> Option<usize> {
        self.schema
            .slots()
            .iter()
            .enumerate()
            .skip(step + 1)
            .find(|(_, slot)| !self.data.is_filled(slot.data_field))
            .map(|(index, _)| index)
    }

    fn company_name(&self) -> Option<String> {
        self.data
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    async fn validate(&self, company: &str) -> ValidationResult {
        let started = Instant::now();
        match self.ports.validator.validate_company(company).await {
            Ok(result) => {
                info!(
                    "Validated company '{}' in {:?} (industry match: {})",
                    company,
                    started.elapsed(),
                    result.industry_match
                );
                result
            }
            Err(e) => {
                warn!("Company validation failed for '{}', using default: {}", company, e);
                ValidationResult::not_found()
            }
        }
    }

    /// Logs an agent turn, then speaks it.
    async fn say(&mut self, text: String, modality: InputModality) {
        self.log.append(ConversationTurn::agent(text.clone(), modality));

        if self.settings.speech_enabled {
            if let Err(e) = self.ports.tts.speak(&text).await {
                warn!("Failed to speak agent turn: {}", e);
            }
        }
    }

    async fn listen(&self) {
        if !self.settings.speech_enabled || self.settings.input_mode != InputModality::Audio {
            debug!("Listening is not enabled");
            return;
        }
        if let Err(e) = self.ports.stt.start_listening().await {
            warn!("Failed to start listening: {}", e);
        }
    }

    async fn stop_listening(&self) {
        if let Err(e) = self.ports.stt.stop_listening().await {
            warn!("Failed to stop listening: {}", e);
        }
    }

    // --- Accessors ---

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn stage(&self) -> ProcessStage {
        match self.state {
            FlowState::Landing => ProcessStage::Landing,
            FlowState::Complete => ProcessStage::Complete,
            _ => ProcessStage::Questions,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.schema.len()
    }

    /// `(step + 1) / total` as a percentage, capped at 100.
    pub fn progress_percentage(&self) -> f32 {
        let total = self.schema.len().max(1) as f32;
        ((self.current_step + 1) as f32 / total * 100.0).min(100.0)
    }

    pub fn schema(&self) -> &SlotSchema {
        &self.schema
    }

    pub fn data(&self) -> &OnboardingData {
        &self.data
    }

    pub fn conversation(&self) -> &ConversationLog {
        &self.log
    }

    pub fn validation_result(&self) -> Option<&ValidationResult> {
        self.validation.as_ref()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn text_input(&self) -> &str {
        &self.text_input
    }

    pub fn set_text_input(&mut self, text: impl Into<String>) {
        self.text_input = text.into();
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    pub fn set_input_mode(&mut self, mode: InputModality) {
        self.settings.input_mode = mode;
    }

    pub fn set_response_mode(&mut self, mode: ResponseMode) {
        self.settings.response_mode = mode;
    }

    pub fn set_speech_enabled(&mut self, enabled: bool) {
        self.settings.speech_enabled = enabled;
    }
}
