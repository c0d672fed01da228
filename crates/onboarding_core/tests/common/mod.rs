//! Hand-written port implementations shared by the flow tests.

#![allow(dead_code)]

use async_trait::async_trait;
use onboarding_core::{
    AiContext, AiConversationService, AiReply, CompanyValidator, FlowController, FlowPorts,
    FlowSettings, InputModality, PortError, PortResult, Report, ReportStore, ResponseMode,
    SlotSchema, SpeechToText, TextToSpeech, ValidationResult,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays queued replies; once the queue is empty every call fails.
#[derive(Default)]
pub struct ScriptedAi {
    replies: Mutex<VecDeque<Result<AiReply, String>>>,
    pub contexts: Mutex<Vec<AiContext>>,
}

impl ScriptedAi {
    pub fn push_reply(&self, reply: AiReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

#[async_trait]
impl AiConversationService for ScriptedAi {
    async fn respond(&self, _user_message: &str, context: &AiContext) -> PortResult<AiReply> {
        self.contexts.lock().unwrap().push(context.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(PortError::Unavailable(message)),
            None => Err(PortError::Unavailable("no scripted reply".to_string())),
        }
    }
}

pub struct StubValidator {
    known: Vec<String>,
    fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl StubValidator {
    pub fn known(companies: &[&str]) -> Self {
        Self {
            known: companies.iter().map(|c| c.to_lowercase()).collect(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            known: Vec::new(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompanyValidator for StubValidator {
    async fn validate_company(&self, company_name: &str) -> PortResult<ValidationResult> {
        self.calls.lock().unwrap().push(company_name.to_string());
        if self.fail {
            return Err(PortError::Unavailable("validator down".to_string()));
        }
        let industry_match = self.known.contains(&company_name.trim().to_lowercase());
        Ok(ValidationResult {
            industry_match,
            company_overview: if industry_match {
                "This is the company overview.".to_string()
            } else {
                "This company is not recognised in our food and beverage group.".to_string()
            },
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    fail: bool,
    pub reports: Mutex<Vec<Report>>,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn persist(&self, report: &Report) -> PortResult<()> {
        if self.fail {
            return Err(PortError::Unexpected("disk full".to_string()));
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// Records what would have been spoken and the microphone state.
#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<String>>,
    pub listening: Mutex<bool>,
    pub listen_requests: Mutex<usize>,
    pub cancels: Mutex<usize>,
}

#[async_trait]
impl TextToSpeech for RecordingSpeech {
    async fn speak(&self, text: &str) -> PortResult<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn cancel(&self) {
        *self.cancels.lock().unwrap() += 1;
    }
}

#[async_trait]
impl SpeechToText for RecordingSpeech {
    async fn start_listening(&self) -> PortResult<()> {
        *self.listening.lock().unwrap() = true;
        *self.listen_requests.lock().unwrap() += 1;
        Ok(())
    }

    async fn stop_listening(&self) -> PortResult<()> {
        *self.listening.lock().unwrap() = false;
        Ok(())
    }
}

pub struct Harness {
    pub ai: Arc<ScriptedAi>,
    pub validator: Arc<StubValidator>,
    pub store: Arc<MemoryStore>,
    pub speech: Arc<RecordingSpeech>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(StubValidator::known(&["heineken", "musgrave", "glanbia", "ballymoyle"]), MemoryStore::default())
    }

    pub fn with(validator: StubValidator, store: MemoryStore) -> Self {
        Self {
            ai: Arc::new(ScriptedAi::default()),
            validator: Arc::new(validator),
            store: Arc::new(store),
            speech: Arc::new(RecordingSpeech::default()),
        }
    }

    pub fn controller(&self, response_mode: ResponseMode, input_mode: InputModality) -> FlowController {
        let ports = FlowPorts {
            ai: self.ai.clone(),
            validator: self.validator.clone(),
            store: self.store.clone(),
            tts: self.speech.clone(),
            stt: self.speech.clone(),
        };
        let settings = FlowSettings {
            response_mode,
            input_mode,
            ..FlowSettings::default()
        };
        FlowController::new(Arc::new(SlotSchema::default()), ports, settings)
    }
}
