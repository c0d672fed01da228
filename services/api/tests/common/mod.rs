//! Shared fixtures for the router tests: fake OpenAI-backed ports and an
//! `AppState` wired to an allow-list validator and a temporary JSON file store.

#![allow(dead_code)]

use api_lib::{
    adapters::{AllowListValidator, JsonFileReportStore},
    config::Config,
    web::{build_router, state::AppState},
};
use async_trait::async_trait;
use axum::Router;
use onboarding_core::{
    ai::{Completion, LlmConversationService},
    ports::{
        CompletionService, PortError, PortResult, ReportStore, SpeechSynthesisService,
        TranscriptionService,
    },
    slots::SlotSchema,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Echoes the prompt back as JSON content and records the temperature used.
#[derive(Default)]
pub struct FakeCompletion {
    fail: bool,
    pub temperatures: Mutex<Vec<f32>>,
}

impl FakeCompletion {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, prompt: &str, temperature: f32) -> PortResult<Completion> {
        self.temperatures.lock().unwrap().push(temperature);
        if self.fail {
            return Err(PortError::Unavailable("model offline".to_string()));
        }
        Ok(Completion {
            content: json!({ "echo": prompt }),
            usage: Some(json!({ "total_tokens": 12 })),
        })
    }
}

pub struct SilentSpeech;

#[async_trait]
impl SpeechSynthesisService for SilentSpeech {
    async fn generate_audio(&self, _text: &str) -> PortResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl TranscriptionService for SilentSpeech {
    async fn transcribe_audio(&self, _audio_data: &[u8]) -> PortResult<String> {
        Ok(String::new())
    }
}

/// A store that always refuses to persist.
pub struct BrokenStore;

#[async_trait]
impl ReportStore for BrokenStore {
    async fn persist(&self, _report: &onboarding_core::domain::Report) -> PortResult<()> {
        Err(PortError::Unexpected("disk full".to_string()))
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        "AI_TEMPERATURE" => Some("0.4".to_string()),
        _ => None,
    })
    .unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub completion: Arc<FakeCompletion>,
    pub report_path: PathBuf,
    // Keeps the temporary directory alive for the duration of the test.
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(FakeCompletion::default(), None)
    }

    pub fn with(completion: FakeCompletion, store: Option<Arc<dyn ReportStore>>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("onboarding.json");
        let config = test_config();

        let completion = Arc::new(completion);
        let store =
            store.unwrap_or_else(|| Arc::new(JsonFileReportStore::new(report_path.clone())));
        let app_state = Arc::new(AppState {
            ai: Arc::new(LlmConversationService::new(
                completion.clone(),
                config.ai_temperature,
            )),
            validator: Arc::new(AllowListValidator::new(&config.known_companies)),
            config: Arc::new(config),
            schema: Arc::new(SlotSchema::default()),
            completion: completion.clone(),
            store,
            transcription: Arc::new(SilentSpeech),
            synthesis: Arc::new(SilentSpeech),
        });

        Self {
            router: build_router(app_state).unwrap(),
            completion,
            report_path,
            _dir: dir,
        }
    }
}
