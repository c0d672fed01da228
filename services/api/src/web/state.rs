//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use crate::web::speech::WsSpeech;
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, Sink};
use onboarding_core::{
    flow::{FlowController, FlowPorts, FlowSettings},
    ports::{
        AiConversationService, CompanyValidator, CompletionService, ReportStore,
        SpeechSynthesisService, TranscriptionService,
    },
    slots::SlotSchema,
};
use std::fmt::Display;
use std::sync::Arc;
use uuid::Uuid;

/// The outgoing half of an axum WebSocket.
pub type SocketSink = SplitSink<WebSocket, Message>;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub schema: Arc<SlotSchema>,
    pub ai: Arc<dyn AiConversationService>,
    pub completion: Arc<dyn CompletionService>,
    pub validator: Arc<dyn CompanyValidator>,
    pub store: Arc<dyn ReportStore>,
    pub transcription: Arc<dyn TranscriptionService>,
    pub synthesis: Arc<dyn SpeechSynthesisService>,
}

impl AppState {
    /// The defaults a new conversation starts with.
    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            response_mode: self.config.response_mode,
            input_mode: self.config.input_mode,
            ..FlowSettings::default()
        }
    }
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active WebSocket connection.
pub struct SessionState {
    pub session_id: Uuid,
    pub flow: FlowController,
}

impl SessionState {
    /// Wires a fresh flow controller to the shared adapters and this connection's speech.
    pub fn new<S>(app_state: &AppState, speech: Arc<WsSpeech<S>>) -> Self
    where
        S: Sink<Message> + Unpin + Send + 'static,
        S::Error: Display,
    {
        let ports = FlowPorts {
            ai: app_state.ai.clone(),
            validator: app_state.validator.clone(),
            store: app_state.store.clone(),
            tts: speech.clone(),
            stt: speech,
        };

        Self {
            session_id: Uuid::new_v4(),
            flow: FlowController::new(app_state.schema.clone(), ports, app_state.flow_settings()),
        }
    }
}
