//! services/api/src/web/onboarding_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! running a single step of the onboarding conversation and publishing what
//! changed to the client.

use crate::web::{
    protocol::{send_json, ServerMessage},
    state::{AppState, SessionState},
};
use axum::extract::ws::Message;
use futures::Sink;
use onboarding_core::{
    domain::InputModality,
    flow::{FlowController, TurnOutcome},
    ports::PortResult,
    transcript::SpeechErrorKind,
};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// What the worker should do with the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRequest {
    /// Ask the first question.
    Start,
    /// A settled user answer, typed or transcribed by the browser.
    Answer { modality: InputModality, text: String },
    /// Captured microphone audio still to be transcribed.
    Audio(Vec<u8>),
}

/// Runs one request against the session while holding its lock, so turns
/// never overlap.
pub async fn turn_process<S>(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<S>>,
    request: TurnRequest,
) -> PortResult<()>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    let start_time = Instant::now();
    send_json(&ws_sender, &ServerMessage::Processing { busy: true }).await?;

    let (modality, text) = match request {
        TurnRequest::Start => {
            let mut session = session_state_lock.lock().await;
            let mark = session.flow.conversation().len();
            let result = session.flow.start_session().await;
            if let Err(e) = result {
                warn!("Could not start session {}: {}", session.session_id, e);
                send_json(&ws_sender, &ServerMessage::Error { message: e.to_string() }).await?;
            }
            publish_changes(&session.flow, &ws_sender, mark).await?;
            return finish(&ws_sender).await;
        }
        TurnRequest::Answer { modality, text } => (modality, text),
        TurnRequest::Audio(audio) => {
            let stt_start = Instant::now();
            let text = match app_state.transcription.transcribe_audio(&audio).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Transcription failed: {}", e);
                    String::new()
                }
            };
            info!("STT took: {:?}", stt_start.elapsed());

            if text.trim().is_empty() {
                let message = SpeechErrorKind::NoSpeech.user_message();
                send_json(&ws_sender, &ServerMessage::Error { message }).await?;
                return finish(&ws_sender).await;
            }
            (InputModality::Audio, text)
        }
    };

    let mut session = session_state_lock.lock().await;
    let mark = session.flow.conversation().len();
    info!("Session {} received a {:?} answer", session.session_id, modality);

    match session.flow.handle_user_turn(modality, &text).await {
        Ok(outcome) => {
            publish_changes(&session.flow, &ws_sender, mark).await?;
            if modality == InputModality::Text {
                send_json(&ws_sender, &ServerMessage::TextInputCleared).await?;
            }
            if let TurnOutcome::Completed(report) = outcome {
                info!("Session {} completed with report {}", session.session_id, report.id);
                let summary = report.summary();
                send_json(
                    &ws_sender,
                    &ServerMessage::Completed {
                        report: *report,
                        summary,
                    },
                )
                .await?;
            }
        }
        Err(e) => {
            error!("Turn rejected for session {}: {}", session.session_id, e);
            send_json(&ws_sender, &ServerMessage::Error { message: e.to_string() }).await?;
        }
    }
    drop(session);

    info!("Turn processed in {:?}", start_time.elapsed());
    finish(&ws_sender).await
}

/// Sends the turns appended after `mark` and the current progress.
pub async fn publish_changes<S>(
    flow: &FlowController,
    ws_sender: &Mutex<S>,
    mark: usize,
) -> PortResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    for turn in flow.conversation().since(mark) {
        send_json(ws_sender, &ServerMessage::Turn { turn: turn.clone() }).await?;
    }
    send_json(ws_sender, &progress_message(flow)).await
}

pub fn progress_message(flow: &FlowController) -> ServerMessage {
    ServerMessage::Progress {
        step: flow.current_step(),
        total: flow.total_steps(),
        percentage: flow.progress_percentage(),
        stage: flow.stage(),
    }
}

async fn finish<S>(ws_sender: &Mutex<S>) -> PortResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    send_json(ws_sender, &ServerMessage::Processing { busy: false }).await
}
