//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It owns the connection-local buffers and delegates conversation turns to
//! the onboarding worker.

use crate::web::{
    onboarding_task::{progress_message, turn_process, TurnRequest},
    protocol::{send_json, ClientMessage, ServerMessage},
    speech::WsSpeech,
    state::{AppState, SessionState, SocketSink},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, Sink};
use onboarding_core::{
    domain::InputModality,
    flow::FlowState,
    ports::{PortResult, SpeechToText, TextToSpeech},
    transcript::{SpeechErrorKind, TranscriptSettler},
};
use std::fmt::Display;
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established");

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender: Arc<Mutex<SocketSink>> = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(init_json.as_str()) {
                Ok(ClientMessage::Init) => {}
                _ => {
                    error!("First message was not a valid Init message.");
                    let message = "The first message must be an init message.".to_string();
                    let _ = send_json(&ws_sender, &ServerMessage::Error { message }).await;
                    return;
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    }

    let mut connection = Connection::new(app_state, ws_sender);
    let session_id = connection.session_state_lock.lock().await.session_id;
    if let Err(e) = connection.announce().await {
        error!("Failed to send session initialized message: {}", e);
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => connection.handle_text_message(text.as_str()).await,
            Some(Ok(Message::Binary(data))) => connection.handle_audio_frame(&data),
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket error for session {}: {}", session_id, e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    connection.close().await;
    info!("WebSocket connection for session {} closed.", session_id);
}

/// Everything the message loop needs for one connection.
struct Connection<S> {
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<S>>,
    speech: Arc<WsSpeech<S>>,
    settler: TranscriptSettler,
    audio_buffer: Vec<u8>,
    turn_task_handle: Option<JoinHandle<()>>,
}

impl<S> Connection<S>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    fn new(app_state: Arc<AppState>, ws_sender: Arc<Mutex<S>>) -> Self {
        let speech = Arc::new(WsSpeech::new(ws_sender.clone(), app_state.synthesis.clone()));
        let session = SessionState::new(&app_state, speech.clone());
        info!("Initializing onboarding session with ID: {}", session.session_id);

        Self {
            app_state,
            session_state_lock: Arc::new(Mutex::new(session)),
            ws_sender,
            speech,
            settler: TranscriptSettler::new(),
            audio_buffer: Vec::new(),
            turn_task_handle: None,
        }
    }

    /// Tells the client its session id and the starting progress.
    async fn announce(&self) -> PortResult<()> {
        let (session_id, progress) = {
            let session = self.session_state_lock.lock().await;
            (session.session_id, progress_message(&session.flow))
        };
        send_json(&self.ws_sender, &ServerMessage::SessionInitialized { session_id }).await?;
        send_json(&self.ws_sender, &progress).await
    }

    async fn close(&mut self) {
        if let Some(handle) = self.turn_task_handle.take() {
            handle.abort();
        }
        self.session_state_lock.lock().await.flow.shutdown().await;
    }

    fn is_busy(&self) -> bool {
        self.turn_task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn spawn_turn(&mut self, request: TurnRequest) {
        let app_state = self.app_state.clone();
        let session_state_lock = self.session_state_lock.clone();
        let ws_sender = self.ws_sender.clone();
        self.turn_task_handle = Some(tokio::spawn(async move {
            if let Err(e) = turn_process(app_state, session_state_lock, ws_sender, request).await {
                error!("Onboarding turn failed: {}", e);
            }
        }));
    }

    async fn notify(&self, message: ServerMessage) {
        if let Err(e) = send_json(&self.ws_sender, &message).await {
            warn!("Failed to notify client: {}", e);
        }
    }

    async fn reject_while_busy(&self) {
        let message = "Still working on your last answer, please wait.".to_string();
        self.notify(ServerMessage::Error { message }).await;
    }

    /// Microphone frames are only kept while the session is listening.
    fn handle_audio_frame(&mut self, data: &[u8]) {
        if self.speech.is_listening() {
            self.audio_buffer.extend_from_slice(data);
        }
    }

    async fn handle_text_message(&mut self, text: &str) {
        let client_msg = match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to deserialize client message: {}", e);
                return;
            }
        };

        match client_msg {
            ClientMessage::Init => {
                warn!("Received subsequent Init message, which is ignored.");
            }
            ClientMessage::Start => {
                if self.is_busy() {
                    return self.reject_while_busy().await;
                }
                self.spawn_turn(TurnRequest::Start);
            }
            ClientMessage::UserText { text } => {
                if text.trim().is_empty() {
                    return;
                }
                if self.is_busy() {
                    return self.reject_while_busy().await;
                }
                self.spawn_turn(TurnRequest::Answer {
                    modality: InputModality::Text,
                    text: text.trim().to_string(),
                });
            }
            ClientMessage::TextInput { text } => {
                if !self.is_busy() {
                    self.session_state_lock.lock().await.flow.set_text_input(text);
                }
            }
            ClientMessage::Transcript { interim } => {
                if let Some(settled) = self.settler.update(&interim) {
                    if self.is_busy() {
                        return self.reject_while_busy().await;
                    }
                    self.audio_buffer.clear();
                    self.spawn_turn(TurnRequest::Answer {
                        modality: InputModality::Audio,
                        text: settled,
                    });
                }
            }
            ClientMessage::AudioEnded => {
                if self.audio_buffer.is_empty() {
                    return;
                }
                if self.is_busy() {
                    return self.reject_while_busy().await;
                }
                let audio = std::mem::take(&mut self.audio_buffer);
                if let Err(e) = self.speech.stop_listening().await {
                    warn!("Failed to stop listening: {}", e);
                }
                self.spawn_turn(TurnRequest::Audio(audio));
            }
            ClientMessage::SpeechError { code } => {
                let kind = SpeechErrorKind::from_code(&code);
                warn!("Speech recognition error: {:?}", kind);
                self.settler.reset();
                self.audio_buffer.clear();
                if let Err(e) = self.speech.stop_listening().await {
                    warn!("Failed to stop listening: {}", e);
                }
                self.notify(ServerMessage::Error {
                    message: kind.user_message(),
                })
                .await;
                if !self.is_busy() {
                    self.session_state_lock
                        .lock()
                        .await
                        .flow
                        .set_input_mode(InputModality::Text);
                }
            }
            ClientMessage::SetInputMode { mode } => {
                if self.is_busy() {
                    return self.reject_while_busy().await;
                }
                let awaiting_input = {
                    let mut session = self.session_state_lock.lock().await;
                    session.flow.set_input_mode(mode);
                    session.flow.state() == FlowState::AwaitingUserInput
                        && session.flow.settings().speech_enabled
                };
                let result = match mode {
                    InputModality::Audio if awaiting_input => self.speech.start_listening().await,
                    InputModality::Audio => Ok(()),
                    InputModality::Text => {
                        self.settler.reset();
                        self.audio_buffer.clear();
                        self.speech.stop_listening().await
                    }
                };
                if let Err(e) = result {
                    warn!("Failed to switch input mode: {}", e);
                }
            }
            ClientMessage::SetResponseMode { mode } => {
                if self.is_busy() {
                    return self.reject_while_busy().await;
                }
                self.session_state_lock.lock().await.flow.set_response_mode(mode);
            }
            ClientMessage::DownloadReport => self.download_report().await,
            ClientMessage::Restart => self.restart().await,
        }
    }

    async fn download_report(&self) {
        if self.is_busy() {
            return self.reject_while_busy().await;
        }
        let download = {
            let session = self.session_state_lock.lock().await;
            session
                .flow
                .report()
                .map(|report| (report.download_filename(), report.to_pretty_json()))
        };

        let message = match download {
            Some((filename, Ok(content))) => ServerMessage::ReportDownload { filename, content },
            Some((filename, Err(e))) => {
                error!("Failed to serialize report {}: {}", filename, e);
                ServerMessage::Error {
                    message: "The report could not be prepared for download.".to_string(),
                }
            }
            None => ServerMessage::Error {
                message: "There is no report to download yet.".to_string(),
            },
        };
        self.notify(message).await;
    }

    async fn restart(&mut self) {
        info!("Restart message received. Abandoning current turn.");
        if let Some(handle) = self.turn_task_handle.take() {
            handle.abort();
        }
        self.speech.cancel().await;
        self.settler.reset();
        self.audio_buffer.clear();

        let progress = {
            let mut session = self.session_state_lock.lock().await;
            session.flow.restart_session().await;
            progress_message(&session.flow)
        };

        for message in [ServerMessage::Processing { busy: false }, ServerMessage::Restarted, progress] {
            if let Err(e) = send_json(&self.ws_sender, &message).await {
                warn!("Failed to notify client of restart: {}", e);
                return;
            }
        }
    }
}
