//! services/api/src/web/speech.rs
//!
//! The speech capabilities of one WebSocket connection. Agent turns are
//! synthesized and streamed to the browser as Binary frames; listening is a
//! flag that gates which microphone frames the connection accepts.

use crate::web::protocol::{send_json, ServerMessage};
use async_trait::async_trait;
use axum::extract::ws::Message;
use bytes::Bytes;
use futures::{Sink, SinkExt};
use onboarding_core::ports::{
    PortError, PortResult, SpeechSynthesisService, SpeechToText, TextToSpeech,
};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct WsSpeech<S> {
    sender: Arc<Mutex<S>>,
    synthesis: Arc<dyn SpeechSynthesisService>,
    /// Cancelled to interrupt the utterance in flight; replaced after each cancel.
    cancellation_token: std::sync::Mutex<CancellationToken>,
    listening: AtomicBool,
}

impl<S> WsSpeech<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    pub fn new(sender: Arc<Mutex<S>>, synthesis: Arc<dyn SpeechSynthesisService>) -> Self {
        Self {
            sender,
            synthesis,
            cancellation_token: std::sync::Mutex::new(CancellationToken::new()),
            listening: AtomicBool::new(false),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Synthesizes and sends one utterance unless it is cancelled first.
    async fn deliver(&self, text: &str, token: &CancellationToken) -> PortResult<()> {
        let audio = tokio::select! {
            _ = token.cancelled() => {
                info!("Speech cancelled before audio was delivered.");
                return Ok(());
            }
            result = self.synthesis.generate_audio(text) => result?,
        };

        if token.is_cancelled() {
            return Ok(());
        }
        debug!("Sending {} bytes of agent audio", audio.len());
        self.sender
            .lock()
            .await
            .send(Message::Binary(Bytes::from(audio)))
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to send audio to client: {}", e)))
    }

    fn current_token(&self) -> CancellationToken {
        match self.cancellation_token.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl<S> TextToSpeech for WsSpeech<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    async fn speak(&self, text: &str) -> PortResult<()> {
        let token = self.current_token();
        send_json(&self.sender, &ServerMessage::SpeakingStarted).await?;

        let delivered = self.deliver(text, &token).await;
        let ended = send_json(&self.sender, &ServerMessage::SpeakingEnded).await;
        delivered.and(ended)
    }

    async fn cancel(&self) {
        let mut token = match self.cancellation_token.lock() {
            Ok(token) => token,
            Err(poisoned) => poisoned.into_inner(),
        };
        token.cancel();
        *token = CancellationToken::new();
    }
}

#[async_trait]
impl<S> SpeechToText for WsSpeech<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    async fn start_listening(&self) -> PortResult<()> {
        self.listening.store(true, Ordering::SeqCst);
        send_json(&self.sender, &ServerMessage::ListeningStarted).await
    }

    async fn stop_listening(&self) -> PortResult<()> {
        if self.listening.swap(false, Ordering::SeqCst) {
            send_json(&self.sender, &ServerMessage::ListeningStopped).await?;
        }
        Ok(())
    }
}
