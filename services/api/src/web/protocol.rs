//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the onboarding conversation.

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use onboarding_core::{
    domain::{ConversationTurn, InputModality, ProcessStage, Report, ReportSummary, ResponseMode},
    ports::{PortError, PortResult},
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tokio::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// NOTE: Microphone audio is sent as raw PCM16 Binary frames, not as part of this enum.
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Creates the onboarding session. This must be the first message sent on the connection.
    Init,

    /// Leaves the landing page and asks the first question.
    Start,

    /// A typed answer.
    UserText { text: String },

    /// The current contents of the text box, sent as the user types.
    TextInput { text: String },

    /// An interim transcript from the browser's speech recogniser. An empty
    /// transcript after a non-empty one ends the user's turn.
    Transcript { interim: String },

    /// The user finished speaking; the buffered audio should be transcribed.
    AudioEnded,

    /// The browser's speech recogniser failed with the given error code.
    SpeechError { code: String },

    SetInputMode { mode: InputModality },

    SetResponseMode { mode: ResponseMode },

    /// Asks for the finished report as a pretty-printed JSON document.
    DownloadReport,

    /// Discards the session and returns to the landing page.
    Restart,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================
// NOTE: The agent's voice is sent as raw Binary frames, bracketed by
// `speaking_started` and `speaking_ended`.
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful session initialization.
    SessionInitialized { session_id: Uuid },

    /// A new entry in the conversation log.
    Turn { turn: ConversationTurn },

    Progress {
        step: usize,
        total: usize,
        percentage: f32,
        stage: ProcessStage,
    },

    /// The microphone should be capturing; binary frames are now accepted.
    ListeningStarted,
    ListeningStopped,

    SpeakingStarted,
    SpeakingEnded,

    /// The text box should be emptied.
    TextInputCleared,

    /// Input should be disabled while `busy` is true.
    Processing { busy: bool },

    /// The session is complete; `report` is the downloadable document.
    Completed {
        report: Report,
        summary: ReportSummary,
    },

    /// The report as a file the browser can save.
    ReportDownload { filename: String, content: String },

    Restarted,

    /// Reports an error to the client, which should display the message.
    Error { message: String },
}

/// Serializes a `ServerMessage` and sends it as a Text frame.
pub async fn send_json<S>(sender: &Mutex<S>, message: &ServerMessage) -> PortResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let json =
        serde_json::to_string(message).map_err(|e| PortError::Unexpected(e.to_string()))?;
    sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| PortError::Unexpected(format!("Failed to send message to client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "user_text", "text": "Heineken" })).unwrap();
        assert_eq!(msg, ClientMessage::UserText { text: "Heineken".to_string() });

        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "set_input_mode", "mode": "TEXT" })).unwrap();
        assert_eq!(msg, ClientMessage::SetInputMode { mode: InputModality::Text });

        let msg: ClientMessage = serde_json::from_value(json!({ "type": "restart" })).unwrap();
        assert_eq!(msg, ClientMessage::Restart);
    }

    #[test]
    fn progress_message_shape() {
        let msg = ServerMessage::Progress {
            step: 1,
            total: 6,
            percentage: 50.0,
            stage: ProcessStage::Questions,
        };

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "progress", "step": 1, "total": 6, "percentage": 50.0, "stage": "QUESTIONS" })
        );
    }
}
