//! crates/onboarding_core/src/transcript.rs
//!
//! Live transcription helpers: settling a stream of interim transcripts into
//! completed user turns, and mapping speech recognition error codes to the
//! messages shown to the user.

/// Tracks interim transcripts until the recogniser signals the end of an utterance.
///
/// An empty interim transcript following a non-empty one means the user has
/// stopped talking; the last non-empty transcript is the settled turn.
#[derive(Debug, Clone, Default)]
pub struct TranscriptSettler {
    previous: String,
}

impl TranscriptSettler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the latest interim transcript. Returns the settled text when the
    /// utterance has finished.
    pub fn update(&mut self, interim: &str) -> Option<String> {
        let interim = interim.trim();
        if interim.is_empty() {
            if self.previous.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.previous));
        }

        self.previous = interim.to_string();
        None
    }

    pub fn pending(&self) -> Option<&str> {
        (!self.previous.is_empty()).then_some(self.previous.as_str())
    }

    pub fn reset(&mut self) {
        self.previous.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    Other(String),
}

impl SpeechErrorKind {
    /// Maps a recogniser error code such as `no-speech` or `not-allowed`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "no-speech" => SpeechErrorKind::NoSpeech,
            "audio-capture" => SpeechErrorKind::AudioCapture,
            "not-allowed" => SpeechErrorKind::NotAllowed,
            "network" => SpeechErrorKind::Network,
            other => SpeechErrorKind::Other(other.to_string()),
        }
    }

    pub fn user_message(&self) -> String {
        let detail = match self {
            SpeechErrorKind::NoSpeech => "No speech detected. Please try again.",
            SpeechErrorKind::AudioCapture => "No microphone found. Please check your microphone.",
            SpeechErrorKind::NotAllowed => "Microphone access denied. Please allow microphone access.",
            SpeechErrorKind::Network => "Network error. Please check your internet connection.",
            SpeechErrorKind::Other(code) => code,
        };
        format!("An error occurred: {}", detail)
    }
}
