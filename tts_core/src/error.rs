use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Why a synthesis produced no audio file.
///
/// These never cross [`TtsClient::synthesize`](crate::TtsClient::synthesize),
/// which collapses every variant into `None` after logging it. Callers that
/// want the distinction use [`TtsClient::try_synthesize`](crate::TtsClient::try_synthesize).
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("Timed out while {phase}")]
    Timeout { phase: &'static str },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Service closed the connection without sending audio")]
    NoAudio,
}

impl SynthesisError {
    pub(crate) fn timeout(phase: &'static str) -> Self {
        SynthesisError::Timeout { phase }
    }
}

/// Errors from the external audio player.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player command is empty")]
    EmptyCommand,

    #[error("Failed to launch player `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Player exited with status {0}")]
    Failed(std::process::ExitStatus),
}
