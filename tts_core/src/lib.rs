//! Streaming client for the read-aloud speech service.
//!
//! A call to [`TtsClient::synthesize`] cleans the input text, frames a
//! `speech.config` and an `ssml` message, streams the reply over a websocket
//! and writes the audio into a file in the configured storage directory.
//! Every failure collapses into `None`; [`TtsClient::try_synthesize`] exposes
//! the underlying [`SynthesisError`].

pub mod assembler;
pub mod client;
pub mod config;
pub mod error;
pub mod framing;
pub mod player;
pub mod sanitize;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use assembler::HeaderStrategy;
pub use client::{ConnectionDescriptor, TtsClient};
pub use config::TtsConfig;
pub use error::{PlayerError, SynthesisError};
pub use framing::AudioFormat;
pub use player::AudioPlayer;
pub use sanitize::sanitize;

/// A voice from the service's catalog.
///
/// Field names follow the catalog's JSON (`Locale`, `Name`, `Role`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Voice {
    pub locale: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
}

impl Voice {
    pub fn new(locale: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            name: name.into(),
            role: String::new(),
        }
    }
}

/// A finished synthesis on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    pub request_id: String,
    pub bytes: u64,
}
