//! Builds the two text frames sent at the start of every synthesis.
//!
//! The service expects a `speech.config` frame announcing the output codec,
//! followed by an `ssml` frame carrying the document to speak. Both frames are
//! a block of `Key:Value` header lines terminated by CRLF, a blank line, and a
//! body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Voice;

const SSML_NAMESPACE: &str = "http://www.w3.org/2001/10/synthesis";

/// Output codec requested from the service, e.g. `audio-24khz-48kbitrate-mono-mp3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioFormat(String);

impl AudioFormat {
    pub const MP3_24KHZ_48KBIT: &'static str = "audio-24khz-48kbitrate-mono-mp3";
    pub const OPUS_24KHZ_16BIT: &'static str = "webm-24khz-16bit-mono-opus";

    pub fn new(codec: impl Into<String>) -> Self {
        Self(codec.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File extension for audio in this format, without the dot.
    pub fn extension(&self) -> Option<&'static str> {
        match self.0.as_str() {
            Self::MP3_24KHZ_48KBIT => Some("mp3"),
            Self::OPUS_24KHZ_16BIT => Some("opus"),
            _ => None,
        }
    }

    /// Output file name for a request: the id plus the codec's extension, if known.
    pub fn file_name(&self, request_id: &str) -> String {
        match self.extension() {
            Some(ext) => format!("{request_id}.{ext}"),
            None => request_id.to_string(),
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(Self::MP3_24KHZ_48KBIT)
    }
}

/// Pitch, rate and volume as they appear on the `<prosody>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prosody {
    pub pitch: String,
    pub rate: String,
    pub volume: String,
}

impl Prosody {
    /// Prosody for a speed given in percent of normal (100 = normal).
    pub fn with_speed(pitch: impl Into<String>, speed_percent: i32, volume: impl Into<String>) -> Self {
        Self {
            pitch: pitch.into(),
            rate: rate_for_speed(speed_percent),
            volume: volume.into(),
        }
    }
}

impl Default for Prosody {
    fn default() -> Self {
        Self::with_speed("+0Hz", 100, "+0%")
    }
}

/// One synthesis round-trip: everything needed to render both frames.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub id: String,
    pub timestamp: String,
    pub ssml: String,
    pub audio_format: AudioFormat,
}

impl SynthesisRequest {
    /// Fresh request with a new id and the current time.
    pub fn new(voice: &Voice, prosody: &Prosody, text: &str, audio_format: AudioFormat) -> Self {
        Self {
            id: new_request_id(),
            timestamp: timestamp(Utc::now()),
            ssml: ssml_document(voice, prosody, text),
            audio_format,
        }
    }

    pub fn file_name(&self) -> String {
        self.audio_format.file_name(&self.id)
    }

    pub fn config_frame(&self) -> String {
        config_frame(&self.audio_format, &self.timestamp)
    }

    pub fn ssml_frame(&self) -> String {
        ssml_frame(&self.id, &self.timestamp, &self.ssml)
    }
}

#[derive(Serialize)]
struct SpeechConfig<'a> {
    context: Context<'a>,
}

#[derive(Serialize)]
struct Context<'a> {
    synthesis: Synthesis<'a>,
}

#[derive(Serialize)]
struct Synthesis<'a> {
    audio: AudioConfig<'a>,
}

#[derive(Serialize)]
struct AudioConfig<'a> {
    metadataoptions: MetadataOptions,
    #[serde(rename = "outputFormat")]
    output_format: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetadataOptions {
    sentence_boundary_enabled: bool,
    word_boundary_enabled: bool,
}

/// The `speech.config` frame announcing the output codec.
pub fn config_frame(format: &AudioFormat, timestamp: &str) -> String {
    let body = SpeechConfig {
        context: Context {
            synthesis: Synthesis {
                audio: AudioConfig {
                    metadataoptions: MetadataOptions {
                        sentence_boundary_enabled: false,
                        word_boundary_enabled: true,
                    },
                    output_format: format.as_str(),
                },
            },
        },
    };
    // Serializing plain structs of bools and strs cannot fail
    let json = serde_json::to_string(&body).unwrap_or_default();

    format!(
        "X-Timestamp:{timestamp}\r\n\
         Content-Type:application/json; charset=utf-8\r\n\
         Path:speech.config\r\n\r\n\
         {json}\n"
    )
}

/// The `ssml` frame carrying the document to speak.
pub fn ssml_frame(request_id: &str, timestamp: &str, ssml: &str) -> String {
    format!(
        "X-RequestId:{request_id}\r\n\
         Content-Type:application/ssml+xml\r\n\
         X-Timestamp:{timestamp}Z\r\n\
         Path:ssml\r\n\r\n\
         {ssml}"
    )
}

/// `<speak>` document for one voice. `text` is embedded as given.
pub fn ssml_document(voice: &Voice, prosody: &Prosody, text: &str) -> String {
    format!(
        "<speak version='1.0' xmlns='{SSML_NAMESPACE}' xml:lang='{locale}'>\
         <voice name='{name}'>\
         <prosody pitch='{pitch}' rate='{rate}' volume='{volume}'>{text}</prosody>\
         </voice></speak>",
        locale = voice.locale,
        name = voice.name,
        pitch = prosody.pitch,
        rate = prosody.rate,
        volume = prosody.volume,
    )
}

/// Signed percentage offset from normal speed: 125 -> `+25%`, 75 -> `-25%`.
pub fn rate_for_speed(speed_percent: i32) -> String {
    format!("{:+}%", speed_percent - 100)
}

/// 32 lowercase hex characters, a v4 UUID without separators.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Timestamp in the browser `Date.toString()` shape the service expects,
/// e.g. `Sun Oct 18 2026 09:30:00 GMT+0000 (Coordinated Universal Time)`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}
