//! Demultiplexes service responses into metadata and audio.
//!
//! Text frames carry protocol metadata as `headers\r\n\r\nbody`. Binary frames
//! carry a small header block followed by raw audio bytes, which are appended
//! to the request's [`AudioSink`] in arrival order.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

const AUDIO_MARKER: &[u8] = b"Path:audio\r\n";

/// How the header block of a binary frame is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderStrategy {
    /// Two big-endian bytes give the header length; audio follows the header.
    #[default]
    LengthPrefixed,
    /// Audio starts right after the first `Path:audio\r\n` marker.
    AudioMarker,
}

/// A parsed text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame<'a> {
    pub path: &'a str,
    pub request_id: Option<&'a str>,
    pub body: &'a str,
}

/// What the connection loop should do after a frame was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    TurnEnded,
}

/// Split a text frame into its headers and body. `None` if it has no `Path` header.
pub fn parse_text_frame(text: &str) -> Option<TextFrame<'_>> {
    let (head, body) = text.split_once("\r\n\r\n").unwrap_or((text, ""));

    let mut path = None;
    let mut request_id = None;
    for line in head.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            k if k.eq_ignore_ascii_case("Path") => path = Some(value.trim()),
            k if k.eq_ignore_ascii_case("X-RequestId") => request_id = Some(value.trim()),
            _ => {}
        }
    }

    Some(TextFrame {
        path: path?,
        request_id,
        body,
    })
}

/// Audio bytes carried by a binary frame, or `None` if the frame holds no audio.
pub fn audio_payload(strategy: HeaderStrategy, data: &[u8]) -> Option<&[u8]> {
    match strategy {
        HeaderStrategy::LengthPrefixed => {
            if data.len() < 2 {
                return None;
            }
            let header_len = u16::from_be_bytes([data[0], data[1]]) as usize;
            let header = data.get(2..2 + header_len)?;
            if !contains(header, AUDIO_MARKER) && !header.ends_with(b"Path:audio") {
                return None;
            }
            Some(&data[2 + header_len..])
        }
        HeaderStrategy::AudioMarker => {
            let start = find(data, AUDIO_MARKER)? + AUDIO_MARKER.len();
            Some(&data[start..])
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Output file for one request, opened on the first write.
#[derive(Debug)]
pub struct AudioSink {
    path: PathBuf,
    file: Option<File>,
    written: u64,
}

impl AudioSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn append(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let file = match self.file.take() {
            Some(file) => file,
            None => File::create(&self.path).await?,
        };
        let file = self.file.insert(file);
        file.write_all(bytes).await?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Flush and close the file. Returns the number of bytes written.
    pub async fn close(&mut self) -> std::io::Result<u64> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(self.written)
    }

    /// Drop the open handle and delete whatever was written so far.
    pub fn discard(&mut self) -> std::io::Result<()> {
        self.file = None;
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Consumes the frames of one connection in arrival order.
#[derive(Debug)]
pub struct ResponseAssembler {
    strategy: HeaderStrategy,
    sink: AudioSink,
    frames: usize,
}

impl ResponseAssembler {
    pub fn new(strategy: HeaderStrategy, sink: AudioSink) -> Self {
        Self {
            strategy,
            sink,
            frames: 0,
        }
    }

    pub fn sink(&self) -> &AudioSink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut AudioSink {
        &mut self.sink
    }

    /// Metadata frame. Unknown or malformed frames are skipped.
    pub fn on_text(&mut self, text: &str) -> FrameOutcome {
        let Some(frame) = parse_text_frame(text) else {
            debug!("Ignoring text frame without Path header ({} bytes)", text.len());
            return FrameOutcome::Continue;
        };

        match frame.path {
            "turn.end" => {
                debug!("Turn ended after {} audio frames", self.frames);
                FrameOutcome::TurnEnded
            }
            "turn.start" | "response" | "audio.metadata" => {
                trace!(path = frame.path, body = frame.body, "metadata frame");
                FrameOutcome::Continue
            }
            other => {
                debug!("Ignoring unrecognized text frame path {other}");
                FrameOutcome::Continue
            }
        }
    }

    /// Audio frame: append the payload to the sink.
    pub async fn on_binary(&mut self, data: &[u8]) -> std::io::Result<()> {
        match audio_payload(self.strategy, data) {
            Some(audio) => {
                self.frames += 1;
                trace!("audio frame {} with {} bytes", self.frames, audio.len());
                self.sink.append(audio).await
            }
            None => {
                debug!("Ignoring binary frame without audio ({} bytes)", data.len());
                Ok(())
            }
        }
    }

    /// Stream closed: flush and close the sink. Returns the number of bytes written.
    pub async fn finish(&mut self) -> std::io::Result<u64> {
        self.sink.close().await
    }
}
