use std::path::PathBuf;
use std::sync::OnceLock;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::assembler::{AudioSink, FrameOutcome, HeaderStrategy, ResponseAssembler};
use crate::config::TtsConfig;
use crate::error::SynthesisError;
use crate::framing::{Prosody, SynthesisRequest};
use crate::sanitize::sanitize;
use crate::{AudioFile, Voice};

/// Target URL and fixed handshake headers, built once per client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    url: String,
    headers: Vec<(&'static str, String)>,
}

impl ConnectionDescriptor {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            url: config.endpoint_url.clone(),
            headers: vec![
                ("Origin", config.origin.clone()),
                ("Pragma", "no-cache".to_string()),
                ("Cache-Control", "no-cache".to_string()),
                ("User-Agent", config.user_agent.clone()),
            ],
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(&'static str, String)] {
        &self.headers
    }

    /// Handshake request for a new connection.
    pub fn to_request(&self) -> Result<Request, SynthesisError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| SynthesisError::InvalidEndpoint(format!("{}: {e}", self.url)))?;

        for (name, value) in &self.headers {
            let value = HeaderValue::from_str(value)
                .map_err(|e| SynthesisError::InvalidEndpoint(format!("header {name}: {e}")))?;
            request.headers_mut().insert(*name, value);
        }
        Ok(request)
    }
}

/// In-flight state of one call. Deletes the partial file unless committed.
struct PendingSynthesis {
    request_id: String,
    assembler: ResponseAssembler,
    committed: bool,
}

impl PendingSynthesis {
    fn new(request_id: String, path: PathBuf, strategy: HeaderStrategy) -> Self {
        Self {
            request_id,
            assembler: ResponseAssembler::new(strategy, AudioSink::new(path)),
            committed: false,
        }
    }

    /// Connection closed: close the sink and hand out the file if it holds audio.
    async fn complete(mut self) -> Result<AudioFile, SynthesisError> {
        let written = self.assembler.finish().await?;
        let path = self.assembler.sink().path().to_path_buf();

        let on_disk = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        if written == 0 || on_disk == 0 {
            return Err(SynthesisError::NoAudio);
        }

        self.committed = true;
        Ok(AudioFile {
            path,
            request_id: std::mem::take(&mut self.request_id),
            bytes: on_disk,
        })
    }
}

impl Drop for PendingSynthesis {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let sink = self.assembler.sink_mut();
        if sink.written() > 0 {
            debug!("Discarding partial audio for request {}", self.request_id);
        }
        if let Err(e) = sink.discard() {
            warn!("Failed to remove {}: {e}", sink.path().display());
        }
    }
}

/// Client for the read-aloud websocket service.
///
/// Construct once and share by reference (or `Arc`). Calls on one client run
/// one at a time; each call opens its own connection.
pub struct TtsClient {
    config: TtsConfig,
    descriptor: OnceLock<ConnectionDescriptor>,
    in_flight: Mutex<()>,
}

impl TtsClient {
    pub fn new(config: TtsConfig) -> Self {
        // Fails only when a provider is already installed, which is fine
        let _ = rustls::crypto::ring::default_provider().install_default();

        Self {
            config,
            descriptor: OnceLock::new(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(TtsConfig::from_env())
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        self.descriptor
            .get_or_init(|| ConnectionDescriptor::from_config(&self.config))
    }

    /// Synthesize `text` and return the audio file, or `None` when nothing was
    /// produced for any reason.
    pub async fn synthesize(&self, voice: &Voice, speed_percent: i32, text: &str) -> Option<AudioFile> {
        match self.try_synthesize(voice, speed_percent, text).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Synthesis with voice {} failed: {e}", voice.name);
                None
            }
        }
    }

    /// Like [`synthesize`](Self::synthesize) but keeps the failure reason.
    /// `Ok(None)` means the text had nothing to speak.
    pub async fn try_synthesize(
        &self,
        voice: &Voice,
        speed_percent: i32,
        text: &str,
    ) -> Result<Option<AudioFile>, SynthesisError> {
        let Some(text) = sanitize(text) else {
            debug!("Nothing to synthesize");
            return Ok(None);
        };

        let _in_flight = self.in_flight.lock().await;

        tokio::fs::create_dir_all(&self.config.storage_dir)
            .await
            .map_err(|e| {
                error!("Cannot create storage dir {}: {e}", self.config.storage_dir.display());
                SynthesisError::Storage(e)
            })?;

        let prosody = Prosody::with_speed(&self.config.pitch, speed_percent, &self.config.volume);
        let request = SynthesisRequest::new(voice, &prosody, &text, self.config.output_format.clone());
        let path = self.config.storage_dir.join(request.file_name());

        info!(
            "Synthesizing {} chars with {} (rate {}), request {}",
            text.chars().count(),
            voice.name,
            prosody.rate,
            request.id
        );

        let mut pending = PendingSynthesis::new(request.id.clone(), path, self.config.header_strategy);
        self.stream(&request, &mut pending.assembler).await?;
        let file = pending.complete().await?;

        info!("Wrote {} bytes to {}", file.bytes, file.path.display());
        Ok(Some(file))
    }

    /// Open a connection, send both frames and feed every reply to the
    /// assembler until the connection closes.
    async fn stream(
        &self,
        request: &SynthesisRequest,
        assembler: &mut ResponseAssembler,
    ) -> Result<(), SynthesisError> {
        let handshake = self.descriptor().to_request()?;

        let (socket, _response) = timeout(self.config.connect_timeout(), connect_async(handshake))
            .await
            .map_err(|_| SynthesisError::timeout("connecting"))??;
        debug!("Connected for request {}", request.id);

        let (mut write, mut read) = socket.split();

        // The service rejects ssml that arrives before speech.config
        for frame in [request.config_frame(), request.ssml_frame()] {
            timeout(self.config.write_timeout(), write.send(Message::text(frame)))
                .await
                .map_err(|_| SynthesisError::timeout("sending"))??;
        }

        let mut turn_ended = false;
        loop {
            let next = match timeout(self.config.read_timeout(), read.next()).await {
                Ok(next) => next,
                Err(_) if turn_ended => {
                    debug!("No close reply after turn end, treating the turn as closed");
                    break;
                }
                Err(_) => return Err(SynthesisError::timeout("receiving")),
            };

            match next {
                None => break,
                Some(Ok(Message::Close(frame))) => {
                    debug!("Connection closed by service: {frame:?}");
                    break;
                }
                Some(Ok(Message::Binary(data))) => assembler.on_binary(&data).await?,
                Some(Ok(Message::Text(text))) => {
                    if assembler.on_text(text.as_str()) == FrameOutcome::TurnEnded && !turn_ended {
                        turn_ended = true;
                        // Ask the service to close; its reply ends the loop
                        let closing = timeout(self.config.write_timeout(), write.send(Message::Close(None))).await;
                        if !matches!(closing, Ok(Ok(()))) {
                            debug!("Close handshake could not be started, treating turn end as closed");
                            break;
                        }
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) if turn_ended => {
                    debug!("Connection dropped after turn end: {e}");
                    break;
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
