//! Common utilities for integration tests: an in-process speech service.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tts_core::TtsConfig;

/// What the fake service does once it has received both request frames.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Send each payload as an audio frame, then `turn.end`, then wait for the
    /// client to close.
    Speak(Vec<Vec<u8>>),
    /// Send each payload as an audio frame, then close from the server side.
    SpeakThenClose(Vec<Vec<u8>>),
    /// Send one audio frame and keep the connection open forever.
    SpeakThenHang(Vec<u8>),
    /// Send each payload, then `turn.end`, then stop reading so the close
    /// handshake is never answered.
    SpeakThenIgnoreClose(Vec<Vec<u8>>),
    /// Close right away without audio.
    CloseSilently,
    /// Never answer.
    Hang,
}

#[derive(Clone)]
struct ServiceState {
    behavior: Behavior,
    frames: Arc<Mutex<Vec<String>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

pub struct MockService {
    pub addr: SocketAddr,
    frames: Arc<Mutex<Vec<String>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

impl MockService {
    pub fn url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    /// Text frames received so far, across all connections.
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    /// Handshake headers of every connection.
    pub fn handshakes(&self) -> Vec<HeaderMap> {
        self.headers.lock().unwrap().clone()
    }
}

static TRACING: Once = Once::new();

/// Route client logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub async fn spawn_service(behavior: Behavior) -> MockService {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = ServiceState {
        behavior,
        frames: Arc::new(Mutex::new(Vec::new())),
        headers: Arc::new(Mutex::new(Vec::new())),
    };
    let service = MockService {
        addr,
        frames: state.frames.clone(),
        headers: state.headers.clone(),
    };

    let app = Router::new().route("/", get(speech_ws)).with_state(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    service
}

async fn speech_ws(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<ServiceState>,
) -> impl IntoResponse {
    state.headers.lock().unwrap().push(headers);
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: ServiceState) {
    let mut request_id = String::new();
    let mut received = 0;
    while received < 2 {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                if let Some(id) = header_value(text.as_str(), "X-RequestId") {
                    request_id = id.to_string();
                }
                state.frames.lock().unwrap().push(text.to_string());
                received += 1;
            }
            Some(Ok(_)) => {}
            _ => return,
        }
    }

    let _ = socket
        .send(Message::Text(text_frame(&request_id, "turn.start", "{}").into()))
        .await;

    match state.behavior {
        Behavior::Speak(chunks) => {
            for chunk in chunks {
                let _ = socket.send(Message::Binary(audio_frame(&request_id, &chunk).into())).await;
            }
            let _ = socket
                .send(Message::Text(text_frame(&request_id, "turn.end", "{}").into()))
                .await;
            drain(&mut socket).await;
        }
        Behavior::SpeakThenClose(chunks) => {
            for chunk in chunks {
                let _ = socket.send(Message::Binary(audio_frame(&request_id, &chunk).into())).await;
            }
            let _ = socket.send(Message::Close(None)).await;
            drain(&mut socket).await;
        }
        Behavior::SpeakThenHang(chunk) => {
            let _ = socket.send(Message::Binary(audio_frame(&request_id, &chunk).into())).await;
            drain(&mut socket).await;
        }
        Behavior::SpeakThenIgnoreClose(chunks) => {
            for chunk in chunks {
                let _ = socket.send(Message::Binary(audio_frame(&request_id, &chunk).into())).await;
            }
            let _ = socket
                .send(Message::Text(text_frame(&request_id, "turn.end", "{}").into()))
                .await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Behavior::CloseSilently => {
            let _ = socket.send(Message::Close(None)).await;
            drain(&mut socket).await;
        }
        Behavior::Hang => drain(&mut socket).await,
    }
}

/// Read until the client goes away. Reading past a close frame flushes the reply.
async fn drain(socket: &mut WebSocket) {
    while let Some(Ok(_)) = socket.recv().await {}
}

fn header_value<'a>(frame: &'a str, name: &str) -> Option<&'a str> {
    let head = frame.split("\r\n\r\n").next()?;
    head.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key == name).then_some(value)
    })
}

pub fn text_frame(request_id: &str, path: &str, body: &str) -> String {
    format!("X-RequestId:{request_id}\r\nContent-Type:application/json; charset=utf-8\r\nPath:{path}\r\n\r\n{body}")
}

/// Binary audio frame: big-endian header length, header, payload.
pub fn audio_frame(request_id: &str, payload: &[u8]) -> Vec<u8> {
    let header = format!("X-RequestId:{request_id}\r\nContent-Type:audio/mpeg\r\nPath:audio\r\n");
    let mut data = (header.len() as u16).to_be_bytes().to_vec();
    data.extend_from_slice(header.as_bytes());
    data.extend_from_slice(payload);
    data
}

pub fn test_config(url: impl Into<String>, storage: &Path) -> TtsConfig {
    TtsConfig {
        endpoint_url: url.into(),
        connect_timeout_secs: 5,
        read_timeout_secs: 5,
        write_timeout_secs: 5,
        ..TtsConfig::default()
    }
    .with_storage_dir(storage)
}

/// Files currently in `dir`.
pub fn files_in(dir: &Path) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}
