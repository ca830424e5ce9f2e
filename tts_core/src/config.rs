// Configuration for the read-aloud client

use std::path::PathBuf;
use std::time::Duration;

use crate::assembler::HeaderStrategy;
use crate::framing::AudioFormat;

pub const DEFAULT_ENDPOINT_URL: &str = "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1?TrustedClientToken=6A5AA1D4EAFF4E9FB37E23D68491D6F4";
pub const DEFAULT_ORIGIN: &str = "chrome-extension://jdiccldimpdaibmpdkjnbmckianbfold";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.77 Safari/537.36 Edg/91.0.864.41";
pub const DEFAULT_PLAYER: &str = "mpv --no-video";

#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub endpoint_url: String,
    pub origin: String,
    pub user_agent: String,
    pub storage_dir: PathBuf,
    pub output_format: AudioFormat,
    pub pitch: String,
    pub volume: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub header_strategy: HeaderStrategy,
    pub player_command: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            storage_dir: std::env::temp_dir().join("readaloud"),
            output_format: AudioFormat::default(),
            pitch: "+0Hz".to_string(),
            volume: "+0%".to_string(),
            connect_timeout_secs: 30,
            read_timeout_secs: 30,
            write_timeout_secs: 30,
            header_strategy: HeaderStrategy::LengthPrefixed,
            player_command: DEFAULT_PLAYER.to_string(),
        }
    }
}

impl TtsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoint_url = env_string("TTS_ENDPOINT_URL").unwrap_or(defaults.endpoint_url);
        let origin = env_string("TTS_ORIGIN").unwrap_or(defaults.origin);
        let user_agent = env_string("TTS_USER_AGENT").unwrap_or(defaults.user_agent);

        let storage_dir = env_string("TTS_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);

        let output_format = env_string("TTS_OUTPUT_FORMAT")
            .map(AudioFormat::new)
            .unwrap_or(defaults.output_format);

        let pitch = env_string("TTS_PITCH").unwrap_or(defaults.pitch);
        let volume = env_string("TTS_VOLUME").unwrap_or(defaults.volume);

        let connect_timeout_secs = env_parse("TTS_CONNECT_TIMEOUT_SECS").unwrap_or(30);
        let read_timeout_secs = env_parse("TTS_READ_TIMEOUT_SECS").unwrap_or(30);
        let write_timeout_secs = env_parse("TTS_WRITE_TIMEOUT_SECS").unwrap_or(30);

        let header_strategy = header_strategy_from(env_string("TTS_FIND_HEAD_HOOK").as_deref());

        let player_command = env_string("TTS_PLAYER").unwrap_or(defaults.player_command);

        Self {
            endpoint_url,
            origin,
            user_agent,
            storage_dir,
            output_format,
            pitch,
            volume,
            connect_timeout_secs,
            read_timeout_secs,
            write_timeout_secs,
            header_strategy,
            player_command,
        }
    }

    /// Point the client at a different cache directory.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

fn header_strategy_from(flag: Option<&str>) -> HeaderStrategy {
    match flag {
        Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => HeaderStrategy::AudioMarker,
        _ => HeaderStrategy::LengthPrefixed,
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}
