use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use tts_core::{AudioPlayer, TtsClient, TtsConfig, Voice};

/// Read text aloud through the streaming speech service.
#[derive(Debug, Parser)]
#[command(name = "readaloud", version)]
struct Args {
    /// Voice name, e.g. en-US-JennyNeural
    #[arg(long, default_value = "en-US-JennyNeural")]
    voice: String,

    /// Voice locale; derived from the voice name when omitted
    #[arg(long)]
    locale: Option<String>,

    /// Speed in percent of normal (100 = normal)
    #[arg(long, default_value_t = 100)]
    speed: i32,

    /// Play the result with the configured player and delete it afterwards
    #[arg(long)]
    play: bool,

    /// Text to speak; read from stdin when omitted
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main(Args::parse()).await
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    let config = TtsConfig::from_env();
    info!(
        "Configuration loaded: format={}, storage={}, timeouts={}s/{}s/{}s",
        config.output_format.as_str(),
        config.storage_dir.display(),
        config.connect_timeout_secs,
        config.read_timeout_secs,
        config.write_timeout_secs
    );

    let text = if args.text.is_empty() {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        args.text.join(" ")
    };

    let locale = args
        .locale
        .clone()
        .unwrap_or_else(|| locale_from_voice(&args.voice));
    let voice = Voice::new(locale, args.voice.clone());

    let player = if args.play {
        Some(AudioPlayer::new(&config.player_command)?)
    } else {
        None
    };

    let client = TtsClient::new(config);

    // Ctrl-C drops the in-flight call, which closes the connection and
    // removes the partial file
    let result = tokio::select! {
        file = client.synthesize(&voice, args.speed, &text) => file,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            return Ok(());
        }
    };

    let Some(file) = result else {
        anyhow::bail!("No audio produced");
    };

    match player {
        Some(player) => player.play(&file.path).await?,
        None => println!("{}", file.path.display()),
    }
    Ok(())
}

/// `en-US-JennyNeural` -> `en-US`
fn locale_from_voice(voice: &str) -> String {
    let mut parts = voice.splitn(3, '-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region)) if parts.next().is_some() => format!("{lang}-{region}"),
        _ => "en-US".to_string(),
    }
}
