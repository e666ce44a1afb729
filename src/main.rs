use anyhow::{Context, Result};
use clap::Parser;
use murmur::audio::default_playback;
use murmur::config::{ClientConfig, DEFAULT_CONFIG_PATH};
use murmur::controller::ChatController;
use murmur::speech::SpeechRecognizer;
use murmur::transport::HttpChatApi;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Voice-enabled desktop client for a remote chat service
#[derive(Parser, Debug)]
#[command(name = "murmur", version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Chat service root URL (overrides the configuration)
    #[arg(long)]
    base_url: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?
        .apply_env();
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    config.validate().context("Invalid configuration")?;

    info!("Starting Murmur against {}", config.base_url);

    let api = HttpChatApi::new(&config.base_url).context("Failed to create HTTP client")?;
    let recognizer = build_recognizer(&config);
    let player = default_playback(config.enable_audio_playback);

    let controller = ChatController::new(config, Arc::new(api), recognizer, player)
        .context("Failed to start the chat controller")?;

    murmur::ui::run(controller).map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    Ok(())
}

#[cfg(feature = "local-stt")]
fn build_recognizer(config: &ClientConfig) -> Option<Box<dyn SpeechRecognizer>> {
    use murmur::speech::{WhisperConfig, WhisperRecognizer};

    if !config.enable_voice {
        return None;
    }

    match WhisperRecognizer::new(WhisperConfig::from(config)) {
        Ok(recognizer) => Some(Box::new(recognizer)),
        Err(e) => {
            tracing::warn!("Voice input disabled: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "local-stt"))]
fn build_recognizer(_config: &ClientConfig) -> Option<Box<dyn SpeechRecognizer>> {
    info!("Built without local-stt; voice input disabled");
    None
}
