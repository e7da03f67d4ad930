use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use scribe_stream::{
    Config, ConsoleSink, JwtTokenProvider, MicrophoneBackend, SessionConfig, SessionController,
    WebSocketConnector,
};
use tracing::info;

/// Record from the default microphone and stream a live transcript.
#[derive(Parser)]
#[command(name = "scribe-stream", version)]
struct Args {
    /// Path to the config file (without extension)
    #[arg(long, default_value = "config/scribe-stream")]
    config: String,

    /// Stop automatically after this many seconds (default: run until ctrl-c)
    #[arg(long)]
    duration_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("scribe-stream v{}", env!("CARGO_PKG_VERSION"));
    info!("Transcription endpoint: {}", cfg.transcription.endpoint);

    let controller = SessionController::new(
        Box::new(MicrophoneBackend::new()),
        Arc::new(WebSocketConnector::new(cfg.transcription.endpoint)),
        Arc::new(JwtTokenProvider::new(
            cfg.auth.access_token,
            cfg.auth.refresh_token,
            cfg.auth.refresh_url,
        )),
        Arc::new(ConsoleSink),
    );

    let session_config = SessionConfig {
        speech_locales: cfg.transcription.speech_locales,
        ..SessionConfig::default()
    };
    controller.start(session_config).await?;
    info!("Recording; press ctrl-c to stop");

    match args.duration_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => tokio::signal::ctrl_c().await?,
    }

    controller.stop().await?;

    let transcript = controller.transcript();
    println!("\n--- transcript ({} items) ---", transcript.len());
    for item in &transcript {
        println!(
            "[{:>6}ms - {:>6}ms] {}",
            item.start_offset_ms, item.end_offset_ms, item.text
        );
    }

    Ok(())
}
