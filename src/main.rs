use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whep_player::session::SessionManager;
use whep_player::signaling::HttpSignalingClient;
use whep_player::sink::LogSinkRegistry;
use whep_player::transport::RtcTransportFactory;
use whep_player::PlayerConfig;

/// whep-player command line arguments
#[derive(Parser, Debug)]
#[command(name = "whep-player")]
#[command(version, about = "Plays a WHEP stream from a media server", long_about = None)]
struct CliArgs {
    /// WHEP signaling origin, e.g. http://mediamtx.local:8889
    #[arg(short, long, value_name = "URL")]
    base_url: String,

    /// Stream mount point to play
    #[arg(short, long, value_name = "MOUNT")]
    mount: String,

    /// Sink identifier the stream is bound to
    #[arg(short, long, value_name = "ID", default_value = "player-0")]
    sink: String,

    /// STUN server URL (repeatable)
    #[arg(long, value_name = "URL", default_value = "stun:stun.l.google.com:19302")]
    stun: Vec<String>,

    /// ICE candidate gathering timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    gathering_timeout: u64,

    /// Log filter (tracing env-filter syntax)
    #[arg(short, long, value_name = "FILTER", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&args.log)?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting whep-player v{}", env!("CARGO_PKG_VERSION"));

    let config = PlayerConfig {
        media_base: Some(args.base_url),
        stun_servers: args.stun,
        turn_servers: vec![],
        gathering_timeout_ms: args.gathering_timeout,
    };

    let manager = SessionManager::new(
        config,
        Arc::new(RtcTransportFactory),
        Arc::new(HttpSignalingClient::new()),
        Arc::new(LogSinkRegistry::new()),
    );

    if let Err(err) = manager.start_session(&args.mount, &args.sink).await {
        anyhow::bail!("failed to start playback for '{}': {err}", args.mount);
    }

    tracing::info!(mount = %args.mount, "playing, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    manager.stop_session(&args.mount, &args.sink).await;
    tracing::info!("stopped");
    Ok(())
}
