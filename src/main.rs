//! Gazer - Headless gaze tracking and eye animation service
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gazer::{
    animation::actor,
    config::Config,
    settings,
    tracking::{feed::FeedReceiver, TrackingPipeline},
    transport::{TokenReceiver, TokenSender},
    web::WebServer,
    AppState,
};

/// Gazer - drives an animatronic eye from a depth camera
#[derive(Parser, Debug)]
#[command(name = "gazer", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not run the tracking side (detection feed and token sender)
    #[arg(long)]
    no_tracking: bool,

    /// Do not run the animation side (token receiver and eye animation)
    #[arg(long)]
    no_animation: bool,

    /// Disable the live settings listener
    #[arg(long)]
    no_settings: bool,

    /// Disable HTTP server
    #[arg(long)]
    no_http: bool,

    /// HTTP server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", gazer::NAME, gazer::VERSION);

    let state = setup_and_spawn_services(&args).await?;

    shutdown_signal().await;
    info!("Shutdown signal received");
    state.shutdown();

    // Give tasks a moment to clean up
    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

    info!("Gazer stopped");
    Ok(())
}

/// Setup config, create AppState, and spawn all background services.
async fn setup_and_spawn_services(args: &Args) -> anyhow::Result<Arc<AppState>> {
    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if args.no_tracking {
        config.feed.enabled = false;
    }
    if args.no_settings {
        config.settings.enabled = false;
    }
    if args.no_http {
        config.http.enabled = false;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    // Validate configuration
    config.validate()?;

    info!(
        "Detection feed: {} ({}:{})",
        config.feed.enabled, config.feed.listen_address, config.feed.port
    );
    info!("Gaze tokens: {}:{}", config.transport.host, config.transport.port);
    info!("Buckets: {}", config.encoder.num_divisions);
    info!("HTTP server: {}", config.http.enabled);

    // Create shared application state
    let state = AppState::new(config.clone());

    // Animation first so its token receiver is bound before tracking sends
    if !args.no_animation {
        let handle = actor::spawn(
            &config.animation,
            config.encoder.num_divisions,
            state.events_tx.clone(),
            state.subscribe_shutdown(),
        );
        state.set_animation(handle).await;

        let animation_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = run_animation(animation_state).await {
                error!("Animation error: {}", e);
            }
        });
    } else {
        info!("Animation disabled");
    }

    if config.feed.enabled {
        let tracking_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = run_tracking(tracking_state).await {
                error!("Tracking error: {}", e);
            }
        });
    } else {
        info!("Tracking disabled");
    }

    if config.settings.enabled {
        let settings_state = Arc::clone(&state);
        let settings_config = config.settings.clone();
        tokio::spawn(async move {
            if let Err(e) = settings::run_settings_listener(settings_state, settings_config).await {
                error!("Settings listener error: {}", e);
            }
        });
    }

    if config.http.enabled {
        let http_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = run_http_server(http_state).await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    Ok(state)
}

/// Detection feed -> tracker -> encoder -> token sender
async fn run_tracking(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut config_rx = state.subscribe_config();
    let config = state.config.read().await.clone();

    let mut shutdown_rx = state.subscribe_shutdown();

    let mut receiver = FeedReceiver::new(&config.feed);
    receiver.start()?;
    let sender = TokenSender::bind(&config.transport).await?;
    let mut pipeline = TrackingPipeline::new(&config);

    info!("Tracking started");

    loop {
        tokio::select! {
            result = receiver.process() => {
                match result {
                    Ok(Some(detections)) => {
                        let Some(update) = pipeline.process(&detections, Instant::now()) else {
                            continue;
                        };
                        if let Err(e) = sender.send(&update).await {
                            warn!("Gaze token not sent: {}", e);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Detection feed error: {}", e);
                        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                    }
                }
            }
            Ok(()) = config_rx.changed() => {
                let config = state.config.read().await;
                pipeline.reconfigure(&config);
                debug!("Tracking reconfigured");
            }
            _ = shutdown_rx.recv() => {
                receiver.stop();
                info!("Tracking stopped");
                return Ok(());
            }
        }
    }
}

/// Token receiver -> animation actor
async fn run_animation(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut config_rx = state.subscribe_config();
    let config = state.config.read().await.clone();
    let Some(handle) = state.animation().await else {
        return Ok(());
    };

    let mut shutdown_rx = state.subscribe_shutdown();

    let mut receiver = TokenReceiver::new(&config.transport);
    receiver.start()?;

    info!("Animation listening for gaze tokens");

    loop {
        tokio::select! {
            result = receiver.process() => {
                match result {
                    Ok(Some(update)) => handle.push_gaze(update),
                    Ok(None) => {}
                    Err(e) => warn!("Gaze token dropped: {}", e),
                }
            }
            Ok(()) = config_rx.changed() => {
                let config = state.config.read().await;
                let animation = config.animation.clone();
                let buckets = config.encoder.num_divisions;
                drop(config);
                if let Err(e) = handle.reconfigure(animation, buckets).await {
                    error!("Animation reconfigure failed: {}", e);
                }
            }
            _ = shutdown_rx.recv() => {
                receiver.stop();
                return Ok(());
            }
        }
    }
}

async fn run_http_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let http_config = state.config.read().await.http.clone();
    WebServer::new(state, &http_config).serve().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
