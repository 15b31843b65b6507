//! Agrow helpline server entry point
//!
//! `agrow` serves the telephony webhooks; `agrow ingest` indexes the
//! knowledge corpus into the vector store and exits.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use agrow_config::{load_settings, Settings};
use agrow_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("AGROW_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    if std::env::args().nth(1).as_deref() == Some("ingest") {
        return ingest(&config).await;
    }

    tracing::info!("Starting Agrow helpline v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let metrics_enabled = config.observability.metrics_enabled;
    let host = config.server.host.clone();
    let port = config.server.port;

    let mut state = AppState::from_settings(config).context("building application state")?;
    if metrics_enabled {
        state = state.with_metrics(init_metrics()?);
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    // Cues render in the background; /ready flips once they are done
    {
        let state = state.clone();
        tokio::spawn(async move {
            let rendered = state.orchestrator.prerender_cues().await;
            tracing::info!(rendered, "Response cues rendered");
            state.mark_ready();
        });
    }

    let audio = Arc::clone(&state.audio);
    let reaper = state.orchestrator.start_reaper(move |evicted| {
        audio.evict_calls(evicted);
    });
    let orchestrator = Arc::clone(&state.orchestrator);

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", host, port))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = reaper.send(true);
    orchestrator.shutdown().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Index `retrieval.corpus_path` into the configured collection
async fn ingest(config: &Settings) -> anyhow::Result<()> {
    let indexed = agrow_rag::index_corpus(&config.retrieval)
        .await
        .context("indexing knowledge corpus")?;
    tracing::info!(documents = indexed, "Knowledge corpus indexed");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("agrow={level},tower_http=info").into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
