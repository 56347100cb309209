use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatops_hook::config::{Options, load_plugins_config, read_secret_file};
use chatops_hook::dispatch::{EventRouter, InFlightTasks};
use chatops_hook::github::OctocrabClient;
use chatops_hook::metrics::Metrics;
use chatops_hook::plugins::approvers::ApproversPlugin;
use chatops_hook::plugins::assign::AssignPlugin;
use chatops_hook::plugins::associate::AssociatePlugin;
use chatops_hook::plugins::label::LabelPlugin;
use chatops_hook::plugins::lifecycle::LifecyclePlugin;
use chatops_hook::plugins::tide::TidePlugin;
use chatops_hook::plugins::PluginRegistry;
use chatops_hook::server::{AppState, build_router};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatops_hook=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = Options::parse();

    let secret = read_secret_file(&options.hmac_secret_file)?.into_bytes();
    let token = read_secret_file(&options.github_token_file)?;
    let plugins_config = load_plugins_config(&options.config)?;
    let github = OctocrabClient::from_token(token)?;

    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(LabelPlugin::new(plugins_config.label)))?;
    registry.register(Arc::new(AssignPlugin::new(plugins_config.assign)))?;
    registry.register(Arc::new(LifecyclePlugin::new(plugins_config.lifecycle)))?;
    registry.register(Arc::new(TidePlugin::new(plugins_config.tide)))?;
    registry.register(Arc::new(ApproversPlugin::new(plugins_config.approvers)))?;
    registry.register(Arc::new(AssociatePlugin::new(plugins_config.associate)))?;
    info!(plugins = ?registry.names(), "Registered plugins");

    let router = EventRouter::new(
        Arc::new(registry),
        Arc::new(github),
        options.bot_name.clone(),
        InFlightTasks::new(),
        Arc::new(Metrics::new()),
    );
    let app_state = AppState::with_fixed_secret(secret, router);
    let app = build_router(app_state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], options.port));
    info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let timeout = options.shutdown_timeout();
    if tokio::time::timeout(timeout, app_state.graceful_shutdown())
        .await
        .is_err()
    {
        warn!(
            remaining = app_state.in_flight().len(),
            timeout_secs = timeout.as_secs(),
            "Timed out waiting for in-flight work"
        );
    }
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received; no longer accepting connections");
}
