mod api;
mod cli;
mod router;
mod state;

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use planit_core::config::StoreBackend;
use planit_core::Config;
use planit_notify::{Dispatcher, Notifier, QueueNotifier};
use planit_scheduler::{CycleOrchestrator, CycleTrigger, LivenessChecker, SchedulerRunner, ThresholdEvaluator};
use planit_store::{InMemoryTaskStore, PgTaskStore, TaskStore};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, reload, EnvFilter};

use crate::cli::{CliArgs, Command};
use crate::state::AppState;

/// Everything a cycle needs, shared by `serve` and `run-once`.
struct Services {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    orchestrator: Arc<CycleOrchestrator>,
}

type LogFilterHandle = reload::Handle<EnvFilter, fmt::Formatter>;

/// A non-empty `RUST_LOG` always wins; otherwise the `DEBUG` flag picks the level.
fn filter_directive(rust_log: Option<&str>, debug: bool) -> String {
    match rust_log.map(str::trim) {
        Some(directive) if !directive.is_empty() => directive.to_string(),
        _ if debug => "debug".to_string(),
        _ => "info".to_string(),
    }
}

fn rust_log() -> Option<String> {
    std::env::var("RUST_LOG").ok()
}

fn init_tracing() -> LogFilterHandle {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directive(rust_log().as_deref(), false)))
        .with_target(false)
        .with_level(true)
        .with_filter_reloading();
    let handle = builder.reload_handle();
    builder.init();
    handle
}

fn apply_debug_flag(handle: &LogFilterHandle, debug: bool) {
    let directive = filter_directive(rust_log().as_deref(), debug);
    if let Err(e) = handle.reload(EnvFilter::new(&directive)) {
        warn!(error = %e, %directive, "failed to apply log filter");
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn TaskStore>> {
    match config.store.backend() {
        Some(StoreBackend::Memory) => {
            warn!("Using in-memory task store; tasks are not persisted");
            Ok(Arc::new(InMemoryTaskStore::new()))
        }
        Some(StoreBackend::Postgres) => {
            let store = PgTaskStore::connect_lazy(
                &config.store.url,
                config.store.max_connections,
                config.scheduler.outbound_timeout(),
            )
            .with_context(|| format!("invalid TASK_STORE_URL {}", config.store.redacted_url()))?;
            // The database may still be starting; /health reports it until it is reachable.
            if let Err(e) = store.migrate().await {
                warn!(error = %e, "Failed to apply task store migrations");
            }
            Ok(Arc::new(store))
        }
        None => anyhow::bail!("unsupported TASK_STORE_URL scheme: {}", config.store.redacted_url()),
    }
}

async fn build_services(config: &Config) -> anyhow::Result<Services> {
    let store = build_store(config).await?;
    let notifier: Arc<dyn Notifier> = Arc::new(
        QueueNotifier::new(&config.queue.url, &config.queue.health_url, config.scheduler.outbound_timeout())
            .context("invalid messaging queue configuration")?,
    );
    let evaluator = ThresholdEvaluator::new(
        Arc::clone(&store),
        Arc::new(Dispatcher::new(Arc::clone(&notifier))),
        config.scheduler.interval(),
        config.scheduler.outbound_timeout(),
    );
    let orchestrator = Arc::new(CycleOrchestrator::new(config.scheduler.thresholds.clone(), evaluator));

    Ok(Services {
        store,
        notifier,
        orchestrator,
    })
}

async fn serve(config: &Config, services: Services) -> anyhow::Result<()> {
    let scheduler = SchedulerRunner::new(
        Arc::clone(&services.orchestrator),
        config.scheduler.tick_period(),
        config.scheduler.misfire_grace(),
    )
    .spawn();

    let state = Arc::new(AppState {
        orchestrator: services.orchestrator,
        liveness: LivenessChecker::new(services.store, services.notifier, config.scheduler.outbound_timeout()),
        scheduler_running: scheduler.running_flag(),
        config_summary: config.redacted_summary(),
        version: env!("CARGO_PKG_VERSION"),
    });
    let app = router::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn run_once(services: Services) -> anyhow::Result<()> {
    let report = services.orchestrator.run_cycle(Utc::now(), CycleTrigger::Manual).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
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
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    planit_core::config::load_dotenv();
    let args = CliArgs::parse();

    // Installed before config parsing so invalid-value warnings are visible,
    // then re-levelled from the profile's DEBUG flag.
    let log_filter = init_tracing();

    let mut config = match &args.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    args.apply_overrides(&mut config.server);
    apply_debug_flag(&log_filter, config.server.debug);
    config.log_summary();

    let services = build_services(&config).await?;
    match args.command() {
        Command::Serve => serve(&config, services).await,
        Command::RunOnce => run_once(services).await,
    }
}
