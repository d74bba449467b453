mod broker_factory;
mod external_inputs;
mod tasks;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mqk_config::{Scope, ResolvedSecrets};
use mqk_scheduler::{TaskKind, TaskScheduleConfig};

use external_inputs::FileBackedExternalInputs;

#[derive(Parser)]
#[command(name = "mqk")]
#[command(about = "MiniQuantDesk V4 control-plane CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> engine -> risk -> stress...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Serve the control plane for one scope: reconciliation, regime
    /// validation, universe governance, and constitutional governance all
    /// run as scheduled background tasks; the ops query layer and trading
    /// surface are exposed over HTTP.
    Serve {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Address to bind the HTTP server on.
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        /// Root directory for this scope's persisted state.
        #[arg(long, env = "MQK_PERSIST_ROOT", default_value = "./data")]
        persist_root: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = mqk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Serve { config_paths, addr, persist_root } => {
            serve(config_paths, addr, persist_root).await?;
        }
    }

    Ok(())
}

async fn serve(config_paths: Vec<String>, addr: String, persist_root: String) -> Result<()> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = mqk_config::load_layered_yaml(&path_refs)?;

    let scope = Scope::from_env().context("resolving scope from MQK_ENV / MQK_BROKER / MQK_MARKET / MQK_REGION")?;
    let flags: mqk_config::FeatureFlags = match loaded.config_json.get("feature_flags") {
        Some(v) => serde_json::from_value(v.clone()).context("parsing feature_flags from layered config")?,
        None => mqk_config::FeatureFlags::default(),
    };

    let run_mode = if scope.is_live() { "LIVE" } else { "PAPER" };
    let secrets: ResolvedSecrets = mqk_config::resolve_secrets_for_mode(&loaded.config_json, run_mode)?;

    tracing::info!(scope = %scope.slug(), config_hash = %loaded.config_hash, "starting mqk control plane");

    let state = Arc::new(mqk_daemon::state::AppState::with_scope(scope.clone(), &persist_root));
    let paths = state.paths.clone();

    let broker: Arc<dyn mqk_broker_core::BrokerAdapter> =
        Arc::from(broker_factory::broker_for_scope(&scope, &secrets, &flags)?);

    let external_dir = paths.root().join("external_inputs");
    let external: Arc<dyn external_inputs::ExternalInputs> =
        Arc::new(FileBackedExternalInputs::new(external_dir));

    let mut handles = Vec::new();

    handles.push(mqk_scheduler::spawn_task(
        paths.clone(),
        TaskKind::Reconciliation,
        TaskScheduleConfig::new(60),
        tasks::reconciliation_task(paths.clone(), broker.clone()),
    ));

    if flags.phase_g_enabled {
        handles.push(mqk_scheduler::spawn_task(
            paths.clone(),
            TaskKind::RegimeValidation,
            TaskScheduleConfig::new(300),
            tasks::regime_validation_task(paths.clone(), scope.clone(), external.clone()),
        ));
    }

    handles.push(mqk_scheduler::spawn_task(
        paths.clone(),
        TaskKind::UniverseGovernance,
        TaskScheduleConfig::new(3600),
        tasks::universe_governance_task(paths.clone(), external.clone()),
    ));

    if flags.governance_enabled {
        handles.push(mqk_scheduler::spawn_task(
            paths.clone(),
            TaskKind::ConstitutionalGovernance,
            TaskScheduleConfig::new(3600),
            tasks::constitutional_governance_task(paths.clone(), scope.clone(), external.clone()),
        ));
    }

    let router = mqk_daemon::routes::build_router(state).layer(
        tower_http::trace::TraceLayer::new_for_http()
            .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
            .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
    );
    let socket_addr: SocketAddr = addr.parse().context("parsing --addr")?;
    tracing::info!(%socket_addr, "listening");

    let listener = tokio::net::TcpListener::bind(socket_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown signal received, waiting for in-flight scheduler ticks to finish");
    for handle in handles {
        handle.cancel_and_join().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
