/**
 * UNINET STATUS SERVER - Point d'entrée du serveur de statut du labo
 *
 * RÔLE : Charge la config, résout le fichier de logs, monte l'API REST.
 * Liveness by ping, roster with session users from the carrera log, log queries.
 *
 * UTILITÉ : Backend polled by the dashboard sync core (uninet-core).
 */

mod config;
mod error;
mod health;
mod http;
mod logs;
mod models;
mod probe;
mod state;

use crate::config::{load_config, resolve_log_file, LOGS_CONF};
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::probe::PingProbe;
use crate::state::{new_state, ProbeBook};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;
    let log_file = resolve_log_file(std::env::var("UNINET_LOG_FILE").ok(), &cfg, Path::new(LOGS_CONF));

    info!("monitoring {} hosts", cfg.hosts.len());
    for h in &cfg.hosts {
        info!("  - {}: {}", h.name, h.ip);
    }
    info!("carrera log: {}", log_file.display());

    let addr = cfg.bind;
    let app_state = AppState {
        probe: Arc::new(PingProbe::new(cfg.ping_timeout_secs)),
        cfg: Arc::new(cfg),
        book: new_state(ProbeBook::default()),
        health_tracker: HealthTracker::new(),
        log_file: Arc::new(log_file),
    };

    let app = http::build_router(app_state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await.context("http server failed")?;
    Ok(())
}
