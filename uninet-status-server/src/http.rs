/**
 * API REST UNINET - Serveur de statut du labo
 *
 * RÔLE :
 * Source of the two snapshots the dashboard polls (liveness every 2s, roster every
 * 10s), plus the per-carrera log queries and service health.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, CORS ouvert (le dashboard tourne sur une autre origine)
 * - /api/status and /api/pcs probe every configured host concurrently on each call
 * - the probe book keeps the last time each host answered, across calls
 * - les erreurs sortent en codes HTTP (400 ip invalide, 422 limit hors bornes, 500 IO)
 *
 * ROUTES :
 * GET /                    infos service
 * GET /health              {status, timestamp}
 * GET /system/health       uptime, hôtes suivis, probes, mémoire
 * GET /api/status          [{id, name, ip, alive, lastSeen}]
 * GET /api/hosts           hôtes configurés, sans probe
 * GET /api/ping/{ip}       probe unique
 * GET /api/pcs?carrera=    roster [{id, name, ip, status, user, lastSeen, carrera}]
 * GET /api/logs            ?carrera=&username=&limit=
 * GET /api/logs/carreras   ?limit=
 */

use crate::config::{HostConf, ServerConfig};
use crate::error::ServerError;
use crate::health::{HealthTracker, ServerHealth};
use crate::logs::{self, CARRERAS_LIMIT, LOGS_LIMIT, SESSION_WINDOW};
use crate::models::{now_rfc3339, HostStatus, PingReport};
use crate::probe::Probe;
use crate::state::{ProbeBook, Shared, Sighting};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};
use uninet_core::models::DEFAULT_CARRERA;
use uninet_core::{MachineStatus, RosterEntry};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<ServerConfig>,
    pub probe: Arc<dyn Probe>,
    pub book: Shared<ProbeBook>,
    pub health_tracker: HealthTracker,
    pub log_file: Arc<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RosterParams {
    carrera: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogParams {
    carrera: Option<String>,
    username: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LimitParams {
    limit: Option<usize>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/system/health", get(get_system_health))
        .route("/api/status", get(get_status))
        .route("/api/hosts", get(get_hosts))
        .route("/api/ping/{ip}", get(ping_one))
        .route("/api/pcs", get(get_roster))
        .route("/api/logs", get(get_logs))
        .route("/api/logs/carreras", get(get_log_carreras))
        .with_state(app_state)
        .layer(CorsLayer::permissive())
}

// Vide = pas de filtre
fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Probes every configured host at once and records the outcomes.
async fn probe_all(app: &AppState) -> Vec<(HostConf, Sighting)> {
    let hosts = &app.cfg.hosts;
    let answers = join_all(hosts.iter().map(|h| app.probe.probe(h.ip))).await;
    app.health_tracker.count_probes(hosts.len());

    let now = OffsetDateTime::now_utc();
    let mut book = app.book.lock();
    let out: Vec<(HostConf, Sighting)> = hosts
        .iter()
        .zip(answers)
        .map(|(h, alive)| (h.clone(), book.record(h.ip, alive, now)))
        .collect();
    debug!(
        hosts = out.len(),
        alive = out.iter().filter(|(_, s)| s.alive).count(),
        "probe round done"
    );
    out
}

// GET /
async fn root() -> Json<Value> {
    Json(json!({
        "name": "UniNet Status Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
    }))
}

// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": now_rfc3339() }))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<ServerHealth> {
    Json(app.health_tracker.get_health(app.cfg.hosts.len(), &app.book))
}

// GET /api/status (snapshot liveness)
async fn get_status(State(app): State<AppState>) -> Json<Vec<HostStatus>> {
    let rows = probe_all(&app)
        .await
        .iter()
        .map(|(h, s)| HostStatus::new(h, *s))
        .collect();
    Json(rows)
}

// GET /api/hosts (sans probe)
async fn get_hosts(State(app): State<AppState>) -> Json<Vec<HostConf>> {
    Json(app.cfg.hosts.clone())
}

// GET /api/ping/{ip}
async fn ping_one(
    State(app): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<PingReport>, StatusCode> {
    let ip: Ipv4Addr = raw.parse().map_err(|_| ServerError::InvalidIp(raw.clone()))?;
    let alive = app.probe.probe(ip).await;
    app.health_tracker.count_probes(1);
    app.book.lock().record(ip, alive, OffsetDateTime::now_utc());

    Ok(Json(PingReport {
        ip: ip.to_string(),
        alive,
        timestamp: now_rfc3339(),
    }))
}

// GET /api/pcs?carrera= (snapshot roster)
async fn get_roster(
    State(app): State<AppState>,
    Query(params): Query<RosterParams>,
) -> Json<Vec<RosterEntry>> {
    let wanted = non_empty(params.carrera);
    let probed = probe_all(&app).await;

    let sessions = match logs::read_last_lines(&app.log_file, SESSION_WINDOW).await {
        Ok(lines) => logs::latest_sessions(&lines),
        Err(e) => {
            warn!("roster without session users: {e}");
            HashMap::new()
        }
    };

    let roster = probed
        .into_iter()
        .map(|(h, s)| {
            let carrera = h.carrera.clone().unwrap_or_else(|| DEFAULT_CARRERA.to_string());
            let ip = h.ip.to_string();
            let user = s
                .alive
                .then(|| sessions.get(&ip).map(|session| session.uid.clone()))
                .flatten();
            let status = match (s.alive, &user) {
                (false, _) => MachineStatus::Offline,
                (true, Some(_)) => MachineStatus::InUse,
                (true, None) => MachineStatus::Online,
            };
            RosterEntry {
                id: h.id,
                name: h.name,
                ip,
                status,
                user,
                last_seen: s.last_seen,
                carrera: Some(carrera),
            }
        })
        .filter(|pc| wanted.is_none() || pc.carrera == wanted)
        .collect();
    Json(roster)
}

// GET /api/logs?carrera=&username=&limit=
async fn get_logs(
    State(app): State<AppState>,
    Query(params): Query<LogParams>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    let limit = LOGS_LIMIT.check(params.limit)?;
    let lines = logs::read_last_lines(&app.log_file, limit).await?;
    let carrera = non_empty(params.carrera);
    let username = non_empty(params.username);
    Ok(Json(logs::filter_entries(&lines, carrera.as_deref(), username.as_deref())))
}

// GET /api/logs/carreras?limit=
async fn get_log_carreras(
    State(app): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<String>>, StatusCode> {
    let limit = CARRERAS_LIMIT.check(params.limit)?;
    let lines = logs::read_last_lines(&app.log_file, limit).await?;
    Ok(Json(logs::distinct_carreras(&lines)))
}
