/*!
Faux serveur de statut pour tests sans backend

Sert `/status` (liveness) et `/roster` sur 127.0.0.1 avec un port éphémère.
Chaque requête est comptée par chemin et la dernière query string est gardée
pour les assertions. Les réponses se changent à chaud pendant le test.
*/

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const LIVENESS_PATH: &str = "/status";
pub const ROSTER_PATH: &str = "/roster";

#[derive(Default)]
struct MockState {
    routes: HashMap<String, (u16, String)>,
    fail: Option<u16>,
    hits: HashMap<String, usize>,
    queries: HashMap<String, String>,
}

type SharedMock = Arc<Mutex<MockState>>;

/// Mock HTTP status source
pub struct MockStatusServer {
    addr: SocketAddr,
    state: SharedMock,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MockStatusServer {
    /// Démarre le serveur; les deux routes répondent `[]` tant qu'on ne les configure pas.
    pub async fn start() -> Result<Self> {
        crate::test_utils::init_logging();

        let state: SharedMock = Arc::new(Mutex::new(MockState::default()));
        {
            let mut st = state.lock();
            st.routes.insert(LIVENESS_PATH.into(), (200, "[]".into()));
            st.routes.insert(ROSTER_PATH.into(), (200, "[]".into()));
        }

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new().fallback(serve).with_state(state.clone());

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                rx.await.ok();
            });
            if let Err(e) = server.await {
                log::warn!("[MOCK] status server stopped: {e}");
            }
        });

        log::info!("[MOCK] status server listening on {addr}");
        Ok(Self {
            addr,
            state,
            shutdown: Some(tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn liveness_url(&self) -> String {
        self.url(LIVENESS_PATH)
    }

    pub fn roster_url(&self) -> String {
        self.url(ROSTER_PATH)
    }

    pub fn set_liveness(&self, body: Value) {
        self.set_raw(LIVENESS_PATH, 200, body.to_string());
    }

    pub fn set_roster(&self, body: Value) {
        self.set_raw(ROSTER_PATH, 200, body.to_string());
    }

    /// Remplace la réponse d'un chemin (statut + corps bruts) et lève un `fail_with` en cours.
    pub fn set_raw(&self, path: &str, status: u16, body: impl Into<String>) {
        let mut st = self.state.lock();
        st.fail = None;
        st.routes.insert(path.to_string(), (status, body.into()));
    }

    /// Toutes les routes répondent `status` jusqu'au prochain `set_*`.
    pub fn fail_with(&self, status: u16) {
        self.state.lock().fail = Some(status);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.lock().hits.get(path).copied().unwrap_or(0)
    }

    pub fn last_query(&self, path: &str) -> Option<String> {
        self.state.lock().queries.get(path).cloned()
    }

    /// Arrête le serveur et attend que le port soit libéré.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Some(task) = self.task.take() {
            task.await.ok();
        }
        log::info!("[MOCK] status server on {} shut down", self.addr);
    }
}

impl Drop for MockStatusServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn serve(State(state): State<SharedMock>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let (status, body) = {
        let mut st = state.lock();
        *st.hits.entry(path.clone()).or_insert(0) += 1;
        match uri.query() {
            Some(q) => {
                st.queries.insert(path.clone(), q.to_string());
            }
            None => {
                st.queries.remove(&path);
            }
        }
        match (st.fail, st.routes.get(&path)) {
            (Some(code), _) => (code, format!(r#"{{"error":"forced {code}"}}"#)),
            (None, Some((code, body))) => (*code, body.clone()),
            (None, None) => (404, r#"{"error":"not found"}"#.to_string()),
        }
    };

    log::debug!("[MOCK] {path} -> {status}");
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
