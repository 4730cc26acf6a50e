/*!
Mock Data Hub HTTP pour développement sans service d'ingestion

Démarre un serveur axum local sur un port éphémère qui imite le data hub:
- `POST /api/v1/telemetry` répond avec un statut configurable (201 par défaut)
- `GET /health` répond `{"status": "..."}`
- Toutes les requêtes sont enregistrées pour les assertions de tests
- Latence artificielle configurable pour simuler un hub qui ne répond pas
*/

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Chemin d'ingestion servi par le mock
pub const TELEMETRY_PATH: &str = "/api/v1/telemetry";
/// Chemin du health check
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl RecordedRequest {
    /// Parse le body en JSON
    pub fn json<T>(&self) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        serde_json::from_slice(&self.body).context("request body is not valid JSON")
    }
}

#[derive(Debug)]
struct Behaviour {
    status: u16,
    delay: Duration,
    health_status: String,
}

#[derive(Clone)]
struct HubState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    behaviour: Arc<Mutex<Behaviour>>,
}

/// Mock du data hub, arrêté automatiquement au drop
pub struct MockDataHub {
    addr: SocketAddr,
    state: HubState,
    server: JoinHandle<()>,
}

impl MockDataHub {
    /// Démarre le mock sur 127.0.0.1 (port choisi par l'OS)
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind mock data hub")?;
        let addr = listener.local_addr()?;

        let state = HubState {
            requests: Arc::new(Mutex::new(Vec::new())),
            behaviour: Arc::new(Mutex::new(Behaviour {
                status: 201,
                delay: Duration::ZERO,
                health_status: "ok".to_string(),
            })),
        };

        let app = Router::new().fallback(handle).with_state(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!("[MOCK] data hub server stopped: {}", e);
            }
        });

        tracing::info!("🛰️ [MOCK] data hub listening on http://{}", addr);
        Ok(Self { addr, state, server })
    }

    /// URL de base à donner au publisher
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Statut renvoyé par l'endpoint télémétrie
    pub fn set_status(&self, status: u16) {
        self.state.behaviour.lock().status = status;
    }

    /// Latence appliquée avant chaque réponse
    pub fn set_delay(&self, delay: Duration) {
        self.state.behaviour.lock().delay = delay;
    }

    /// Valeur du champ `status` renvoyé par /health
    pub fn set_health_status(&self, status: &str) {
        self.state.behaviour.lock().health_status = status.to_string();
    }

    /// Toutes les requêtes reçues (pour assertions de tests)
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().len()
    }

    /// Requêtes reçues sur un chemin donné
    pub fn find_requests_by_path(&self, path: &str) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|req| req.path == path)
            .cloned()
            .collect()
    }

    /// Parse le dernier body reçu sur un chemin en JSON
    pub fn get_last_json<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        match self.find_requests_by_path(path).last() {
            Some(req) => Ok(Some(req.json()?)),
            None => Ok(None),
        }
    }

    /// Reset les requêtes enregistrées
    pub fn clear(&self) {
        self.state.requests.lock().clear();
    }
}

impl Drop for MockDataHub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(hub): State<HubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::debug!("📨 [MOCK] {} {} ({} bytes)", method.as_str(), path, body.len());
    hub.requests.lock().push(RecordedRequest {
        method: method.as_str().to_string(),
        path: path.clone(),
        content_type,
        body: body.to_vec(),
        received_at: Utc::now(),
    });

    let (status, delay, health_status) = {
        let b = hub.behaviour.lock();
        (b.status, b.delay, b.health_status.clone())
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    if method == Method::GET && path == HEALTH_PATH {
        return Json(serde_json::json!({ "status": health_status })).into_response();
    }

    if method != Method::POST || path != TELEMETRY_PATH {
        return StatusCode::NOT_FOUND.into_response();
    }

    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = if code.is_success() {
        serde_json::json!({ "status": "created" })
    } else {
        serde_json::json!({ "detail": format!("mock failure {}", status) })
    };
    (code, Json(body)).into_response()
}

/// Helper pour créer des payloads conformes au contrat télémétrie v1
pub struct TelemetryPayloadBuilder;

impl TelemetryPayloadBuilder {
    /// Body attendu pour `POST /api/v1/telemetry`
    pub fn telemetry_v1(
        device_id: &str,
        metric: &str,
        value: f64,
        unit: &str,
        recorded_at: Option<DateTime<Utc>>,
    ) -> Value {
        let mut payload = serde_json::json!({
            "device_id": device_id,
            "metric": metric,
            "value": value,
            "unit": unit,
        });
        if let Some(at) = recorded_at {
            payload["recorded_at"] = Value::String(at.to_rfc3339());
        }
        payload
    }
}
