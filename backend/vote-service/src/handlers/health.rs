use crate::db::VoteStore;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub struct HealthState {
    store: Arc<dyn VoteStore>,
    backend: &'static str,
}

impl HealthState {
    pub fn new(store: Arc<dyn VoteStore>, backend: &'static str) -> Self {
        Self { store, backend }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    store: &'static str,
    message: String,
    latency_ms: u64,
    timestamp: String,
}

pub async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.store.ping().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "vote-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("{} store unavailable: {}", state.backend, e),
            "service": "vote-service"
        })),
    }
}

pub async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let start = Instant::now();
    let result = state.store.ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (ready, status, message) = match result {
        Ok(_) => (
            true,
            ComponentStatus::Healthy,
            format!("{} store reachable", state.backend),
        ),
        Err(e) => (
            false,
            ComponentStatus::Unhealthy,
            format!("{} store check failed: {}", state.backend, e),
        ),
    };

    let response = ReadinessResponse {
        ready,
        status,
        store: state.backend,
        message,
        latency_ms,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "alive" }))
}
