// src/server.rs
use crate::brief::{clean_for_speech, BriefGenerator, BriefOutcome};
use crate::resolver::{ResolvedTicker, Tier};
use actix_web::{web, HttpResponse, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct AppState {
    pub generator: BriefGenerator,
    pub session_id: Uuid,
    pub start_time: DateTime<Utc>,
    // one query runs to completion before the next starts
    query_lock: Mutex<()>,
}

impl AppState {
    pub fn new(generator: BriefGenerator) -> Self {
        Self {
            generator,
            session_id: Uuid::new_v4(),
            start_time: Utc::now(),
            query_lock: Mutex::new(()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct BriefResponse {
    pub request_id: Uuid,
    pub query: String,
    pub brief: String,
    /// The brief with markdown headings removed, ready for speech synthesis.
    pub speech: String,
    #[serde(flatten)]
    pub outcome: BriefOutcome,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub query: String,
    #[serde(flatten)]
    pub resolved: ResolvedTicker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<&'static str>,
}

pub async fn handle_brief(
    payload: web::Json<QueryRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let query = payload.into_inner().query;
    let request_id = Uuid::new_v4();
    info!("[{}] Brief requested: {:?}", request_id, query);

    let outcome = {
        let _guard = state.query_lock.lock().await;
        state.generator.generate(&query).await
    };

    let brief = outcome.message(state.generator.max_chars());
    let speech = clean_for_speech(&brief);

    Ok(HttpResponse::Ok().json(BriefResponse {
        request_id,
        query,
        brief,
        speech,
        outcome,
    }))
}

pub async fn handle_resolve(
    payload: web::Json<QueryRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let query = payload.into_inner().query;
    let found = state.generator.resolver().find_match(&query);

    let response = match found {
        Some(m) => ResolveResponse {
            query,
            resolved: ResolvedTicker::Ticker(m.ticker),
            matched_name: Some(m.name),
            score: Some(m.score),
            tier: Some(match m.tier {
                Tier::Primary => "primary",
                Tier::Reference => "reference",
            }),
        },
        None => ResolveResponse {
            query,
            resolved: ResolvedTicker::Unresolved,
            matched_name: None,
            score: None,
            tier: None,
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "voice-market-brief",
        "session_id": state.session_id,
        "uptime_seconds": (Utc::now() - state.start_time).num_seconds(),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

pub async fn cors_handler() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header(("Access-Control-Allow-Methods", "POST, GET, OPTIONS"))
        .insert_header(("Access-Control-Allow-Headers", "Content-Type, Authorization"))
        .finish()
}

/// Registers the API routes; shared by the binary and the tests.
/// Queries are short transcriptions; larger JSON bodies are refused up front.
pub const MAX_BODY_BYTES: usize = 4096;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES))
        .route("/brief", web::post().to(handle_brief))
        .route("/resolve", web::post().to(handle_resolve))
        .route("/health", web::get().to(health_check));
}
