//! PackOps API Library
//!
//! Back office for a packaging producer: the production dashboard (server
//! snapshot endpoint plus the client-side session that polls it) and the
//! master-data CRUD behind it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod client;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, http::HeaderValue, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer};
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_carries_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("dash-1"), async {
                ApiResponse::success(3_u32)
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("dash-1"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn meta_is_optional_when_decoding() {
        let decoded: ApiResponse<u32> =
            serde_json::from_str(r#"{"success":true,"data":7,"message":null,"errors":null}"#)
                .unwrap();
        assert_eq!(decoded.data, Some(7));
        assert!(decoded.meta.is_none());
    }

    #[test]
    fn outside_a_request_scope_there_is_no_request_id() {
        let response = ApiResponse::success("ok");
        let meta = response.meta.expect("metadata expected");
        assert!(meta.request_id.is_none());
        assert!(response.message.is_none());
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api/v1` resource.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/dashboard", handlers::dashboard::dashboard_routes())
        .nest("/customers", handlers::customers::customer_routes())
        .nest("/employees", handlers::employees::employee_routes())
        .nest("/contracts", handlers::contracts::contract_routes())
        .nest(
            "/shipping-addresses",
            handlers::shipping_addresses::shipping_address_routes(),
        )
        .nest(
            "/production-order-processings",
            handlers::processings::processing_routes(),
        )
}

/// Full application router with middleware, ready to serve.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let timeout = state.config.request_timeout();

    Router::new()
        .route("/", get(|| async { "packops-api up" }))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    // `config::load_config` requires origins outside development.
    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}

async fn api_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "packops-api",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<AppState>) -> (axum::http::StatusCode, Json<Value>) {
    let database = db::check_connection(&state.db).await;
    let status = if database.is_ok() {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "service": "packops-api",
            "status": if database.is_ok() { "healthy" } else { "unhealthy" },
            "database": match database {
                Ok(()) => "up".to_string(),
                Err(e) => format!("down: {}", e),
            },
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}
