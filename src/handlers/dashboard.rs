use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;

use crate::{
    dashboard::{DashboardQuery, DashboardSnapshot},
    errors::ServiceError,
    models::AcknowledgeAlertRequest,
    services::alerts::AcknowledgementView,
    ApiResponse, AppState,
};

/// Build the dashboard Router scoped under `/api/v1/dashboard`.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_dashboard))
        .route("/alerts/acknowledge", post(acknowledge_alert))
}

/// Statistics, metrics, trends and alerts for the selected filters
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard snapshot", body = ApiResponse<DashboardSnapshot>),
        (status = 400, description = "Invalid filter parameters", body = crate::errors::ErrorResponse)
    ),
    tag = "Dashboard"
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<DashboardSnapshot>>, ServiceError> {
    let parsed = query.parse_within(state.config.dashboard.max_range_days)?;
    let today = Utc::now().date_naive();
    let snapshot = state.services.dashboard.snapshot(&parsed, today).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// Persist an alert dismissal so it is not shown again for the same situation
#[utoipa::path(
    post,
    path = "/api/v1/dashboard/alerts/acknowledge",
    request_body = AcknowledgeAlertRequest,
    responses(
        (status = 200, description = "Alert acknowledged (idempotent)", body = ApiResponse<AcknowledgementView>),
        (status = 422, description = "Invalid acknowledgement", body = crate::errors::ErrorResponse)
    ),
    tag = "Dashboard"
)]
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Json(request): Json<AcknowledgeAlertRequest>,
) -> Result<Json<ApiResponse<AcknowledgementView>>, ServiceError> {
    let acknowledgement = state.services.alerts.acknowledge(request).await?;
    Ok(Json(ApiResponse::success(acknowledgement)))
}
