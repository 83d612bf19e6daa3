use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created, ListParams};
use crate::{
    errors::ServiceError,
    services::{
        processings::{ProcessingForm, ProcessingInput, ProcessingView},
        Page,
    },
    ApiResponse, ApiResult, AppState,
};

/// Build the production order processings Router scoped under `/api/v1/production-order-processings`.
pub fn processing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_processings).post(create_processing))
        .route("/create", get(create_processing_form))
        .route(
            "/:id",
            get(get_processing).put(update_processing).delete(delete_processing),
        )
        .route("/:id/edit", get(edit_processing_form))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-order-processings",
    params(ListParams),
    responses(
        (status = 200, description = "Processings page", body = ApiResponse<Page<ProcessingView>>),
        (status = 400, description = "Invalid sort or paging", body = crate::errors::ErrorResponse)
    ),
    tag = "Production order processings"
)]
pub async fn list_processings(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<ProcessingView>> {
    let query = params.to_query(&state.config)?;
    let page = state.services.processings.list(&query).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-order-processings/create",
    responses((status = 200, description = "Form options for a new processing", body = ApiResponse<ProcessingForm>)),
    tag = "Production order processings"
)]
pub async fn create_processing_form(State(state): State<AppState>) -> ApiResult<ProcessingForm> {
    let form = state.services.processings.form(None).await?;
    Ok(Json(ApiResponse::success(form)))
}

/// Records work on an order. The order's worked quantity grows by the recorded quantity.
#[utoipa::path(
    post,
    path = "/api/v1/production-order-processings",
    request_body = ProcessingInput,
    responses(
        (status = 201, description = "Processing created", body = ApiResponse<ProcessingView>),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Production order processings"
)]
pub async fn create_processing(
    State(state): State<AppState>,
    Json(input): Json<ProcessingInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state.services.processings.create(input).await?;
    Ok(created(record))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-order-processings/{id}/edit",
    params(("id" = Uuid, Path, description = "Processing uuid")),
    responses(
        (status = 200, description = "Processing with form options", body = ApiResponse<ProcessingForm>),
        (status = 404, description = "Processing not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Production order processings"
)]
pub async fn edit_processing_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProcessingForm> {
    let form = state.services.processings.form(Some(id)).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    put,
    path = "/api/v1/production-order-processings/{id}",
    params(("id" = Uuid, Path, description = "Processing uuid")),
    request_body = ProcessingInput,
    responses(
        (status = 200, description = "Processing updated", body = ApiResponse<ProcessingView>),
        (status = 404, description = "Processing not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Production order processings"
)]
pub async fn update_processing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProcessingInput>,
) -> ApiResult<ProcessingView> {
    let record = state.services.processings.update(id, input).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-order-processings/{id}",
    params(("id" = Uuid, Path, description = "Processing uuid")),
    responses(
        (status = 200, description = "Processing details", body = ApiResponse<ProcessingView>),
        (status = 404, description = "Processing not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Production order processings"
)]
pub async fn get_processing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProcessingView> {
    let record = state.services.processings.get(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// Removes the record and takes its quantity back off the order.
#[utoipa::path(
    delete,
    path = "/api/v1/production-order-processings/{id}",
    params(("id" = Uuid, Path, description = "Processing uuid")),
    responses(
        (status = 204, description = "Processing deleted"),
        (status = 404, description = "Processing not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Production order processings"
)]
pub async fn delete_processing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.processings.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
