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
        customers::{CustomerForm, CustomerInput, CustomerView},
        Page,
    },
    ApiResponse, ApiResult, AppState,
};

/// Build the customers Router scoped under `/api/v1/customers`.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/create", get(create_customer_form))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/:id/edit", get(edit_customer_form))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(ListParams),
    responses(
        (status = 200, description = "Customers page", body = ApiResponse<Page<CustomerView>>),
        (status = 400, description = "Invalid sort or paging", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<CustomerView>> {
    let query = params.to_query(&state.config)?;
    let page = state.services.customers.list(&query).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/create",
    responses((status = 200, description = "Empty customer form", body = ApiResponse<CustomerForm>)),
    tag = "Customers"
)]
pub async fn create_customer_form(State(state): State<AppState>) -> ApiResult<CustomerForm> {
    let form = state.services.customers.form(None).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CustomerInput,
    responses(
        (status = 201, description = "Customer created", body = ApiResponse<CustomerView>),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.create(input).await?;
    Ok(created(customer))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}/edit",
    params(("id" = Uuid, Path, description = "Customer uuid")),
    responses(
        (status = 200, description = "Customer form", body = ApiResponse<CustomerForm>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn edit_customer_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CustomerForm> {
    let form = state.services.customers.form(Some(id)).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer uuid")),
    request_body = CustomerInput,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<CustomerView>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<CustomerView> {
    let customer = state.services.customers.update(id, input).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer uuid")),
    responses(
        (status = 200, description = "Customer with divisions", body = ApiResponse<CustomerView>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CustomerView> {
    let customer = state.services.customers.get(id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer uuid")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Customer still has production orders", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.customers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
