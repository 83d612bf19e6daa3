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
        employees::{EmployeeForm, EmployeeInput, EmployeeView},
        Page,
    },
    ApiResponse, ApiResult, AppState,
};

/// Build the employees Router scoped under `/api/v1/employees`.
pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/create", get(create_employee_form))
        .route(
            "/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/:id/edit", get(edit_employee_form))
}

/// Paged employee listing; `search` matches names, matriculation number and email
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(ListParams),
    responses(
        (status = 200, description = "Employees page", body = ApiResponse<Page<EmployeeView>>),
        (status = 400, description = "Invalid sort or paging", body = crate::errors::ErrorResponse)
    ),
    tag = "Employees"
)]
pub async fn list_employees(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<EmployeeView>> {
    let query = params.to_query(&state.config)?;
    let page = state.services.employees.list(&query).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/create",
    responses((status = 200, description = "Form options for a new employee", body = ApiResponse<EmployeeForm>)),
    tag = "Employees"
)]
pub async fn create_employee_form(State(state): State<AppState>) -> ApiResult<EmployeeForm> {
    let form = state.services.employees.form(None).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = EmployeeInput,
    responses(
        (status = 201, description = "Employee created", body = ApiResponse<EmployeeView>),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Employees"
)]
pub async fn create_employee(
    State(state): State<AppState>,
    Json(input): Json<EmployeeInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state.services.employees.create(input).await?;
    Ok(created(record))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}/edit",
    params(("id" = Uuid, Path, description = "Employee uuid")),
    responses(
        (status = 200, description = "Employee with form options", body = ApiResponse<EmployeeForm>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Employees"
)]
pub async fn edit_employee_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<EmployeeForm> {
    let form = state.services.employees.form(Some(id)).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    put,
    path = "/api/v1/employees/{id}",
    params(("id" = Uuid, Path, description = "Employee uuid")),
    request_body = EmployeeInput,
    responses(
        (status = 200, description = "Employee updated", body = ApiResponse<EmployeeView>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Employees"
)]
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<EmployeeInput>,
) -> ApiResult<EmployeeView> {
    let record = state.services.employees.update(id, input).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}",
    params(("id" = Uuid, Path, description = "Employee uuid")),
    responses(
        (status = 200, description = "Employee details", body = ApiResponse<EmployeeView>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Employees"
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<EmployeeView> {
    let record = state.services.employees.get(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/employees/{id}",
    params(("id" = Uuid, Path, description = "Employee uuid")),
    responses(
        (status = 204, description = "Employee deleted"),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Employee has recorded processings", body = crate::errors::ErrorResponse)
    ),
    tag = "Employees"
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.employees.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
