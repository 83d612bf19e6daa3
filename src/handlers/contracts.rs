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
        contracts::{ContractForm, ContractInput, ContractView},
        Page,
    },
    ApiResponse, ApiResult, AppState,
};

/// Build the contracts Router scoped under `/api/v1/contracts`.
pub fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts).post(create_contract))
        .route("/create", get(create_contract_form))
        .route(
            "/:id",
            get(get_contract).put(update_contract).delete(delete_contract),
        )
        .route("/:id/edit", get(edit_contract_form))
}

#[utoipa::path(
    get,
    path = "/api/v1/contracts",
    params(ListParams),
    responses(
        (status = 200, description = "Contracts page", body = ApiResponse<Page<ContractView>>),
        (status = 400, description = "Invalid sort or paging", body = crate::errors::ErrorResponse)
    ),
    tag = "Contracts"
)]
pub async fn list_contracts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<ContractView>> {
    let query = params.to_query(&state.config)?;
    let page = state.services.contracts.list(&query).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/contracts/create",
    responses((status = 200, description = "Form options for a new contract", body = ApiResponse<ContractForm>)),
    tag = "Contracts"
)]
pub async fn create_contract_form(State(state): State<AppState>) -> ApiResult<ContractForm> {
    let form = state.services.contracts.form(None).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    post,
    path = "/api/v1/contracts",
    request_body = ContractInput,
    responses(
        (status = 201, description = "Contract created", body = ApiResponse<ContractView>),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Contracts"
)]
pub async fn create_contract(
    State(state): State<AppState>,
    Json(input): Json<ContractInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state.services.contracts.create(input).await?;
    Ok(created(record))
}

#[utoipa::path(
    get,
    path = "/api/v1/contracts/{id}/edit",
    params(("id" = Uuid, Path, description = "Contract uuid")),
    responses(
        (status = 200, description = "Contract with form options", body = ApiResponse<ContractForm>),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Contracts"
)]
pub async fn edit_contract_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ContractForm> {
    let form = state.services.contracts.form(Some(id)).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    put,
    path = "/api/v1/contracts/{id}",
    params(("id" = Uuid, Path, description = "Contract uuid")),
    request_body = ContractInput,
    responses(
        (status = 200, description = "Contract updated", body = ApiResponse<ContractView>),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Contracts"
)]
pub async fn update_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ContractInput>,
) -> ApiResult<ContractView> {
    let record = state.services.contracts.update(id, input).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    get,
    path = "/api/v1/contracts/{id}",
    params(("id" = Uuid, Path, description = "Contract uuid")),
    responses(
        (status = 200, description = "Contract details", body = ApiResponse<ContractView>),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Contracts"
)]
pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ContractView> {
    let record = state.services.contracts.get(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/contracts/{id}",
    params(("id" = Uuid, Path, description = "Contract uuid")),
    responses(
        (status = 204, description = "Contract deleted"),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Contracts"
)]
pub async fn delete_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.contracts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
