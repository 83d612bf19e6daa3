use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created, ListParams};
use crate::{
    errors::ServiceError,
    services::{
        customers::DivisionView,
        shipping_addresses::{ShippingAddressForm, ShippingAddressInput, ShippingAddressView},
        Page,
    },
    ApiResponse, ApiResult, AppState,
};

/// Build the shipping addresses Router scoped under `/api/v1/shipping-addresses`.
pub fn shipping_address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shipping_addresses).post(create_shipping_address))
        .route("/create", get(create_shipping_address_form))
        .route(
            "/:id",
            get(get_shipping_address)
                .put(update_shipping_address)
                .delete(delete_shipping_address),
        )
        .route("/:id/edit", get(edit_shipping_address_form))
        .route("/load-divisions", get(load_divisions))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipping-addresses",
    params(ListParams),
    responses(
        (status = 200, description = "Shipping addresses page", body = ApiResponse<Page<ShippingAddressView>>),
        (status = 400, description = "Invalid sort or paging", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping addresses"
)]
pub async fn list_shipping_addresses(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<ShippingAddressView>> {
    let query = params.to_query(&state.config)?;
    let page = state.services.shipping_addresses.list(&query).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipping-addresses/create",
    responses((status = 200, description = "Form options for a new shipping address", body = ApiResponse<ShippingAddressForm>)),
    tag = "Shipping addresses"
)]
pub async fn create_shipping_address_form(State(state): State<AppState>) -> ApiResult<ShippingAddressForm> {
    let form = state.services.shipping_addresses.form(None).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipping-addresses",
    request_body = ShippingAddressInput,
    responses(
        (status = 201, description = "Shipping address created", body = ApiResponse<ShippingAddressView>),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping addresses"
)]
pub async fn create_shipping_address(
    State(state): State<AppState>,
    Json(input): Json<ShippingAddressInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state.services.shipping_addresses.create(input).await?;
    Ok(created(record))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipping-addresses/{id}/edit",
    params(("id" = Uuid, Path, description = "Shipping address uuid")),
    responses(
        (status = 200, description = "Shipping address with form options", body = ApiResponse<ShippingAddressForm>),
        (status = 404, description = "Shipping address not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping addresses"
)]
pub async fn edit_shipping_address_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShippingAddressForm> {
    let form = state.services.shipping_addresses.form(Some(id)).await?;
    Ok(Json(ApiResponse::success(form)))
}

#[utoipa::path(
    put,
    path = "/api/v1/shipping-addresses/{id}",
    params(("id" = Uuid, Path, description = "Shipping address uuid")),
    request_body = ShippingAddressInput,
    responses(
        (status = 200, description = "Shipping address updated", body = ApiResponse<ShippingAddressView>),
        (status = 404, description = "Shipping address not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Field errors", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping addresses"
)]
pub async fn update_shipping_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ShippingAddressInput>,
) -> ApiResult<ShippingAddressView> {
    let record = state.services.shipping_addresses.update(id, input).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipping-addresses/{id}",
    params(("id" = Uuid, Path, description = "Shipping address uuid")),
    responses(
        (status = 200, description = "Shipping address details", body = ApiResponse<ShippingAddressView>),
        (status = 404, description = "Shipping address not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping addresses"
)]
pub async fn get_shipping_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShippingAddressView> {
    let record = state.services.shipping_addresses.get(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shipping-addresses/{id}",
    params(("id" = Uuid, Path, description = "Shipping address uuid")),
    responses(
        (status = 204, description = "Shipping address deleted"),
        (status = 404, description = "Shipping address not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping addresses"
)]
pub async fn delete_shipping_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.shipping_addresses.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DivisionsQuery {
    pub customer_uuid: Uuid,
}

/// Divisions of a customer, for the division select of the address form.
/// Unknown customers yield an empty list.
#[utoipa::path(
    get,
    path = "/api/v1/shipping-addresses/load-divisions",
    params(DivisionsQuery),
    responses((status = 200, description = "Divisions of the customer", body = ApiResponse<Vec<DivisionView>>)),
    tag = "Shipping addresses"
)]
pub async fn load_divisions(
    State(state): State<AppState>,
    Query(query): Query<DivisionsQuery>,
) -> ApiResult<Vec<DivisionView>> {
    let divisions = state
        .services
        .customers
        .load_divisions(query.customer_uuid)
        .await?;
    Ok(Json(ApiResponse::success(divisions)))
}
