use std::str::FromStr;

use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::{ListQuery, SortOrder};
use crate::ApiResponse;

/// Query parameters shared by every resource listing.
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped by configuration
    pub per_page: Option<u64>,
    /// Substring matched against the resource's text columns
    pub search: Option<String>,
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
}

impl ListParams {
    pub fn to_query(&self, config: &AppConfig) -> Result<ListQuery, ServiceError> {
        let sort_order = match self.sort_order.as_deref().map(str::trim) {
            None | Some("") => SortOrder::Asc,
            Some(raw) => SortOrder::from_str(raw).map_err(|_| {
                ServiceError::BadRequest(format!("sort_order must be asc or desc, got '{}'", raw))
            })?,
        };

        Ok(ListQuery {
            page: self.page.unwrap_or(1).max(1),
            per_page: self
                .per_page
                .unwrap_or(config.api_default_page_size)
                .clamp(1, config.api_max_page_size),
            search: self.search.clone(),
            sort_by: self.sort_by.clone(),
            sort_order,
        })
    }
}

/// 201 with the standard envelope.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}
