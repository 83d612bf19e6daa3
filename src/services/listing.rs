use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

pub const DEFAULT_PER_PAGE: u64 = 20;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Normalized list request: page is 1-based, `per_page` already capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub per_page: u64,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            search: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
        }
    }
}

impl ListQuery {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.per_page
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    fn sort_key(&self) -> Option<&str> {
        self.sort_by
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if total == 0 || per_page == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Applies search, whitelisted sorting and pagination to a select.
pub struct Listing<E: EntityTrait> {
    query: Select<E>,
}

impl<E: EntityTrait> Listing<E> {
    pub fn new(query: Select<E>) -> Self {
        Self { query }
    }

    /// Case-sensitive substring match on any of `columns`. A blank term adds nothing.
    pub fn search<C: ColumnTrait>(mut self, term: Option<&str>, columns: &[C]) -> Self {
        if let Some(term) = term {
            if !columns.is_empty() {
                let condition = columns
                    .iter()
                    .fold(Condition::any(), |acc, column| acc.add(column.contains(term)));
                self.query = self.query.filter(condition);
            }
        }
        self
    }

    /// Orders by the column registered under `sort_by`, or `default` when none was asked for.
    pub fn sort<C: ColumnTrait>(
        mut self,
        params: &ListQuery,
        allowed: &[(&str, C)],
        default: C,
    ) -> Result<Self, ServiceError> {
        let column = match params.sort_key() {
            None => default,
            Some(key) => allowed
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, column)| *column)
                .ok_or_else(|| {
                    let names: Vec<&str> = allowed.iter().map(|(name, _)| *name).collect();
                    ServiceError::BadRequest(format!(
                        "cannot sort by '{}', expected one of: {}",
                        key,
                        names.join(", ")
                    ))
                })?,
        };

        self.query = match params.sort_order {
            SortOrder::Asc => self.query.order_by_asc(column),
            SortOrder::Desc => self.query.order_by_desc(column),
        };
        Ok(self)
    }

    pub async fn fetch<'db>(
        self,
        db: &'db DatabaseConnection,
        params: &ListQuery,
    ) -> Result<Page<E::Model>, DbErr>
    where
        E::Model: Sync + 'db,
    {
        let paginator = self.query.paginate(db, params.per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(params.page.saturating_sub(1)).await?;
        Ok(Page::new(items, total, params.page, params.per_page))
    }
}
