use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::listing::{ListQuery, Listing, Page};
use super::normalize_optional;
use crate::entities::{customer, customer_division, customer_shipping_address, production_order};
use crate::errors::{FieldErrors, ServiceError};

static VAT_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(IT)?\d{11}$").unwrap());

const SORTABLE: [(&str, customer::Column); 4] = [
    ("code", customer::Column::Code),
    ("company_name", customer::Column::CompanyName),
    ("created_at", customer::Column::CreatedAt),
    ("updated_at", customer::Column::UpdatedAt),
];

fn validate_vat_number(value: &str) -> Result<(), ValidationError> {
    if VAT_NUMBER_RE.is_match(value.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("vat_number");
        err.message = Some("VAT number must be 11 digits, optionally prefixed by IT".into());
        Err(err)
    }
}

/// Body of customer create and update requests.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 32, message = "Code is required (max 32 characters)"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Company name is required"))]
    pub company_name: String,
    #[validate(custom = "validate_vat_number")]
    pub vat_number: Option<String>,
    #[validate(email(message = "Email address is not valid"))]
    pub email: Option<String>,
    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,
    /// Division names. On update, names not yet present are added.
    #[serde(default)]
    pub divisions: Vec<String>,
}

impl CustomerInput {
    fn normalized(self) -> Self {
        Self {
            code: self.code.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
            vat_number: normalize_optional(self.vat_number).map(|vat| vat.to_uppercase()),
            email: normalize_optional(self.email),
            phone: normalize_optional(self.phone),
            divisions: self
                .divisions
                .into_iter()
                .map(|name| name.trim().to_string())
                .collect(),
        }
    }

    fn check(&self) -> Result<(), ServiceError> {
        let mut fields = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => FieldErrors::from(&errors),
        };
        if self.divisions.iter().any(|name| name.is_empty() || name.len() > 100) {
            fields.insert("divisions", "Division names must be 1 to 100 characters");
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::InvalidFields(fields))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DivisionView {
    pub uuid: Uuid,
    pub name: String,
}

impl From<customer_division::Model> for DivisionView {
    fn from(model: customer_division::Model) -> Self {
        Self {
            uuid: model.uuid,
            name: model.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CustomerView {
    pub uuid: Uuid,
    pub code: String,
    pub company_name: String,
    pub vat_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub divisions: Vec<DivisionView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CustomerView {
    fn new(model: customer::Model, divisions: Vec<DivisionView>) -> Self {
        Self {
            uuid: model.uuid,
            code: model.code,
            company_name: model.company_name,
            vat_number: model.vat_number,
            email: model.email,
            phone: model.phone,
            divisions,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Payload of the customer create and edit forms.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerForm {
    pub customer: Option<CustomerView>,
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<CustomerView>, ServiceError> {
        let page = Listing::new(customer::Entity::find())
            .search(
                query.search_term(),
                &[
                    customer::Column::Code,
                    customer::Column::CompanyName,
                    customer::Column::VatNumber,
                    customer::Column::Email,
                ],
            )
            .sort(query, &SORTABLE, customer::Column::CompanyName)?
            .fetch(&*self.db, query)
            .await?;

        let ids: Vec<Uuid> = page.items.iter().map(|c| c.uuid).collect();
        let mut divisions = self.divisions_by_customer(&ids).await?;
        Ok(page.map(|model| {
            let own = divisions.remove(&model.uuid).unwrap_or_default();
            CustomerView::new(model, own)
        }))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<CustomerView, ServiceError> {
        let model = self.find(id).await?;
        let divisions = self.load_divisions(id).await?;
        Ok(CustomerView::new(model, divisions))
    }

    pub async fn form(&self, id: Option<Uuid>) -> Result<CustomerForm, ServiceError> {
        let customer = match id {
            Some(id) => Some(self.get(id).await?),
            None => None,
        };
        Ok(CustomerForm { customer })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CustomerInput) -> Result<CustomerView, ServiceError> {
        let input = input.normalized();
        input.check()?;
        self.ensure_code_available(&input.code, None).await?;

        let txn = self.db.begin().await?;
        let customer_uuid = Uuid::new_v4();
        customer::ActiveModel {
            uuid: Set(customer_uuid),
            code: Set(input.code),
            company_name: Set(input.company_name),
            vat_number: Set(input.vat_number),
            email: Set(input.email),
            phone: Set(input.phone),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut names = input.divisions;
        names.sort();
        names.dedup();
        for name in names {
            insert_division(&txn, customer_uuid, name).await?;
        }
        txn.commit().await?;

        info!(customer_id = %customer_uuid, "customer created");
        self.get(customer_uuid).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: CustomerInput) -> Result<CustomerView, ServiceError> {
        let existing = self.find(id).await?;
        let input = input.normalized();
        input.check()?;
        self.ensure_code_available(&input.code, Some(id)).await?;

        let txn = self.db.begin().await?;
        let mut active: customer::ActiveModel = existing.into();
        active.code = Set(input.code);
        active.company_name = Set(input.company_name);
        active.vat_number = Set(input.vat_number);
        active.email = Set(input.email);
        active.phone = Set(input.phone);
        active.update(&txn).await?;

        let current: Vec<String> = customer_division::Entity::find()
            .filter(customer_division::Column::CustomerUuid.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|division| division.name)
            .collect();
        let mut added: Vec<String> = input
            .divisions
            .into_iter()
            .filter(|name| !current.contains(name))
            .collect();
        added.sort();
        added.dedup();
        for name in added {
            insert_division(&txn, id, name).await?;
        }
        txn.commit().await?;

        info!(customer_id = %id, "customer updated");
        self.get(id).await
    }

    /// Removes the customer with its divisions and addresses. Customers with orders are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find(id).await?;

        let orders = production_order::Entity::find()
            .filter(production_order::Column::CustomerUuid.eq(id))
            .count(&*self.db)
            .await?;
        if orders > 0 {
            return Err(ServiceError::Conflict(format!(
                "customer {} has {} production orders",
                existing.code, orders
            )));
        }

        let txn = self.db.begin().await?;
        let division_ids: Vec<Uuid> = customer_division::Entity::find()
            .filter(customer_division::Column::CustomerUuid.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|division| division.uuid)
            .collect();
        if !division_ids.is_empty() {
            customer_shipping_address::Entity::delete_many()
                .filter(customer_shipping_address::Column::CustomerDivisionUuid.is_in(division_ids))
                .exec(&txn)
                .await?;
        }
        customer_division::Entity::delete_many()
            .filter(customer_division::Column::CustomerUuid.eq(id))
            .exec(&txn)
            .await?;
        customer::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    /// Divisions of a customer by name. Unknown customers have none.
    #[instrument(skip(self))]
    pub async fn load_divisions(&self, customer_uuid: Uuid) -> Result<Vec<DivisionView>, ServiceError> {
        let divisions = customer_division::Entity::find()
            .filter(customer_division::Column::CustomerUuid.eq(customer_uuid))
            .order_by_asc(customer_division::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(divisions.into_iter().map(DivisionView::from).collect())
    }

    async fn find(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer", id))
    }

    async fn ensure_code_available(&self, code: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = customer::Entity::find().filter(customer::Column::Code.eq(code));
        if let Some(id) = except {
            query = query.filter(customer::Column::Uuid.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::field("code", "Code is already in use"));
        }
        Ok(())
    }

    async fn divisions_by_customer(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<DivisionView>>, ServiceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let divisions = customer_division::Entity::find()
            .filter(customer_division::Column::CustomerUuid.is_in(ids.to_vec()))
            .order_by_asc(customer_division::Column::Name)
            .all(&*self.db)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<DivisionView>> = HashMap::new();
        for division in divisions {
            grouped
                .entry(division.customer_uuid)
                .or_default()
                .push(DivisionView::from(division));
        }
        Ok(grouped)
    }
}

async fn insert_division<C: sea_orm::ConnectionTrait>(
    db: &C,
    customer_uuid: Uuid,
    name: String,
) -> Result<(), ServiceError> {
    customer_division::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        customer_uuid: Set(customer_uuid),
        name: Set(name),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;
    Ok(())
}
