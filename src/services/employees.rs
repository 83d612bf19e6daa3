use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::listing::{ListQuery, Listing, Page};
use super::normalize_optional;
use crate::entities::{employee, employee_contract, production_order_processing};
use crate::errors::{FieldErrors, ServiceError};

static FISCAL_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{6}\d{2}[A-Z]\d{2}[A-Z]\d{3}[A-Z]$").unwrap());

const SORTABLE: [(&str, employee::Column); 5] = [
    ("last_name", employee::Column::LastName),
    ("first_name", employee::Column::FirstName),
    ("matriculation_number", employee::Column::MatriculationNumber),
    ("created_at", employee::Column::CreatedAt),
    ("updated_at", employee::Column::UpdatedAt),
];

fn validate_fiscal_code(value: &str) -> Result<(), ValidationError> {
    if FISCAL_CODE_RE.is_match(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("fiscal_code");
        err.message = Some("Fiscal code must be 16 characters (e.g. RSSMRA80A01H501U)".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct EmployeeInput {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(custom = "validate_fiscal_code")]
    pub fiscal_code: Option<String>,
    #[validate(length(min = 1, max = 32, message = "Matriculation number is required"))]
    pub matriculation_number: String,
    #[validate(email(message = "Email address is not valid"))]
    pub email: Option<String>,
    #[serde(default)]
    pub portal_access: bool,
}

impl EmployeeInput {
    fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            fiscal_code: normalize_optional(self.fiscal_code).map(|code| code.to_uppercase()),
            matriculation_number: self.matriculation_number.trim().to_string(),
            email: normalize_optional(self.email).map(|email| email.to_lowercase()),
            portal_access: self.portal_access,
        }
    }

    fn check(&self) -> Result<(), ServiceError> {
        let mut fields = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => FieldErrors::from(&errors),
        };
        if self.portal_access && self.email.is_none() {
            fields.insert("email", "Email is required for portal access");
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::InvalidFields(fields))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeView {
    pub uuid: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub fiscal_code: Option<String>,
    pub matriculation_number: String,
    pub email: Option<String>,
    pub portal_access: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<employee::Model> for EmployeeView {
    fn from(model: employee::Model) -> Self {
        Self {
            full_name: model.full_name(),
            uuid: model.uuid,
            first_name: model.first_name,
            last_name: model.last_name,
            fiscal_code: model.fiscal_code,
            matriculation_number: model.matriculation_number,
            email: model.email,
            portal_access: model.portal_access,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeeForm {
    pub employee: Option<EmployeeView>,
}

#[derive(Clone)]
pub struct EmployeeService {
    db: Arc<DatabaseConnection>,
}

impl EmployeeService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<EmployeeView>, ServiceError> {
        let page = Listing::new(employee::Entity::find())
            .search(
                query.search_term(),
                &[
                    employee::Column::FirstName,
                    employee::Column::LastName,
                    employee::Column::MatriculationNumber,
                    employee::Column::Email,
                ],
            )
            .sort(query, &SORTABLE, employee::Column::LastName)?
            .fetch(&*self.db, query)
            .await?;
        Ok(page.map(EmployeeView::from))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<EmployeeView, ServiceError> {
        self.find(id).await.map(EmployeeView::from)
    }

    pub async fn form(&self, id: Option<Uuid>) -> Result<EmployeeForm, ServiceError> {
        let employee = match id {
            Some(id) => Some(self.get(id).await?),
            None => None,
        };
        Ok(EmployeeForm { employee })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: EmployeeInput) -> Result<EmployeeView, ServiceError> {
        let input = input.normalized();
        input.check()?;
        self.ensure_matriculation_available(&input.matriculation_number, None)
            .await?;

        let model = employee::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            fiscal_code: Set(input.fiscal_code),
            matriculation_number: Set(input.matriculation_number),
            email: Set(input.email),
            portal_access: Set(input.portal_access),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(employee_id = %model.uuid, "employee created");
        Ok(EmployeeView::from(model))
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: EmployeeInput) -> Result<EmployeeView, ServiceError> {
        let existing = self.find(id).await?;
        let input = input.normalized();
        input.check()?;
        self.ensure_matriculation_available(&input.matriculation_number, Some(id))
            .await?;

        let mut active: employee::ActiveModel = existing.into();
        active.first_name = Set(input.first_name);
        active.last_name = Set(input.last_name);
        active.fiscal_code = Set(input.fiscal_code);
        active.matriculation_number = Set(input.matriculation_number);
        active.email = Set(input.email);
        active.portal_access = Set(input.portal_access);
        let model = active.update(&*self.db).await?;

        info!(employee_id = %id, "employee updated");
        Ok(EmployeeView::from(model))
    }

    /// Deletes the employee and their contracts. Employees with recorded work are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find(id).await?;

        let processings = production_order_processing::Entity::find()
            .filter(production_order_processing::Column::EmployeeUuid.eq(id))
            .count(&*self.db)
            .await?;
        if processings > 0 {
            return Err(ServiceError::Conflict(format!(
                "employee {} has {} recorded processings",
                existing.matriculation_number, processings
            )));
        }

        let txn = self.db.begin().await?;
        employee_contract::Entity::delete_many()
            .filter(employee_contract::Column::EmployeeUuid.eq(id))
            .exec(&txn)
            .await?;
        employee::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(employee_id = %id, "employee deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<employee::Model, ServiceError> {
        employee::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", id))
    }

    async fn ensure_matriculation_available(
        &self,
        number: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query =
            employee::Entity::find().filter(employee::Column::MatriculationNumber.eq(number));
        if let Some(id) = except {
            query = query.filter(employee::Column::Uuid.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::field(
                "matriculation_number",
                "Matriculation number is already assigned",
            ));
        }
        Ok(())
    }
}
