use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::listing::{ListQuery, Listing, Page};
use super::FormOption;
use crate::entities::{employee, employee_contract};
use crate::errors::{FieldErrors, ServiceError};
use crate::models::PayLevel;

const SORTABLE: [(&str, employee_contract::Column); 4] = [
    ("start_date", employee_contract::Column::StartDate),
    ("end_date", employee_contract::Column::EndDate),
    ("pay_level", employee_contract::Column::PayLevel),
    ("created_at", employee_contract::Column::CreatedAt),
];

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ContractInput {
    pub employee_uuid: Uuid,
    /// Pay level code, 0 to 4
    #[validate(range(max = 4, message = "Pay level must be between 0 and 4"))]
    pub pay_level: u8,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl ContractInput {
    fn check(&self) -> Result<PayLevel, ServiceError> {
        let mut fields = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => FieldErrors::from(&errors),
        };
        if let Some(end) = self.end_date {
            if end < self.start_date {
                fields.insert("end_date", "End date must not precede the start date");
            }
        }
        if !fields.is_empty() {
            return Err(ServiceError::InvalidFields(fields));
        }
        PayLevel::try_from(self.pay_level)
            .map_err(|_| ServiceError::field("pay_level", "Pay level must be between 0 and 4"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContractView {
    pub uuid: Uuid,
    pub employee_uuid: Uuid,
    pub employee_name: Option<String>,
    pub pay_level: u8,
    pub pay_level_label: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Whether the contract covers today.
    pub active: bool,
}

impl ContractView {
    fn new(model: employee_contract::Model, employee_name: Option<String>, today: NaiveDate) -> Self {
        let active = model.start_date <= today && model.end_date.map_or(true, |end| today <= end);
        Self {
            uuid: model.uuid,
            employee_uuid: model.employee_uuid,
            employee_name,
            pay_level: model.pay_level.code(),
            pay_level_label: model.pay_level.label().to_string(),
            start_date: model.start_date,
            end_date: model.end_date,
            active,
        }
    }
}

/// Select options for the contract forms plus the record being edited.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContractForm {
    pub contract: Option<ContractView>,
    pub pay_levels: Vec<FormOption>,
    pub employees: Vec<FormOption>,
}

#[derive(Clone)]
pub struct ContractService {
    db: Arc<DatabaseConnection>,
}

impl ContractService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Searches by employee name or matriculation number.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<ContractView>, ServiceError> {
        let page = Listing::new(
            employee_contract::Entity::find().inner_join(employee::Entity),
        )
        .search(
            query.search_term(),
            &[
                employee::Column::FirstName,
                employee::Column::LastName,
                employee::Column::MatriculationNumber,
            ],
        )
        .sort(query, &SORTABLE, employee_contract::Column::StartDate)?
        .fetch(&*self.db, query)
        .await?;

        let ids: Vec<Uuid> = page.items.iter().map(|c| c.employee_uuid).collect();
        let names = self.employee_names(&ids).await?;
        let today = Utc::now().date_naive();
        Ok(page.map(|model| {
            let name = names.get(&model.employee_uuid).cloned();
            ContractView::new(model, name, today)
        }))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ContractView, ServiceError> {
        let model = self.find(id).await?;
        let names = self.employee_names(&[model.employee_uuid]).await?;
        let name = names.get(&model.employee_uuid).cloned();
        Ok(ContractView::new(model, name, Utc::now().date_naive()))
    }

    pub async fn form(&self, id: Option<Uuid>) -> Result<ContractForm, ServiceError> {
        let contract = match id {
            Some(id) => Some(self.get(id).await?),
            None => None,
        };
        let employees = employee::Entity::find()
            .order_by_asc(employee::Column::LastName)
            .order_by_asc(employee::Column::FirstName)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|employee| FormOption::new(employee.uuid, employee.full_name()))
            .collect();

        Ok(ContractForm {
            contract,
            pay_levels: pay_level_options(),
            employees,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: ContractInput) -> Result<ContractView, ServiceError> {
        let level = input.check()?;
        self.ensure_employee(input.employee_uuid).await?;

        let model = employee_contract::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            employee_uuid: Set(input.employee_uuid),
            pay_level: Set(level),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(contract_id = %model.uuid, employee_id = %model.employee_uuid, "contract created");
        self.get(model.uuid).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: ContractInput) -> Result<ContractView, ServiceError> {
        let existing = self.find(id).await?;
        let level = input.check()?;
        self.ensure_employee(input.employee_uuid).await?;

        let mut active: employee_contract::ActiveModel = existing.into();
        active.employee_uuid = Set(input.employee_uuid);
        active.pay_level = Set(level);
        active.start_date = Set(input.start_date);
        active.end_date = Set(input.end_date);
        active.update(&*self.db).await?;

        info!(contract_id = %id, "contract updated");
        self.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.find(id).await?;
        employee_contract::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        info!(contract_id = %id, "contract deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<employee_contract::Model, ServiceError> {
        employee_contract::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Contract", id))
    }

    async fn ensure_employee(&self, id: Uuid) -> Result<(), ServiceError> {
        match employee::Entity::find_by_id(id).one(&*self.db).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::field("employee_uuid", "Employee not found")),
        }
    }

    async fn employee_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, ServiceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let employees = employee::Entity::find()
            .filter(employee::Column::Uuid.is_in(ids.to_vec()))
            .all(&*self.db)
            .await?;
        Ok(employees
            .into_iter()
            .map(|employee| (employee.uuid, employee.full_name()))
            .collect())
    }
}

pub fn pay_level_options() -> Vec<FormOption> {
    PayLevel::ALL
        .iter()
        .map(|level| FormOption::new(level.code(), level.label()))
        .collect()
}
