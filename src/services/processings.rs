use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::listing::{ListQuery, Listing, Page};
use super::FormOption;
use crate::entities::{employee, production_order, production_order_processing};
use crate::errors::{FieldErrors, ServiceError};
use crate::models::OrderStatus;

const SORTABLE: [(&str, production_order_processing::Column); 3] = [
    ("processed_at", production_order_processing::Column::ProcessedAt),
    ("quantity", production_order_processing::Column::Quantity),
    ("created_at", production_order_processing::Column::CreatedAt),
];

/// Work recorded against a production order.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ProcessingInput {
    pub production_order_uuid: Uuid,
    pub employee_uuid: Uuid,
    #[validate(range(
        min = 1,
        max = 1_000_000_000,
        message = "Quantity must be between 1 and 1000000000"
    ))]
    pub quantity: i64,
    /// Defaults to now
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProcessingView {
    pub uuid: Uuid,
    pub production_order_uuid: Uuid,
    pub production_number: Option<String>,
    pub employee_uuid: Uuid,
    pub employee_name: Option<String>,
    pub quantity: i64,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessingForm {
    pub processing: Option<ProcessingView>,
    /// Orders that still accept work
    pub production_orders: Vec<FormOption>,
    pub employees: Vec<FormOption>,
}

#[derive(Clone)]
pub struct ProcessingService {
    db: Arc<DatabaseConnection>,
}

impl ProcessingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Searches by production number.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<ProcessingView>, ServiceError> {
        let page = Listing::new(
            production_order_processing::Entity::find().inner_join(production_order::Entity),
        )
        .search(
            query.search_term(),
            &[production_order::Column::ProductionNumber],
        )
        .sort(query, &SORTABLE, production_order_processing::Column::ProcessedAt)?
        .fetch(&*self.db, query)
        .await?;

        let labels = self.labels(&page.items).await?;
        Ok(page.map(|model| labels.view(model)))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ProcessingView, ServiceError> {
        let model = find(&*self.db, id).await?;
        let labels = self.labels(std::slice::from_ref(&model)).await?;
        Ok(labels.view(model))
    }

    pub async fn form(&self, id: Option<Uuid>) -> Result<ProcessingForm, ServiceError> {
        let processing = match id {
            Some(id) => Some(self.get(id).await?),
            None => None,
        };

        let open: Vec<OrderStatus> = OrderStatus::ALL
            .into_iter()
            .filter(|status| !status.is_terminal())
            .collect();
        let mut orders = production_order::Entity::find()
            .filter(production_order::Column::Status.is_in(open))
            .order_by_asc(production_order::Column::ProductionNumber)
            .all(&*self.db)
            .await?;

        // A processing being edited keeps its order selectable even once the order is closed.
        if let Some(current) = processing.as_ref() {
            if !orders.iter().any(|o| o.uuid == current.production_order_uuid) {
                if let Some(order) = production_order::Entity::find_by_id(current.production_order_uuid)
                    .one(&*self.db)
                    .await?
                {
                    orders.push(order);
                }
            }
        }

        let employees = employee::Entity::find()
            .order_by_asc(employee::Column::LastName)
            .order_by_asc(employee::Column::FirstName)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|employee| FormOption::new(employee.uuid, employee.full_name()))
            .collect();

        Ok(ProcessingForm {
            processing,
            production_orders: orders
                .into_iter()
                .map(|order| FormOption::new(order.uuid, order.production_number))
                .collect(),
            employees,
        })
    }

    /// Records work and adds its quantity to the order's worked quantity.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: ProcessingInput) -> Result<ProcessingView, ServiceError> {
        let txn = self.db.begin().await?;
        let order = check(&txn, &input).await?;

        let model = production_order_processing::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            production_order_uuid: Set(input.production_order_uuid),
            employee_uuid: Set(input.employee_uuid),
            quantity: Set(input.quantity),
            processed_at: Set(input.processed_at.unwrap_or_else(Utc::now)),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        adjust_worked_quantity(&txn, order, input.quantity).await?;
        txn.commit().await?;

        info!(
            processing_id = %model.uuid,
            order_id = %model.production_order_uuid,
            quantity = model.quantity,
            "processing recorded"
        );
        self.get(model.uuid).await
    }

    /// Moves the recorded quantity between orders when the order changes.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: ProcessingInput) -> Result<ProcessingView, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = find(&txn, id).await?;
        let target = check(&txn, &input).await?;

        if existing.production_order_uuid == input.production_order_uuid {
            adjust_worked_quantity(&txn, target, input.quantity - existing.quantity).await?;
        } else {
            if let Some(previous) = production_order::Entity::find_by_id(existing.production_order_uuid)
                .one(&txn)
                .await?
            {
                adjust_worked_quantity(&txn, previous, -existing.quantity).await?;
            }
            adjust_worked_quantity(&txn, target, input.quantity).await?;
        }

        let mut active: production_order_processing::ActiveModel = existing.into();
        active.production_order_uuid = Set(input.production_order_uuid);
        active.employee_uuid = Set(input.employee_uuid);
        active.quantity = Set(input.quantity);
        if let Some(processed_at) = input.processed_at {
            active.processed_at = Set(processed_at);
        }
        active.update(&txn).await?;
        txn.commit().await?;

        info!(processing_id = %id, "processing updated");
        self.get(id).await
    }

    /// Deletes the record and subtracts its quantity from the order again.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = find(&txn, id).await?;
        if let Some(order) = production_order::Entity::find_by_id(existing.production_order_uuid)
            .one(&txn)
            .await?
        {
            adjust_worked_quantity(&txn, order, -existing.quantity).await?;
        }
        production_order_processing::Entity::delete_by_id(id)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(processing_id = %id, "processing deleted");
        Ok(())
    }

    async fn labels(&self, items: &[production_order_processing::Model]) -> Result<Labels, ServiceError> {
        if items.is_empty() {
            return Ok(Labels::default());
        }
        let order_ids: Vec<Uuid> = items.iter().map(|p| p.production_order_uuid).collect();
        let employee_ids: Vec<Uuid> = items.iter().map(|p| p.employee_uuid).collect();

        let orders = production_order::Entity::find()
            .filter(production_order::Column::Uuid.is_in(order_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|order| (order.uuid, order.production_number))
            .collect();
        let employees = employee::Entity::find()
            .filter(employee::Column::Uuid.is_in(employee_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|employee| (employee.uuid, employee.full_name()))
            .collect();

        Ok(Labels { orders, employees })
    }
}

#[derive(Default)]
struct Labels {
    orders: HashMap<Uuid, String>,
    employees: HashMap<Uuid, String>,
}

impl Labels {
    fn view(&self, model: production_order_processing::Model) -> ProcessingView {
        ProcessingView {
            production_number: self.orders.get(&model.production_order_uuid).cloned(),
            employee_name: self.employees.get(&model.employee_uuid).cloned(),
            uuid: model.uuid,
            production_order_uuid: model.production_order_uuid,
            employee_uuid: model.employee_uuid,
            quantity: model.quantity,
            processed_at: model.processed_at,
        }
    }
}

async fn find<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<production_order_processing::Model, ServiceError> {
    production_order_processing::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Processing", id))
}

/// Validates the input and returns the target order.
async fn check<C: ConnectionTrait>(
    db: &C,
    input: &ProcessingInput,
) -> Result<production_order::Model, ServiceError> {
    let mut fields = match input.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errors) => FieldErrors::from(&errors),
    };

    let order = production_order::Entity::find_by_id(input.production_order_uuid)
        .one(db)
        .await?;
    if order.is_none() {
        fields.insert("production_order_uuid", "Production order not found");
    }
    if employee::Entity::find_by_id(input.employee_uuid)
        .one(db)
        .await?
        .is_none()
    {
        fields.insert("employee_uuid", "Employee not found");
    }

    match order {
        Some(order) if fields.is_empty() => Ok(order),
        _ => Err(ServiceError::InvalidFields(fields)),
    }
}

async fn adjust_worked_quantity<C: ConnectionTrait>(
    db: &C,
    order: production_order::Model,
    delta: i64,
) -> Result<(), ServiceError> {
    if delta == 0 {
        return Ok(());
    }
    let Some(mut worked) = order.worked_quantity.checked_add(delta) else {
        return Err(ServiceError::field(
            "quantity",
            "Quantity exceeds what the production order can record",
        ));
    };
    if worked < 0 {
        warn!(
            order_id = %order.uuid,
            worked_quantity = order.worked_quantity,
            delta,
            "worked quantity would go negative, clamping to zero"
        );
        worked = 0;
    }
    let mut active: production_order::ActiveModel = order.into();
    active.worked_quantity = Set(worked);
    active.update(db).await?;
    Ok(())
}
