use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};

use crate::models::OrderStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub production_number: String,
    pub customer_uuid: Uuid,
    pub status: OrderStatus,
    pub total_quantity: i64,
    pub worked_quantity: i64,
    pub delivery_date: Option<NaiveDate>,
    pub self_check_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Past its delivery date and still open.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_terminal() && self.delivery_date.is_some_and(|date| date < today)
    }

    /// In production without a completed self-check.
    pub fn lacks_self_check(&self) -> bool {
        self.status == OrderStatus::InProduction && !self.self_check_done
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerUuid",
        to = "super::customer::Column::Uuid",
        on_delete = "Restrict"
    )]
    Customer,
    #[sea_orm(has_many = "super::production_order_processing::Entity")]
    Processings,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::production_order_processing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Processings.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert && active_model.created_at.is_not_set() {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(Some(now));
        Ok(active_model)
    }
}
