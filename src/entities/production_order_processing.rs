use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_order_processings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    pub production_order_uuid: Uuid,
    pub employee_uuid: Uuid,
    pub quantity: i64,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::production_order::Entity",
        from = "Column::ProductionOrderUuid",
        to = "super::production_order::Column::Uuid",
        on_delete = "Cascade"
    )]
    ProductionOrder,
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeUuid",
        to = "super::employee::Column::Uuid",
        on_delete = "Restrict"
    )]
    Employee,
}

impl Related<super::production_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionOrder.def()
    }
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
