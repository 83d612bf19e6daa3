use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_customer_tables::Migration),
            Box::new(m20240115_000002_create_employee_tables::Migration),
            Box::new(m20240115_000003_create_production_tables::Migration),
            Box::new(m20240402_000004_create_alert_acknowledgements::Migration),
        ]
    }
}

mod m20240115_000001_create_customer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000001_create_customer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Uuid).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Customers::Code).string().not_null().unique_key())
                        .col(ColumnDef::new(Customers::CompanyName).string().not_null())
                        .col(ColumnDef::new(Customers::VatNumber).string().null())
                        .col(ColumnDef::new(Customers::Email).string().null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerDivisions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerDivisions::Uuid)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CustomerDivisions::CustomerUuid).uuid().not_null())
                        .col(ColumnDef::new(CustomerDivisions::Name).string().not_null())
                        .col(
                            ColumnDef::new(CustomerDivisions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_customer_divisions_customer")
                                .from(CustomerDivisions::Table, CustomerDivisions::CustomerUuid)
                                .to(Customers::Table, Customers::Uuid)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerShippingAddresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerShippingAddresses::Uuid)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerShippingAddresses::CustomerDivisionUuid)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CustomerShippingAddresses::Street).string().not_null())
                        .col(ColumnDef::new(CustomerShippingAddresses::City).string().not_null())
                        .col(
                            ColumnDef::new(CustomerShippingAddresses::PostalCode)
                                .string_len(5)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerShippingAddresses::Province)
                                .string_len(2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerShippingAddresses::Country)
                                .string_len(2)
                                .not_null()
                                .default("IT"),
                        )
                        .col(
                            ColumnDef::new(CustomerShippingAddresses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerShippingAddresses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipping_addresses_division")
                                .from(
                                    CustomerShippingAddresses::Table,
                                    CustomerShippingAddresses::CustomerDivisionUuid,
                                )
                                .to(CustomerDivisions::Table, CustomerDivisions::Uuid)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomerShippingAddresses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CustomerDivisions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Customers {
        Table,
        Uuid,
        Code,
        CompanyName,
        VatNumber,
        Email,
        Phone,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CustomerDivisions {
        Table,
        Uuid,
        CustomerUuid,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum CustomerShippingAddresses {
        Table,
        Uuid,
        CustomerDivisionUuid,
        Street,
        City,
        PostalCode,
        Province,
        Country,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240115_000002_create_employee_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000002_create_employee_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Employees::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Employees::Uuid).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Employees::FirstName).string().not_null())
                        .col(ColumnDef::new(Employees::LastName).string().not_null())
                        .col(ColumnDef::new(Employees::FiscalCode).string_len(16).null())
                        .col(
                            ColumnDef::new(Employees::MatriculationNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Employees::Email).string().null())
                        .col(
                            ColumnDef::new(Employees::PortalAccess)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Employees::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Employees::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(EmployeeContracts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EmployeeContracts::Uuid)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(EmployeeContracts::EmployeeUuid).uuid().not_null())
                        .col(
                            ColumnDef::new(EmployeeContracts::PayLevel)
                                .small_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(EmployeeContracts::StartDate).date().not_null())
                        .col(ColumnDef::new(EmployeeContracts::EndDate).date().null())
                        .col(
                            ColumnDef::new(EmployeeContracts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EmployeeContracts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_employee_contracts_employee")
                                .from(EmployeeContracts::Table, EmployeeContracts::EmployeeUuid)
                                .to(Employees::Table, Employees::Uuid)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(EmployeeContracts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Employees::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Employees {
        Table,
        Uuid,
        FirstName,
        LastName,
        FiscalCode,
        MatriculationNumber,
        Email,
        PortalAccess,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum EmployeeContracts {
        Table,
        Uuid,
        EmployeeUuid,
        PayLevel,
        StartDate,
        EndDate,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240115_000003_create_production_tables {
    use super::m20240115_000001_create_customer_tables::Customers;
    use super::m20240115_000002_create_employee_tables::Employees;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000003_create_production_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionOrders::Uuid)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::ProductionNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProductionOrders::CustomerUuid).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductionOrders::Status)
                                .small_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::TotalQuantity)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::WorkedQuantity)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProductionOrders::DeliveryDate).date().null())
                        .col(
                            ColumnDef::new(ProductionOrders::SelfCheckDone)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_orders_customer")
                                .from(ProductionOrders::Table, ProductionOrders::CustomerUuid)
                                .to(Customers::Table, Customers::Uuid)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_production_orders_status")
                        .table(ProductionOrders::Table)
                        .col(ProductionOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductionOrderProcessings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionOrderProcessings::Uuid)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrderProcessings::ProductionOrderUuid)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrderProcessings::EmployeeUuid)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrderProcessings::Quantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrderProcessings::ProcessedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionOrderProcessings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_processings_order")
                                .from(
                                    ProductionOrderProcessings::Table,
                                    ProductionOrderProcessings::ProductionOrderUuid,
                                )
                                .to(ProductionOrders::Table, ProductionOrders::Uuid)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_processings_employee")
                                .from(
                                    ProductionOrderProcessings::Table,
                                    ProductionOrderProcessings::EmployeeUuid,
                                )
                                .to(Employees::Table, Employees::Uuid)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_processings_processed_at")
                        .table(ProductionOrderProcessings::Table)
                        .col(ProductionOrderProcessings::ProcessedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductionOrderProcessings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductionOrders {
        Table,
        Uuid,
        ProductionNumber,
        CustomerUuid,
        Status,
        TotalQuantity,
        WorkedQuantity,
        DeliveryDate,
        SelfCheckDone,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductionOrderProcessings {
        Table,
        Uuid,
        ProductionOrderUuid,
        EmployeeUuid,
        Quantity,
        ProcessedAt,
        CreatedAt,
    }
}

mod m20240402_000004_create_alert_acknowledgements {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240402_000004_create_alert_acknowledgements"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AlertAcknowledgements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AlertAcknowledgements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AlertAcknowledgements::AlertKey).string().not_null())
                        .col(
                            ColumnDef::new(AlertAcknowledgements::Signature)
                                .string_len(128)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertAcknowledgements::ScopeHash)
                                .string_len(128)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertAcknowledgements::AcknowledgedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_alert_acknowledgements_identity")
                        .table(AlertAcknowledgements::Table)
                        .col(AlertAcknowledgements::AlertKey)
                        .col(AlertAcknowledgements::Signature)
                        .col(AlertAcknowledgements::ScopeHash)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AlertAcknowledgements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AlertAcknowledgements {
        Table,
        Id,
        AlertKey,
        Signature,
        ScopeHash,
        AcknowledgedAt,
    }
}
