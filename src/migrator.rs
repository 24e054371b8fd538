use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000002_create_orders_tables::Migration),
            Box::new(m20240301_000003_create_inventory_forecasts_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Catalog tables aligned with entities::{product, consumable, filter}
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null().unique_key())
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Consumables::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Consumables::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Consumables::Name).string().not_null())
                        .col(
                            ColumnDef::new(Consumables::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Consumables::QuantityOnHand)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Consumables::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Filters::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Filters::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Filters::Name).string().not_null())
                        .col(ColumnDef::new(Filters::Code).string().not_null().unique_key())
                        .col(
                            ColumnDef::new(Filters::StockLevel)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Filters::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Filters::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Consumables::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Sku,
        StockQuantity,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum Consumables {
        Table,
        Id,
        Name,
        Code,
        QuantityOnHand,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum Filters {
        Table,
        Id,
        Name,
        Code,
        StockLevel,
        IsActive,
    }
}

mod m20240301_000002_create_orders_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status_created_at")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Sku).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_sku")
                        .table(OrderItems::Table)
                        .col(OrderItems::Sku)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        Status,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        Sku,
        Quantity,
        CreatedAt,
    }
}

mod m20240301_000003_create_inventory_forecasts_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_inventory_forecasts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryForecasts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryForecasts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryForecasts::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryForecasts::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryForecasts::ForecastDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryForecasts::PredictedDemand)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryForecasts::ConfidenceLevel)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(InventoryForecasts::Factors).json().not_null())
                        .col(
                            ColumnDef::new(InventoryForecasts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One row per (item, day); a second run must replace, never merge
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_inventory_forecasts_item_date")
                        .table(InventoryForecasts::Table)
                        .col(InventoryForecasts::ItemType)
                        .col(InventoryForecasts::ItemId)
                        .col(InventoryForecasts::ForecastDate)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_forecasts_forecast_date")
                        .table(InventoryForecasts::Table)
                        .col(InventoryForecasts::ForecastDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryForecasts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryForecasts {
        Table,
        Id,
        ItemType,
        ItemId,
        ForecastDate,
        PredictedDemand,
        ConfidenceLevel,
        Factors,
        CreatedAt,
    }
}
