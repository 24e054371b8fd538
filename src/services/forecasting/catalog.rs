use crate::entities::{consumable, filter, product, ItemIdentity, ItemType};
use crate::errors::ServiceError;
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// What the forecasting core needs to know about a catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    /// Code order lines reference: product SKU, consumable or filter code
    pub code: String,
    pub stock: i64,
}

/// Read access to the product, consumable and filter catalogs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// `Ok(None)` when the item does not exist in its catalog.
    async fn lookup(&self, item: ItemIdentity) -> Result<Option<CatalogEntry>, ServiceError>;

    /// Ids of active items of one type, in id order.
    async fn list_active_items(&self, item_type: ItemType) -> Result<Vec<Uuid>, ServiceError>;

    async fn current_stock(&self, item: ItemIdentity) -> Result<i64, ServiceError> {
        self.lookup(item)
            .await?
            .map(|entry| entry.stock)
            .ok_or_else(|| ServiceError::NotFound(format!("catalog item {}", item)))
    }
}

/// Catalog reader over the host's SeaORM tables.
#[derive(Clone)]
pub struct SeaOrmCatalog {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCatalog {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn fetch(&self, item: ItemIdentity) -> Result<Option<CatalogEntry>, DbErr> {
        let db = self.db.as_ref();
        let entry = match item.item_type {
            ItemType::Product => product::Entity::find_by_id(item.item_id)
                .one(db)
                .await?
                .map(|p| CatalogEntry {
                    name: p.name,
                    code: p.sku,
                    stock: i64::from(p.stock_quantity),
                }),
            ItemType::Consumable => consumable::Entity::find_by_id(item.item_id)
                .one(db)
                .await?
                .map(|c| CatalogEntry {
                    name: c.name,
                    code: c.code,
                    stock: i64::from(c.quantity_on_hand),
                }),
            ItemType::Filter => filter::Entity::find_by_id(item.item_id)
                .one(db)
                .await?
                .map(|f| CatalogEntry {
                    name: f.name,
                    code: f.code,
                    stock: i64::from(f.stock_level),
                }),
        };
        Ok(entry)
    }
}

#[async_trait]
impl CatalogReader for SeaOrmCatalog {
    #[instrument(skip(self), fields(item = %item))]
    async fn lookup(&self, item: ItemIdentity) -> Result<Option<CatalogEntry>, ServiceError> {
        self.fetch(item)
            .await
            .map_err(|e| ServiceError::source_unavailable("reading catalog", e))
    }

    #[instrument(skip(self))]
    async fn list_active_items(&self, item_type: ItemType) -> Result<Vec<Uuid>, ServiceError> {
        let db = self.db.as_ref();
        let ids = match item_type {
            ItemType::Product => {
                product::Entity::find()
                    .filter(product::Column::IsActive.eq(true))
                    .select_only()
                    .column(product::Column::Id)
                    .order_by_asc(product::Column::Id)
                    .into_tuple::<Uuid>()
                    .all(db)
                    .await
            }
            ItemType::Consumable => {
                consumable::Entity::find()
                    .filter(consumable::Column::IsActive.eq(true))
                    .select_only()
                    .column(consumable::Column::Id)
                    .order_by_asc(consumable::Column::Id)
                    .into_tuple::<Uuid>()
                    .all(db)
                    .await
            }
            ItemType::Filter => {
                filter::Entity::find()
                    .filter(filter::Column::IsActive.eq(true))
                    .select_only()
                    .column(filter::Column::Id)
                    .order_by_asc(filter::Column::Id)
                    .into_tuple::<Uuid>()
                    .all(db)
                    .await
            }
        };
        ids.map_err(|e| {
            ServiceError::source_unavailable(&format!("listing active {} items", item_type), e)
        })
    }
}
