use super::calculator::ForecastResult;
use crate::db::transaction::with_transaction;
use crate::entities::{inventory_forecast, ItemIdentity};
use crate::errors::ServiceError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Persistence for forecast snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Atomically swaps every stored row for `item` with the rows in `result`.
    /// Returns the number of rows written.
    async fn replace_forecast(
        &self,
        item: ItemIdentity,
        result: &ForecastResult,
    ) -> Result<usize, ServiceError>;

    /// Stored rows for one item, date-ascending.
    async fn list_forecasts(
        &self,
        item: ItemIdentity,
    ) -> Result<Vec<inventory_forecast::Model>, ServiceError>;

    /// Stored rows of every item dated within `[from, to]`.
    async fn forecasts_in_window(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<inventory_forecast::Model>, ServiceError>;
}

#[derive(Clone)]
pub struct SeaOrmForecastStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmForecastStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ForecastStore for SeaOrmForecastStore {
    #[instrument(skip(self, result), fields(item = %item, days = result.forecasts.len()))]
    async fn replace_forecast(
        &self,
        item: ItemIdentity,
        result: &ForecastResult,
    ) -> Result<usize, ServiceError> {
        if result.forecasts.is_empty() {
            return Err(ServiceError::ComputationError(format!(
                "refusing to store an empty forecast set for {}",
                item
            )));
        }

        let factors = serde_json::to_value(&result.factors)
            .map_err(|e| ServiceError::ComputationError(format!("encoding factors: {}", e)))?;
        let created_at = Utc::now();
        let rows: Vec<inventory_forecast::ActiveModel> = result
            .forecasts
            .iter()
            .map(|point| inventory_forecast::ActiveModel {
                id: Set(Uuid::new_v4()),
                item_type: Set(item.item_type),
                item_id: Set(item.item_id),
                forecast_date: Set(point.date),
                predicted_demand: Set(point.predicted_demand),
                confidence_level: Set(point.confidence),
                factors: Set(factors.clone()),
                created_at: Set(created_at),
            })
            .collect();
        let written = rows.len();

        let deleted = with_transaction(self.db.as_ref(), move |txn| {
            Box::pin(async move {
                let deleted = inventory_forecast::Entity::delete_many()
                    .filter(inventory_forecast::Column::ItemType.eq(item.item_type))
                    .filter(inventory_forecast::Column::ItemId.eq(item.item_id))
                    .exec(txn)
                    .await?;
                inventory_forecast::Entity::insert_many(rows).exec(txn).await?;
                Ok::<_, DbErr>(deleted.rows_affected)
            })
        })
        .await
        .map_err(|e| ServiceError::persistence("replacing forecast rows", e))?;

        debug!(deleted, written, "Replaced forecast rows");
        Ok(written)
    }

    async fn list_forecasts(
        &self,
        item: ItemIdentity,
    ) -> Result<Vec<inventory_forecast::Model>, ServiceError> {
        inventory_forecast::Entity::find()
            .filter(inventory_forecast::Column::ItemType.eq(item.item_type))
            .filter(inventory_forecast::Column::ItemId.eq(item.item_id))
            .order_by_asc(inventory_forecast::Column::ForecastDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| ServiceError::source_unavailable("reading stored forecasts", e))
    }

    async fn forecasts_in_window(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<inventory_forecast::Model>, ServiceError> {
        inventory_forecast::Entity::find()
            .filter(inventory_forecast::Column::ForecastDate.between(from, to))
            .order_by_asc(inventory_forecast::Column::ItemType)
            .order_by_asc(inventory_forecast::Column::ItemId)
            .order_by_asc(inventory_forecast::Column::ForecastDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| ServiceError::source_unavailable("reading stored forecasts", e))
    }
}
