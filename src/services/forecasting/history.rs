use super::calculator::DemandObservation;
use super::catalog::CatalogReader;
use crate::entities::{order, order_item, ItemIdentity};
use crate::errors::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::sea_query::JoinType;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Source of per-item daily demand.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DemandHistory: Send + Sync {
    /// Date-ascending daily totals for the `lookback_days` days up to and
    /// including `today`. An empty vector means the item had no qualifying
    /// orders, which is not an error.
    async fn read_historical_demand(
        &self,
        item: ItemIdentity,
        lookback_days: u32,
        today: NaiveDate,
    ) -> Result<Vec<DemandObservation>, ServiceError>;
}

/// Aggregates order lines from the `orders`/`order_items` tables.
#[derive(Clone)]
pub struct SeaOrmDemandHistory {
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn CatalogReader>,
    active_statuses: Vec<String>,
}

impl SeaOrmDemandHistory {
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: Arc<dyn CatalogReader>,
        active_statuses: Vec<String>,
    ) -> Self {
        Self {
            db,
            catalog,
            active_statuses,
        }
    }
}

#[async_trait]
impl DemandHistory for SeaOrmDemandHistory {
    #[instrument(skip(self), fields(item = %item))]
    async fn read_historical_demand(
        &self,
        item: ItemIdentity,
        lookback_days: u32,
        today: NaiveDate,
    ) -> Result<Vec<DemandObservation>, ServiceError> {
        let entry = self
            .catalog
            .lookup(item)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("catalog item {}", item)))?;

        let (from, until) = history_window(today, lookback_days);

        let lines: Vec<(DateTime<Utc>, i32)> = order_item::Entity::find()
            .join(JoinType::InnerJoin, order_item::Relation::Order.def())
            .filter(order_item::Column::Sku.eq(entry.code.as_str()))
            .filter(order::Column::Status.is_in(self.active_statuses.iter().map(String::as_str)))
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lt(until))
            .select_only()
            .column(order::Column::CreatedAt)
            .column(order_item::Column::Quantity)
            .order_by_asc(order::Column::CreatedAt)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| ServiceError::source_unavailable("reading order history", e))?;

        let series = group_by_day(lines);
        debug!(
            code = %entry.code,
            days = series.len(),
            "Aggregated historical demand"
        );
        Ok(series)
    }
}

/// Half-open UTC range `[today - lookback_days, today + 1)` at day boundaries.
pub fn history_window(today: NaiveDate, lookback_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_of = |date: NaiveDate| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    (
        start_of(today - Duration::days(i64::from(lookback_days))),
        start_of(today + Duration::days(1)),
    )
}

/// Sums quantities per UTC calendar day, date-ascending.
pub fn group_by_day(
    lines: impl IntoIterator<Item = (DateTime<Utc>, i32)>,
) -> Vec<DemandObservation> {
    let mut by_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for (created_at, quantity) in lines {
        *by_day.entry(created_at.date_naive()).or_insert(0) += i64::from(quantity);
    }
    by_day
        .into_iter()
        .map(|(date, quantity)| DemandObservation::new(date, quantity))
        .collect()
}
