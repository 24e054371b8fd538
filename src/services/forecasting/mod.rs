//! Demand forecasting and low-stock alerting.
//!
//! Data flows leaves-first: [`history`] aggregates order lines into a daily
//! series, [`calculator`] projects it, [`store`] swaps the item's snapshot in
//! one transaction, and [`alerts`] later compares stored rows with live stock.
//! [`batch`] drives the pipeline across the whole catalog.

pub mod alerts;
pub mod batch;
pub mod calculator;
pub mod catalog;
pub mod history;
pub mod pipeline;
pub mod store;

pub use alerts::{AlertEntry, LowStockAlertEngine};
pub use batch::{BatchOrchestrator, BatchSummary};
pub use calculator::{
    calculate_forecast, DemandObservation, ForecastFactors, ForecastPoint, ForecastResult,
};
pub use catalog::{CatalogEntry, CatalogReader, SeaOrmCatalog};
pub use history::{DemandHistory, SeaOrmDemandHistory};
pub use pipeline::ForecastPipeline;
pub use store::{ForecastStore, SeaOrmForecastStore};

use crate::config::ForecastConfig;
use crate::entities::{inventory_forecast, ItemIdentity, ItemType};
use crate::errors::ServiceError;
use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Parses `product`, `consumable` or `filter` (any case).
pub fn parse_item_type(raw: &str) -> Result<ItemType, ServiceError> {
    ItemType::from_str(raw.trim())
        .map_err(|_| ServiceError::ComputationError(format!("unrecognized item type '{}'", raw)))
}

/// Entry point used by callers (HTTP layer, CLI, scheduler).
#[derive(Clone)]
pub struct ForecastingService {
    pipeline: ForecastPipeline,
    catalog: Arc<dyn CatalogReader>,
    store: Arc<dyn ForecastStore>,
    settings: ForecastConfig,
    reference_date: Option<NaiveDate>,
}

impl ForecastingService {
    /// Wires the SeaORM-backed collaborators to one connection pool.
    pub fn new(db: Arc<DatabaseConnection>, settings: ForecastConfig) -> Self {
        let catalog: Arc<dyn CatalogReader> = Arc::new(SeaOrmCatalog::new(db.clone()));
        let history: Arc<dyn DemandHistory> = Arc::new(SeaOrmDemandHistory::new(
            db.clone(),
            catalog.clone(),
            settings.active_order_statuses.clone(),
        ));
        let store: Arc<dyn ForecastStore> = Arc::new(SeaOrmForecastStore::new(db));
        Self::with_collaborators(history, catalog, store, settings)
    }

    pub fn with_collaborators(
        history: Arc<dyn DemandHistory>,
        catalog: Arc<dyn CatalogReader>,
        store: Arc<dyn ForecastStore>,
        settings: ForecastConfig,
    ) -> Self {
        Self {
            pipeline: ForecastPipeline::new(history, store.clone(), settings.lookback_days),
            catalog,
            store,
            settings,
            reference_date: None,
        }
    }

    /// Pins "today" instead of reading the clock.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn settings(&self) -> &ForecastConfig {
        &self.settings
    }

    /// Generates and stores the forecast for one item. `horizon_days`
    /// defaults to the configured horizon. Without order history the empty
    /// result is returned and stored rows are left untouched.
    #[instrument(skip(self))]
    pub async fn generate_forecast(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        horizon_days: Option<u32>,
    ) -> Result<ForecastResult, ServiceError> {
        let horizon = horizon_days.unwrap_or(self.settings.horizon_days);
        self.pipeline
            .run(ItemIdentity::new(item_type, item_id), horizon, self.today())
            .await
    }

    /// Regenerates every active item; always returns counts unless the
    /// catalog itself cannot be listed.
    pub async fn generate_all_forecasts(&self) -> Result<BatchSummary, ServiceError> {
        BatchOrchestrator::new(
            self.pipeline.clone(),
            self.catalog.clone(),
            self.settings.horizon_days,
            self.settings.batch_concurrency,
        )
        .run(self.today())
        .await
    }

    /// Items whose stored demand over the next `horizon_days` (default from
    /// config) exceeds current stock, largest shortage first.
    pub async fn get_low_stock_alerts(
        &self,
        horizon_days: Option<u32>,
    ) -> Result<Vec<AlertEntry>, ServiceError> {
        let horizon = horizon_days.unwrap_or(self.settings.alert_horizon_days);
        if horizon > self.settings.horizon_days {
            // Generation is never extended on demand; later days simply have no rows.
            warn!(
                alert_horizon = horizon,
                forecast_horizon = self.settings.horizon_days,
                "Alert horizon exceeds forecast horizon; trailing days have no forecasts"
            );
        }
        LowStockAlertEngine::new(self.store.clone(), self.catalog.clone())
            .low_stock_alerts(horizon, self.today())
            .await
    }

    /// Stored forecast rows for one item, date-ascending.
    pub async fn get_forecasts(
        &self,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<Vec<inventory_forecast::Model>, ServiceError> {
        self.store
            .list_forecasts(ItemIdentity::new(item_type, item_id))
            .await
    }

    /// Current on-hand stock as reported by the item's catalog.
    pub async fn current_stock(
        &self,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<i64, ServiceError> {
        self.catalog
            .current_stock(ItemIdentity::new(item_type, item_id))
            .await
    }
}
