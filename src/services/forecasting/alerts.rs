use super::catalog::{CatalogEntry, CatalogReader};
use super::store::ForecastStore;
use crate::config::MAX_HORIZON_DAYS;
use crate::entities::{inventory_forecast, ItemIdentity, ItemType};
use crate::errors::ServiceError;
use chrono::{Duration, NaiveDate};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// An item whose predicted demand over the alert horizon exceeds its stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntry {
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub item_name: String,
    pub current_stock: i64,
    pub predicted_demand_over_horizon: i64,
    pub avg_confidence: f64,
    pub shortage: i64,
}

/// Per-item sums over the stored rows inside the alert window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowTotals {
    pub predicted_demand: i64,
    pub confidence_sum: f64,
    pub rows: usize,
}

impl WindowTotals {
    pub fn avg_confidence(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.confidence_sum / self.rows as f64
        }
    }
}

/// Groups stored rows by item; iteration order is item type, then id.
pub fn totals_by_item(
    rows: &[inventory_forecast::Model],
) -> BTreeMap<ItemIdentity, WindowTotals> {
    let mut totals: BTreeMap<ItemIdentity, WindowTotals> = BTreeMap::new();
    for row in rows {
        let entry = totals.entry(row.identity()).or_default();
        entry.predicted_demand += i64::from(row.predicted_demand);
        entry.confidence_sum += row.confidence_level;
        entry.rows += 1;
    }
    totals
}

/// `Some` only when predicted demand strictly exceeds stock.
pub fn derive_alert(
    item: ItemIdentity,
    catalog: &CatalogEntry,
    totals: &WindowTotals,
) -> Option<AlertEntry> {
    if totals.predicted_demand <= catalog.stock {
        return None;
    }
    Some(AlertEntry {
        item_type: item.item_type,
        item_id: item.item_id,
        item_name: catalog.name.clone(),
        current_stock: catalog.stock,
        predicted_demand_over_horizon: totals.predicted_demand,
        avg_confidence: totals.avg_confidence(),
        shortage: totals.predicted_demand - catalog.stock,
    })
}

/// Compares stored forecasts with live stock. Read-only.
#[derive(Clone)]
pub struct LowStockAlertEngine {
    store: Arc<dyn ForecastStore>,
    catalog: Arc<dyn CatalogReader>,
}

impl LowStockAlertEngine {
    pub fn new(store: Arc<dyn ForecastStore>, catalog: Arc<dyn CatalogReader>) -> Self {
        Self { store, catalog }
    }

    /// Alerts for the window `[today, today + horizon_days]`, largest shortage first.
    #[instrument(skip(self))]
    pub async fn low_stock_alerts(
        &self,
        horizon_days: u32,
        today: NaiveDate,
    ) -> Result<Vec<AlertEntry>, ServiceError> {
        if horizon_days > MAX_HORIZON_DAYS {
            return Err(ServiceError::ComputationError(format!(
                "alert horizon must be at most {} days, got {}",
                MAX_HORIZON_DAYS, horizon_days
            )));
        }

        let until = today + Duration::days(i64::from(horizon_days));
        let rows = self.store.forecasts_in_window(today, until).await?;
        let totals = totals_by_item(&rows);

        let mut alerts = Vec::new();
        for (item, item_totals) in &totals {
            let Some(entry) = self.catalog.lookup(*item).await? else {
                warn!(item = %item, "Forecast rows reference a missing catalog item; skipping");
                continue;
            };
            debug!(
                item = %item,
                stock_field = item.item_type.stock_field(),
                stock = entry.stock,
                demand = item_totals.predicted_demand,
                "Compared window demand with stock"
            );
            if let Some(alert) = derive_alert(*item, &entry, item_totals) {
                alerts.push(alert);
            }
        }

        // Stable sort keeps ties in item order.
        alerts.sort_by(|a, b| b.shortage.cmp(&a.shortage));

        counter!("forecast.alerts.emitted", alerts.len() as u64);
        info!(
            items = totals.len(),
            alerts = alerts.len(),
            %until,
            "Low-stock alerts derived"
        );
        Ok(alerts)
    }
}
