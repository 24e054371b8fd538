use super::calculator::{calculate_forecast, ForecastResult};
use super::history::DemandHistory;
use super::store::ForecastStore;
use crate::entities::ItemIdentity;
use crate::errors::ServiceError;
use chrono::NaiveDate;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Read history, project, persist: the unit of work for one item.
#[derive(Clone)]
pub struct ForecastPipeline {
    history: Arc<dyn DemandHistory>,
    store: Arc<dyn ForecastStore>,
    lookback_days: u32,
}

impl ForecastPipeline {
    pub fn new(
        history: Arc<dyn DemandHistory>,
        store: Arc<dyn ForecastStore>,
        lookback_days: u32,
    ) -> Self {
        Self {
            history,
            store,
            lookback_days,
        }
    }

    /// Runs the pipeline for `item`. A result without data is returned as-is
    /// and nothing is written, leaving any earlier snapshot in place.
    #[instrument(skip(self), fields(item = %item))]
    pub async fn run(
        &self,
        item: ItemIdentity,
        horizon_days: u32,
        today: NaiveDate,
    ) -> Result<ForecastResult, ServiceError> {
        let started = Instant::now();

        let history = self
            .history
            .read_historical_demand(item, self.lookback_days, today)
            .await?;
        let result = calculate_forecast(&history, horizon_days, today)?;

        if !result.has_data() {
            debug!("No historical demand; skipping persistence");
            return Ok(result);
        }

        debug!(factors = ?result.factors, "Computed forecast factors");
        let written = self.store.replace_forecast(item, &result).await?;

        counter!("forecast.generated", 1);
        histogram!(
            "forecast.item.duration_seconds",
            started.elapsed().as_secs_f64()
        );
        info!(
            days = written,
            total_demand = result.total_predicted_demand(),
            confidence = result.confidence,
            "Forecast generated"
        );
        Ok(result)
    }
}
