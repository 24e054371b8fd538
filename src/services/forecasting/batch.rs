use super::catalog::CatalogReader;
use super::pipeline::ForecastPipeline;
use crate::entities::{ItemIdentity, ItemType};
use crate::errors::ServiceError;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome counts of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Processed,
    NoData,
    Failed,
}

/// Regenerates forecasts for every active catalog item.
#[derive(Clone)]
pub struct BatchOrchestrator {
    pipeline: ForecastPipeline,
    catalog: Arc<dyn CatalogReader>,
    horizon_days: u32,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(
        pipeline: ForecastPipeline,
        catalog: Arc<dyn CatalogReader>,
        horizon_days: u32,
        concurrency: usize,
    ) -> Self {
        Self {
            pipeline,
            catalog,
            horizon_days,
            concurrency: concurrency.max(1),
        }
    }

    /// Per-item failures are logged and counted as skipped; only a failure to
    /// enumerate the catalog fails the whole run.
    #[instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> Result<BatchSummary, ServiceError> {
        let mut items = Vec::new();
        for item_type in ItemType::ALL {
            let ids = self.catalog.list_active_items(item_type).await?;
            items.extend(ids.into_iter().map(|id| ItemIdentity::new(item_type, id)));
        }

        let total = items.len();
        info!(
            total,
            concurrency = self.concurrency,
            "Starting batch forecast generation"
        );

        let outcomes: Vec<ItemOutcome> = stream::iter(items)
            .map(|item| self.process_item(item, today))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let processed = outcomes
            .iter()
            .filter(|o| **o == ItemOutcome::Processed)
            .count();
        let summary = BatchSummary {
            total,
            processed,
            skipped: total - processed,
        };

        counter!("forecast.batch.processed", summary.processed as u64);
        counter!("forecast.batch.skipped", summary.skipped as u64);
        info!(
            total = summary.total,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = outcomes.iter().filter(|o| **o == ItemOutcome::Failed).count(),
            "Batch forecast generation finished"
        );
        Ok(summary)
    }

    async fn process_item(&self, item: ItemIdentity, today: NaiveDate) -> ItemOutcome {
        match self.pipeline.run(item, self.horizon_days, today).await {
            Ok(result) if result.has_data() => ItemOutcome::Processed,
            Ok(_) => ItemOutcome::NoData,
            Err(e) => {
                warn!(
                    item = %item,
                    code = e.code(),
                    error = %e,
                    "Skipping item after forecast failure"
                );
                ItemOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::forecasting::calculator::DemandObservation;
    use crate::services::forecasting::catalog::MockCatalogReader;
    use crate::services::forecasting::history::MockDemandHistory;
    use crate::services::forecasting::store::MockForecastStore;
    use chrono::Duration;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn flat_history() -> Vec<DemandObservation> {
        (1..=10)
            .map(|i| DemandObservation::new(today() - Duration::days(i), 3))
            .collect()
    }

    fn catalog_with(
        products: Vec<Uuid>,
        consumables: Vec<Uuid>,
        filters: Vec<Uuid>,
    ) -> MockCatalogReader {
        let mut catalog = MockCatalogReader::new();
        catalog
            .expect_list_active_items()
            .returning(move |item_type| {
                Ok(match item_type {
                    ItemType::Product => products.clone(),
                    ItemType::Consumable => consumables.clone(),
                    ItemType::Filter => filters.clone(),
                })
            });
        catalog
    }

    fn orchestrator(
        history: MockDemandHistory,
        store: MockForecastStore,
        catalog: MockCatalogReader,
        concurrency: usize,
    ) -> BatchOrchestrator {
        let pipeline = ForecastPipeline::new(Arc::new(history), Arc::new(store), 90);
        BatchOrchestrator::new(pipeline, Arc::new(catalog), 30, concurrency)
    }

    #[tokio::test]
    async fn items_without_history_are_skipped() {
        let with_data = [Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3)];
        let catalog = catalog_with(
            vec![with_data[0], Uuid::from_u128(10)],
            vec![with_data[1]],
            vec![with_data[2], Uuid::from_u128(11)],
        );

        let mut history = MockDemandHistory::new();
        history
            .expect_read_historical_demand()
            .returning(move |item, _, _| {
                Ok(if with_data.contains(&item.item_id) {
                    flat_history()
                } else {
                    Vec::new()
                })
            });

        let mut store = MockForecastStore::new();
        store
            .expect_replace_forecast()
            .times(3)
            .returning(|_, result| Ok(result.forecasts.len()));

        let summary = orchestrator(history, store, catalog, 1)
            .run(today())
            .await
            .unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                total: 5,
                processed: 3,
                skipped: 2
            }
        );
    }

    #[tokio::test]
    async fn one_failing_item_does_not_abort_the_batch() {
        let broken = Uuid::from_u128(7);
        let catalog = catalog_with(
            vec![Uuid::from_u128(1), broken, Uuid::from_u128(9)],
            vec![],
            vec![Uuid::from_u128(4)],
        );

        let mut history = MockDemandHistory::new();
        history
            .expect_read_historical_demand()
            .returning(move |item, _, _| {
                if item.item_id == broken {
                    Err(ServiceError::SourceUnavailable("connection reset".into()))
                } else {
                    Ok(flat_history())
                }
            });

        let mut store = MockForecastStore::new();
        store
            .expect_replace_forecast()
            .returning(|item, result| {
                if item.item_type == ItemType::Filter {
                    Err(ServiceError::PersistenceError("deadlock".into()))
                } else {
                    Ok(result.forecasts.len())
                }
            });

        let summary = orchestrator(history, store, catalog, 1)
            .run(today())
            .await
            .unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn bounded_concurrency_counts_the_same() {
        let ids: Vec<Uuid> = (1..=12).map(Uuid::from_u128).collect();
        let catalog = catalog_with(ids, vec![], vec![]);

        let mut history = MockDemandHistory::new();
        history
            .expect_read_historical_demand()
            .returning(|item, _, _| {
                Ok(if item.item_id.as_u128() % 3 == 0 {
                    Vec::new()
                } else {
                    flat_history()
                })
            });

        let mut store = MockForecastStore::new();
        store
            .expect_replace_forecast()
            .returning(|_, result| Ok(result.forecasts.len()));

        let summary = orchestrator(history, store, catalog, 4)
            .run(today())
            .await
            .unwrap();
        assert_eq!(summary.total, 12);
        assert_eq!(summary.processed, 8);
        assert_eq!(summary.skipped, 4);
    }

    #[tokio::test]
    async fn empty_catalog_returns_zero_counts() {
        let catalog = catalog_with(vec![], vec![], vec![]);
        let summary = orchestrator(
            MockDemandHistory::new(),
            MockForecastStore::new(),
            catalog,
            1,
        )
        .run(today())
        .await
        .unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[tokio::test]
    async fn catalog_listing_failure_fails_the_run() {
        let mut catalog = MockCatalogReader::new();
        catalog
            .expect_list_active_items()
            .returning(|_| Err(ServiceError::SourceUnavailable("catalog offline".into())));

        let result = orchestrator(
            MockDemandHistory::new(),
            MockForecastStore::new(),
            catalog,
            1,
        )
        .run(today())
        .await;
        assert!(matches!(result, Err(ServiceError::SourceUnavailable(_))));
    }
}
