use std::sync::Arc;

use chrono::{Duration, Utc};
use inventory_forecast::{
    config::{AppConfig, ForecastConfig},
    db,
    entities::{consumable, filter, order, order_item, product},
    ForecastingService,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

/// Forecasting service backed by a migrated in-memory SQLite database.
pub struct TestHarness {
    pub db: Arc<DatabaseConnection>,
    pub service: ForecastingService,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_settings(ForecastConfig::default()).await
    }

    pub async fn with_settings(settings: ForecastConfig) -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        // A single pooled connection keeps the in-memory schema alive.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let service = ForecastingService::new(db.clone(), settings);
        Self { db, service }
    }

    pub async fn seed_product(&self, sku: &str, stock: i32, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            name: Set(format!("Product {sku}")),
            sku: Set(sku.to_string()),
            stock_quantity: Set(stock),
            is_active: Set(active),
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert product");
        id
    }

    pub async fn seed_consumable(&self, code: &str, on_hand: i32) -> Uuid {
        let id = Uuid::new_v4();
        consumable::ActiveModel {
            id: Set(id),
            name: Set(format!("Consumable {code}")),
            code: Set(code.to_string()),
            quantity_on_hand: Set(on_hand),
            is_active: Set(true),
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert consumable");
        id
    }

    pub async fn seed_filter(&self, code: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        filter::ActiveModel {
            id: Set(id),
            name: Set(format!("Filter {code}")),
            code: Set(code.to_string()),
            stock_level: Set(stock),
            is_active: Set(true),
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert filter");
        id
    }

    /// One order per day for the last `days` days, each with one line of `quantity`.
    pub async fn seed_daily_orders(&self, code: &str, days: i64, quantity: i32) {
        for days_ago in 1..=days {
            self.seed_order(code, days_ago, quantity, "completed").await;
        }
    }

    pub async fn seed_order(&self, code: &str, days_ago: i64, quantity: i32, status: &str) {
        let created_at = Utc::now() - Duration::days(days_ago);
        let order_id = Uuid::new_v4();
        order::ActiveModel {
            id: Set(order_id),
            order_number: Set(format!("ORD-{}", &order_id.simple().to_string()[..8])),
            status: Set(status.to_string()),
            created_at: Set(created_at),
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert order");

        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            sku: Set(code.to_string()),
            quantity: Set(quantity),
            created_at: Set(created_at),
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert order item");
    }
}
