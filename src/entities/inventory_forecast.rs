use super::item_type::{ItemIdentity, ItemType};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One projected day of demand for one catalog item.
///
/// Rows for an item are only ever written as a complete set by
/// `ForecastStore::replace_forecast`; `(item_type, item_id, forecast_date)` is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_forecasts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub forecast_date: NaiveDate,
    pub predicted_demand: i32,
    pub confidence_level: f64,
    /// Serialized `ForecastFactors` shared by every row of the run
    pub factors: Json,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn identity(&self) -> ItemIdentity {
        ItemIdentity::new(self.item_type, self.item_id)
    }
}
