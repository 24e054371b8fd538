use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog family an item belongs to.
///
/// Every per-type decision (source table, stock column, code column) is a
/// `match` on this enum, so table and column names never come from strings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ItemType {
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "consumable")]
    Consumable,
    #[sea_orm(string_value = "filter")]
    Filter,
}

impl ItemType {
    pub const ALL: [ItemType; 3] = [ItemType::Product, ItemType::Consumable, ItemType::Filter];

    /// Name of the catalog column holding on-hand stock, for log output.
    pub fn stock_field(&self) -> &'static str {
        match self {
            ItemType::Product => "stock_quantity",
            ItemType::Consumable => "quantity_on_hand",
            ItemType::Filter => "stock_level",
        }
    }
}

/// Key by which every forecast and alert is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemIdentity {
    pub item_type: ItemType,
    pub item_id: Uuid,
}

impl ItemIdentity {
    pub fn new(item_type: ItemType, item_id: Uuid) -> Self {
        Self { item_type, item_id }
    }
}

impl std::fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.item_type, self.item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(ItemType::from_str("product").unwrap(), ItemType::Product);
        assert_eq!(ItemType::from_str("Consumable").unwrap(), ItemType::Consumable);
        assert_eq!(ItemType::from_str("FILTER").unwrap(), ItemType::Filter);
        assert!(ItemType::from_str("widget").is_err());
    }

    #[test]
    fn displays_as_stored_value() {
        assert_eq!(ItemType::Consumable.to_string(), "consumable");
        let item = ItemIdentity::new(ItemType::Filter, Uuid::nil());
        assert_eq!(
            item.to_string(),
            "filter:00000000-0000-0000-0000-000000000000"
        );
    }
}
