// Catalog collaborators
pub mod consumable;
pub mod filter;
pub mod product;

// Order history feeding the aggregator
pub mod order;
pub mod order_item;

// Forecast snapshot table
pub mod inventory_forecast;
pub mod item_type;

pub use item_type::{ItemIdentity, ItemType};
