use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

/// Immutable copy of the catalog fields captured at the moment an item was
/// shown or added. Cart lines hold snapshots, not live catalog rows, so a
/// later price change never alters an open cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub name: String,
    pub brand: String,
    pub unit_price: Decimal,
    pub category: String,
}
