use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::item::{ItemId, ItemSnapshot};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub quantity: u32,
    pub snapshot: ItemSnapshot,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.snapshot.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("item `{0}` is not in the cart")]
    NotInCart(String),
    #[error("cannot remove {requested} units of `{item}`: only {held} in the cart")]
    RemoveExceedsHeld { item: String, requested: u32, held: u32 },
}

/// Cart value type. Invariant: no line is ever stored with quantity zero;
/// a delta that lands at or below zero evicts the line instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: BTreeMap<ItemId, CartLine>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, item_id: &ItemId) -> Option<&CartLine> {
        self.lines.get(item_id)
    }

    pub fn lines(&self) -> impl Iterator<Item = (&ItemId, &CartLine)> {
        self.lines.iter()
    }

    pub fn snapshots(&self) -> Vec<ItemSnapshot> {
        self.lines.values().map(|line| line.snapshot.clone()).collect()
    }

    /// Adds `delta` to the item's current quantity (zero if absent). A
    /// resulting quantity above zero upserts the line with the given
    /// snapshot; at or below zero the line is evicted. Returns the
    /// recomputed cart total.
    pub fn apply_delta(&mut self, item_id: &ItemId, delta: i64, snapshot: &ItemSnapshot) -> Decimal {
        let current = self.lines.get(item_id).map(|line| i64::from(line.quantity)).unwrap_or(0);
        let next = current + delta;
        if next > 0 {
            self.lines.insert(
                item_id.clone(),
                CartLine { quantity: next as u32, snapshot: snapshot.clone() },
            );
        } else {
            self.lines.remove(item_id);
        }
        self.total()
    }

    /// Removal of an explicit unit count. Asking for more units than held is
    /// a business-rule violation and leaves the cart untouched.
    pub fn remove_units(&mut self, item_id: &ItemId, quantity: u32) -> Result<Decimal, CartError> {
        let held = match self.lines.get(item_id) {
            Some(line) => line.quantity,
            None => return Err(CartError::NotInCart(item_id.0.clone())),
        };
        if quantity > held {
            return Err(CartError::RemoveExceedsHeld {
                item: item_id.0.clone(),
                requested: quantity,
                held,
            });
        }
        let snapshot = self.lines[item_id].snapshot.clone();
        Ok(self.apply_delta(item_id, -i64::from(quantity), &snapshot))
    }

    pub fn remove_item(&mut self, item_id: &ItemId) -> Result<Decimal, CartError> {
        if self.lines.remove(item_id).is_none() {
            return Err(CartError::NotInCart(item_id.0.clone()));
        }
        Ok(self.total())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Total is always recomputed from the lines, never cached.
    pub fn total(&self) -> Decimal {
        self.lines.values().map(CartLine::line_total).sum()
    }
}
