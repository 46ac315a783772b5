use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkout::{CheckoutData, CheckoutState};
use crate::domain::cart::Cart;
use crate::domain::item::ItemSnapshot;

/// Stable chat identifier for one user's ongoing session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Serialized state of an in-progress multi-turn flow. Stored between turns
/// so the dialogue survives process restarts; currently only checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub step: CheckoutState,
    pub data: CheckoutData,
}

/// Bound on the recency window. Ordinal references ("el 2") only ever reach
/// into this window, so it doubles as the dialogue memory horizon.
pub const RECENT_ITEMS_CAP: usize = 12;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Most recently shown last. Append order is the display order users
    /// count from when they say "el 2".
    pub recent_items: Vec<ItemSnapshot>,
    pub cart: Cart,
    pub pending_action: Option<PendingAction>,
}

impl ConversationContext {
    /// Records that an item was just presented to the user. Re-showing an
    /// item moves it to the back of the window rather than duplicating it,
    /// and the window never grows past [`RECENT_ITEMS_CAP`].
    pub fn push_recent(&mut self, snapshot: ItemSnapshot) {
        self.recent_items.retain(|existing| existing.id != snapshot.id);
        self.recent_items.push(snapshot);
        if self.recent_items.len() > RECENT_ITEMS_CAP {
            let overflow = self.recent_items.len() - RECENT_ITEMS_CAP;
            self.recent_items.drain(..overflow);
        }
    }

    /// Checkout completion and the explicit clear command reset the
    /// transaction state but keep the recency window, so references like
    /// "el 2" still resolve right after an order.
    pub fn clear_transaction_state(&mut self) {
        self.cart.clear();
        self.pending_action = None;
    }
}

#[derive(Debug, Error)]
pub enum ContextStoreError {
    #[error("context persistence failed: {0}")]
    Persistence(String),
}

/// Keyed per-conversation store. Handlers do whole-context read-modify-write;
/// the store itself never merges fields. The core assumes at most one
/// in-flight message per conversation id; hosts that allow concurrent
/// delivery must add per-conversation mutual exclusion on top.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Never fails with "not found": an unknown conversation id yields a
    /// fresh empty context.
    async fn get(&self, id: &ConversationId) -> Result<ConversationContext, ContextStoreError>;

    async fn put(
        &self,
        id: &ConversationId,
        context: ConversationContext,
    ) -> Result<(), ContextStoreError>;

    async fn clear_transaction_state(&self, id: &ConversationId)
        -> Result<(), ContextStoreError>;
}
