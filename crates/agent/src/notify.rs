use anyhow::Result;
use async_trait::async_trait;

use vendo_core::domain::order::Order;

/// Outbound invoice notification. Dispatched fire-and-forget after an order
/// is created: a failure is logged and never rolls back the order or the
/// user-visible confirmation.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn order_invoice(&self, order: &Order, customer_email: &str) -> Result<()>;
}
