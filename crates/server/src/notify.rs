use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use vendo_agent::NotificationDispatcher;
use vendo_core::domain::order::Order;

/// Stand-in dispatcher that records the invoice in the log. A deployment
/// with a mail provider swaps its own implementation in at bootstrap.
#[derive(Default)]
pub struct LoggingNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingNotificationDispatcher {
    async fn order_invoice(&self, order: &Order, customer_email: &str) -> Result<()> {
        info!(
            event_name = "notify.invoice_logged",
            order_id = %order.id.0,
            customer_email = %customer_email,
            total = %order.total,
            line_count = order.lines.len(),
            "invoice notification recorded"
        );
        Ok(())
    }
}
