use vendo_core::domain::order::Order;

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, customer_id, total, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(order.id.0.to_string())
        .bind(order.customer_id.0.to_string())
        .bind(order.total.to_string())
        .bind(order.created_at.to_rfc3339())
        .execute(&mut *transaction)
        .await?;

        for line in &order.lines {
            sqlx::query(
                "INSERT INTO order_lines (order_id, item_id, name, quantity, unit_price)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(order.id.0.to_string())
            .bind(&line.item_id.0)
            .bind(&line.name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.to_string())
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use sqlx::Row;

    use vendo_core::domain::cart::Cart;
    use vendo_core::domain::customer::{CustomerDraft, CustomerId};
    use vendo_core::domain::item::{ItemId, ItemSnapshot};
    use vendo_core::domain::order::Order;

    use crate::migrations::run_pending;
    use crate::test_pool;
    use crate::repositories::{
        CustomerRepository, OrderRepository, SqlCustomerRepository, SqlOrderRepository,
    };

    #[tokio::test]
    async fn persists_order_header_and_lines() {
        let pool = test_pool("sqlite::memory:").await;
        run_pending(&pool).await.expect("migrate");

        let customer = SqlCustomerRepository::new(pool.clone())
            .create_or_update(&CustomerDraft {
                name: "Ana Pérez".to_string(),
                email: "ana@example.com".to_string(),
                phone: "612345678".to_string(),
                address: "Calle Mayor 10, Madrid".to_string(),
            })
            .await
            .expect("customer");

        let snapshot = ItemSnapshot {
            id: ItemId("SKU1".to_string()),
            name: "Martillo de carpintero".to_string(),
            brand: "Bellota".to_string(),
            unit_price: Decimal::new(1_250, 2),
            category: "herramientas".to_string(),
        };
        let mut cart = Cart::default();
        cart.apply_delta(&snapshot.id, 2, &snapshot);
        let order = Order::from_cart(CustomerId(customer.id.0), &cart);

        SqlOrderRepository::new(pool.clone()).create(&order).await.expect("order saved");

        let line_count = sqlx::query("SELECT COUNT(*) AS count FROM order_lines")
            .fetch_one(&pool)
            .await
            .expect("count lines")
            .get::<i64, _>("count");
        assert_eq!(line_count, 1);

        let total = sqlx::query("SELECT total FROM orders")
            .fetch_one(&pool)
            .await
            .expect("order row")
            .get::<String, _>("total");
        assert_eq!(total, "25.00");
    }
}
