use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::customer::CustomerId;
use crate::domain::item::ItemId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Freezes the cart contents into an order. The caller is responsible
    /// for rejecting empty carts before getting here.
    pub fn from_cart(customer_id: CustomerId, cart: &Cart) -> Self {
        let lines = cart
            .lines()
            .map(|(item_id, line)| OrderLine {
                item_id: item_id.clone(),
                name: line.snapshot.name.clone(),
                quantity: line.quantity,
                unit_price: line.snapshot.unit_price,
            })
            .collect();
        Self {
            id: OrderId(Uuid::new_v4()),
            customer_id,
            lines,
            total: cart.total(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::domain::cart::Cart;
    use crate::domain::customer::CustomerId;
    use crate::domain::item::{ItemId, ItemSnapshot};

    use super::Order;

    #[test]
    fn order_freezes_cart_lines_and_total() {
        let mut cart = Cart::default();
        let snapshot = ItemSnapshot {
            id: ItemId("SKU1".to_string()),
            name: "Martillo de carpintero".to_string(),
            brand: "Bellota".to_string(),
            unit_price: Decimal::new(1_250, 2),
            category: "herramientas".to_string(),
        };
        cart.apply_delta(&snapshot.id, 2, &snapshot);

        let order = Order::from_cart(CustomerId(Uuid::new_v4()), &cart);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(order.total, Decimal::new(2_500, 2));
    }
}
