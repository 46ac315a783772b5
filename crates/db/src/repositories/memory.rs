use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use vendo_core::context::{
    ContextStore, ContextStoreError, ConversationContext, ConversationId,
};
use vendo_core::domain::customer::{Customer, CustomerDraft, CustomerId};
use vendo_core::domain::item::{ItemId, ItemSnapshot};
use vendo_core::domain::order::Order;

use super::{CatalogRepository, CustomerRepository, OrderRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryContextStore {
    contexts: RwLock<HashMap<String, ConversationContext>>,
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get(&self, id: &ConversationId) -> Result<ConversationContext, ContextStoreError> {
        let contexts = self.contexts.read().await;
        Ok(contexts.get(&id.0).cloned().unwrap_or_default())
    }

    async fn put(
        &self,
        id: &ConversationId,
        context: ConversationContext,
    ) -> Result<(), ContextStoreError> {
        let mut contexts = self.contexts.write().await;
        contexts.insert(id.0.clone(), context);
        Ok(())
    }

    async fn clear_transaction_state(
        &self,
        id: &ConversationId,
    ) -> Result<(), ContextStoreError> {
        let mut contexts = self.contexts.write().await;
        if let Some(context) = contexts.get_mut(&id.0) {
            context.clear_transaction_state();
        }
        Ok(())
    }
}

pub struct InMemoryCatalogRepository {
    items: Vec<ItemSnapshot>,
}

impl InMemoryCatalogRepository {
    pub fn with_items(items: Vec<ItemSnapshot>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_by_id(&self, id: &ItemId) -> Result<Option<ItemSnapshot>, RepositoryError> {
        Ok(self.items.iter().find(|item| &item.id == id).cloned())
    }

    async fn search(&self, terms: &str, limit: u32) -> Result<Vec<ItemSnapshot>, RepositoryError> {
        let needle = terms.to_lowercase();
        Ok(self
            .items
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle)
                    || item.brand.to_lowercase().contains(&needle)
                    || item.category.to_lowercase().contains(&needle)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, Customer>>,
}

impl InMemoryCustomerRepository {
    pub async fn insert(&self, customer: Customer) {
        let mut customers = self.customers.write().await;
        customers.insert(customer.email.clone(), customer);
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.get(email).cloned())
    }

    async fn create_or_update(&self, draft: &CustomerDraft) -> Result<Customer, RepositoryError> {
        let mut customers = self.customers.write().await;
        let id = customers
            .get(&draft.email)
            .map(|existing| existing.id.clone())
            .unwrap_or_else(|| CustomerId(Uuid::new_v4()));
        let customer = Customer {
            id,
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            address: draft.address.clone(),
        };
        customers.insert(draft.email.clone(), customer.clone());
        Ok(customer)
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderRepository {
    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.push(order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use vendo_core::context::{ContextStore, ConversationContext, ConversationId};
    use vendo_core::domain::customer::CustomerDraft;
    use vendo_core::domain::item::{ItemId, ItemSnapshot};

    use super::{
        CatalogRepository, CustomerRepository, InMemoryCatalogRepository,
        InMemoryContextStore, InMemoryCustomerRepository,
    };

    fn item(id: &str, name: &str) -> ItemSnapshot {
        ItemSnapshot {
            id: ItemId(id.to_string()),
            name: name.to_string(),
            brand: "Acme".to_string(),
            unit_price: Decimal::new(100, 2),
            category: "tools".to_string(),
        }
    }

    #[tokio::test]
    async fn context_store_defaults_and_round_trips() {
        let store = InMemoryContextStore::default();
        let id = ConversationId("chat-1".to_string());

        assert_eq!(store.get(&id).await.expect("get"), ConversationContext::default());

        let mut context = ConversationContext::default();
        context.push_recent(item("SKU1", "Martillo"));
        store.put(&id, context.clone()).await.expect("put");
        assert_eq!(store.get(&id).await.expect("get"), context);
    }

    #[tokio::test]
    async fn catalog_search_filters_and_limits() {
        let repository = InMemoryCatalogRepository::with_items(vec![
            item("SKU1", "Martillo de bola"),
            item("SKU2", "Martillo de uña"),
            item("SKU3", "Taladro"),
        ]);

        let results = repository.search("martillo", 10).await.expect("search");
        assert_eq!(results.len(), 2);
        let limited = repository.search("martillo", 1).await.expect("search");
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn customer_upsert_preserves_id() {
        let repository = InMemoryCustomerRepository::default();
        let draft = CustomerDraft {
            name: "Ana Pérez".to_string(),
            email: "ana@example.com".to_string(),
            phone: "612345678".to_string(),
            address: "Calle Mayor 10, Madrid".to_string(),
        };

        let created = repository.create_or_update(&draft).await.expect("create");
        let updated = repository
            .create_or_update(&CustomerDraft { name: "Ana G.".to_string(), ..draft })
            .await
            .expect("update");
        assert_eq!(created.id, updated.id);
        assert_eq!(updated.name, "Ana G.");
    }
}
