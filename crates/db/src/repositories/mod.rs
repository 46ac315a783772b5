use async_trait::async_trait;
use thiserror::Error;

use vendo_core::domain::customer::{Customer, CustomerDraft};
use vendo_core::domain::item::{ItemId, ItemSnapshot};
use vendo_core::domain::order::Order;

pub mod catalog;
pub mod context;
pub mod customer;
pub mod memory;
pub mod order;

pub use catalog::SqlCatalogRepository;
pub use context::SqlContextStore;
pub use customer::SqlCustomerRepository;
pub use memory::{
    InMemoryCatalogRepository, InMemoryContextStore, InMemoryCustomerRepository,
    InMemoryOrderRepository,
};
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_by_id(&self, id: &ItemId) -> Result<Option<ItemSnapshot>, RepositoryError>;

    /// Keyword fallback for browse intents. The production deployment backs
    /// this with a semantic index; the SQL implementation is LIKE-based.
    async fn search(&self, terms: &str, limit: u32) -> Result<Vec<ItemSnapshot>, RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError>;
    async fn create_or_update(&self, draft: &CustomerDraft) -> Result<Customer, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError>;
}
