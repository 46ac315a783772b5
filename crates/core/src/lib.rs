pub mod checkout;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod resolver;

pub use checkout::{
    CheckoutData, CheckoutEngine, CheckoutSideEffect, CheckoutState, StepOutcome,
};
pub use context::{ContextStore, ContextStoreError, ConversationContext, ConversationId, PendingAction};
pub use domain::cart::{Cart, CartError, CartLine};
pub use domain::customer::{Customer, CustomerDraft, CustomerId};
pub use domain::item::{ItemId, ItemSnapshot};
pub use domain::order::{Order, OrderId, OrderLine};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use resolver::{ReferenceResolver, ResolvedReference};
