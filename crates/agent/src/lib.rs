//! Conversation orchestration for the vendo storefront assistant.
//!
//! This crate sits between the chat transport and the core state engine:
//! - **Intent model** (`intent`) - structured classifier output + sanitization
//! - **Classifier trait** (`llm`) - pluggable LLM-backed intent classification
//! - **Orchestrator** (`orchestrator`) - routes each inbound message to the
//!   reference resolver, cart engine, or checkout state machine and owns all
//!   context reads/writes
//! - **Notifications** (`notify`) - fire-and-forget invoice dispatch
//!
//! # Safety principle
//!
//! The LLM is strictly a translator. Its output is an untrusted structured
//! suggestion: every quantity and item reference is bounded and validated
//! before any cart or checkout state is touched.

pub mod intent;
pub mod llm;
pub mod notify;
pub mod orchestrator;

pub use intent::{CartOp, CartOpAction, ClassifiedIntent, IntentKind};
pub use llm::IntentClassifier;
pub use notify::NotificationDispatcher;
pub use orchestrator::{Orchestrator, OutboundResponse};
