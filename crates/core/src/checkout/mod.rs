pub mod engine;
pub mod states;

pub use engine::CheckoutEngine;
pub use states::{CheckoutData, CheckoutSideEffect, CheckoutState, StepOutcome};
