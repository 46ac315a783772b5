use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerDraft;

/// Checkout data-collection steps. The value is persisted between turns as
/// part of the conversation's pending action, so the dialogue survives
/// restarts; there is no call-stack-resident flow state anywhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutState {
    AskIfRecurrent,
    GetRecurrentEmail,
    ConfirmRecurrentData,
    CollectName,
    CollectEmail,
    CollectPhone,
    CollectAddress,
}

/// Customer fields accumulated as the flow progresses. A returning
/// customer's record pre-fills all four; a carried-forward email lets the
/// new-customer branch skip re-asking it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutData {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CheckoutData {
    /// All four fields collected. Finalization refuses to run without this.
    pub fn into_draft(self) -> Option<CustomerDraft> {
        Some(CustomerDraft {
            name: self.name?,
            email: self.email?,
            phone: self.phone?,
            address: self.address?,
        })
    }
}

/// Side effects a transition asks the orchestrator to perform. The engine
/// itself stays pure; the customer lookup result feeds back in through
/// [`super::CheckoutEngine::apply_customer_lookup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutSideEffect {
    LookupCustomer { email: String },
    Finalize,
}

/// Result of feeding one user turn (or one lookup result) to the machine.
/// `next == None` means the data-collection sequence is complete and
/// `side_effect` carries the finalization request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub next: Option<CheckoutState>,
    pub data: CheckoutData,
    pub replies: Vec<String>,
    pub side_effect: Option<CheckoutSideEffect>,
}
