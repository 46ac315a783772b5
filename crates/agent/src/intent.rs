use serde::{Deserialize, Serialize};

/// Upper bound on a single classified quantity. Anything above this is a
/// hallucinated number, not a storefront order.
const MAX_QUANTITY: u32 = 999;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Greeting,
    ProductSearch,
    ProductDetail,
    CartUpdate,
    CartView,
    CartClear,
    CheckoutStart,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartOpAction {
    Add,
    Remove,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartOp {
    pub action: CartOpAction,
    pub item_reference: String,
    /// `None` on a removal means "the whole line". `None` on an add
    /// defaults to one unit.
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Structured output of the external classifier. Untrusted until it has
/// passed through [`ClassifiedIntent::sanitized`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    #[serde(default)]
    pub kind: IntentKind,
    #[serde(default)]
    pub search_terms: Option<String>,
    #[serde(default)]
    pub item_reference: Option<String>,
    #[serde(default)]
    pub cart_ops: Vec<CartOp>,
}

impl ClassifiedIntent {
    /// Bounds every field of the classifier suggestion: blank references
    /// and search terms are discarded, zero quantities collapse to "whole
    /// line" / "one unit" semantics, and absurd quantities are capped.
    pub fn sanitized(mut self) -> Self {
        self.search_terms = self.search_terms.and_then(non_blank);
        self.item_reference = self.item_reference.and_then(non_blank);
        self.cart_ops.retain(|op| !op.item_reference.trim().is_empty());
        for op in &mut self.cart_ops {
            op.item_reference = op.item_reference.trim().to_string();
            op.quantity = match op.quantity {
                Some(0) | None => None,
                Some(quantity) => Some(quantity.min(MAX_QUANTITY)),
            };
        }
        self
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
