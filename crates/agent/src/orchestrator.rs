use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use vendo_core::checkout::{CheckoutEngine, CheckoutSideEffect, StepOutcome};
use vendo_core::context::{ContextStore, ConversationContext, ConversationId, PendingAction};
use vendo_core::domain::cart::CartError;
use vendo_core::domain::item::{ItemId, ItemSnapshot};
use vendo_core::domain::order::Order;
use vendo_core::errors::ApplicationError;
use vendo_core::resolver::{ReferenceResolver, ResolvedReference};
use vendo_db::repositories::{CatalogRepository, CustomerRepository, OrderRepository};

use crate::intent::{CartOp, CartOpAction, ClassifiedIntent, IntentKind};
use crate::notify::NotificationDispatcher;

const SEARCH_LIMIT: u32 = 5;

/// What the delivery layer renders back to the user: either plain text
/// messages or a single item card with media.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundResponse {
    Messages { messages: Vec<String> },
    ItemWithMedia { item_id: ItemId, caption: String, extra: Vec<String> },
}

impl OutboundResponse {
    fn text(message: impl Into<String>) -> Self {
        Self::Messages { messages: vec![message.into()] }
    }
}

/// Composes the externally classified intent with the context store, the
/// reference resolver, the cart engine, and the checkout state machine.
/// This is the only component that creates, updates, or clears contexts,
/// and the sole writer of the recency window.
pub struct Orchestrator {
    store: Arc<dyn ContextStore>,
    catalog: Arc<dyn CatalogRepository>,
    customers: Arc<dyn CustomerRepository>,
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<dyn NotificationDispatcher>,
    resolver: ReferenceResolver,
    checkout: CheckoutEngine,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ContextStore>,
        catalog: Arc<dyn CatalogRepository>,
        customers: Arc<dyn CustomerRepository>,
        orders: Arc<dyn OrderRepository>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            catalog,
            customers,
            orders,
            notifier,
            resolver: ReferenceResolver::new(),
            checkout: CheckoutEngine::new(),
        }
    }

    /// Handles one inbound message. `intent` is `None` when the classifier
    /// call failed; a pending checkout still consumes the turn in that case,
    /// otherwise the user gets a generic conversational fallback.
    pub async fn handle_message(
        &self,
        conversation_id: &ConversationId,
        raw_text: &str,
        intent: Option<ClassifiedIntent>,
    ) -> OutboundResponse {
        let context = match self.store.get(conversation_id).await {
            Ok(context) => context,
            Err(source) => {
                return self.failure_response(
                    ApplicationError::Persistence(source.to_string()),
                    conversation_id,
                );
            }
        };

        if context.pending_action.is_some() && !looks_like_interruption(raw_text) {
            return self.checkout_turn(conversation_id, raw_text, context).await;
        }

        let Some(intent) = intent.map(ClassifiedIntent::sanitized) else {
            return OutboundResponse::text(
                "Ahora mismo no puedo entenderte bien. ¿Puedes repetirlo con otras palabras?",
            );
        };

        info!(
            event_name = "orchestrator.intent_dispatched",
            conversation_id = %conversation_id.0,
            kind = ?intent.kind,
            "dispatching classified intent"
        );

        match intent.kind {
            IntentKind::Greeting => OutboundResponse::text(
                "¡Hola! Soy el asistente de la tienda. Puedo buscar productos, \
                 gestionar tu carrito y tramitar tu pedido.",
            ),
            IntentKind::ProductSearch => {
                self.product_search(conversation_id, raw_text, &intent, context).await
            }
            IntentKind::ProductDetail => {
                self.product_detail(conversation_id, raw_text, &intent, context).await
            }
            IntentKind::CartUpdate => {
                self.cart_update(conversation_id, &intent.cart_ops, context).await
            }
            IntentKind::CartView => OutboundResponse::Messages { messages: render_cart(&context) },
            IntentKind::CartClear => self.cart_clear(conversation_id, context).await,
            IntentKind::CheckoutStart => self.checkout_start(conversation_id, context).await,
            IntentKind::Unknown => OutboundResponse::text(
                "Puedo ayudarte a buscar productos, gestionar tu carrito y tramitar tu pedido. \
                 ¿Qué necesitas?",
            ),
        }
    }

    async fn product_search(
        &self,
        conversation_id: &ConversationId,
        raw_text: &str,
        intent: &ClassifiedIntent,
        mut context: ConversationContext,
    ) -> OutboundResponse {
        let terms =
            intent.search_terms.clone().unwrap_or_else(|| raw_text.trim().to_string());

        let results = match self.catalog.search(&terms, SEARCH_LIMIT).await {
            Ok(results) => results,
            Err(source) => {
                return self.failure_response(
                    ApplicationError::Integration(source.to_string()),
                    conversation_id,
                );
            }
        };

        if results.is_empty() {
            return OutboundResponse::text(format!(
                "No encontré productos para \"{terms}\". ¿Buscamos otra cosa?"
            ));
        }

        for item in &results {
            context.push_recent(item.clone());
        }
        let listing = render_listing(&context, &results);
        if let Err(application_error) = self.persist(conversation_id, context).await {
            return self.failure_response(application_error, conversation_id);
        }

        let mut messages = vec!["Esto es lo que tenemos:".to_string()];
        messages.extend(listing);
        messages.push("Dime el número o el nombre del que te interese.".to_string());
        OutboundResponse::Messages { messages }
    }

    async fn product_detail(
        &self,
        conversation_id: &ConversationId,
        raw_text: &str,
        intent: &ClassifiedIntent,
        mut context: ConversationContext,
    ) -> OutboundResponse {
        let reference =
            intent.item_reference.clone().unwrap_or_else(|| raw_text.trim().to_string());

        let snapshot = match self.snapshot_for_reference(&context, &reference).await {
            Ok(snapshot) => snapshot,
            Err(application_error) => {
                return self.failure_response(application_error, conversation_id)
            }
        };

        let Some(item) = snapshot else {
            return OutboundResponse::text(format!(
                "No sé a qué producto te refieres con «{reference}». \
                 Dime el número de la lista o su nombre."
            ));
        };

        context.push_recent(item.clone());
        if let Err(application_error) = self.persist(conversation_id, context).await {
            return self.failure_response(application_error, conversation_id);
        }

        OutboundResponse::ItemWithMedia {
            caption: format!(
                "{} ({}) — {}",
                item.name,
                item.brand,
                format_price(item.unit_price)
            ),
            extra: vec!["¿Quieres que lo añada al carrito?".to_string()],
            item_id: item.id,
        }
    }

    async fn cart_update(
        &self,
        conversation_id: &ConversationId,
        cart_ops: &[CartOp],
        mut context: ConversationContext,
    ) -> OutboundResponse {
        if cart_ops.is_empty() {
            return OutboundResponse::text(
                "No me queda claro qué quieres cambiar del carrito. \
                 Dime el producto y la cantidad.",
            );
        }

        let mut messages = Vec::new();
        for op in cart_ops {
            let line = match op.action {
                CartOpAction::Add => {
                    match self.apply_add(&mut context, op, conversation_id).await {
                        Ok(line) => line,
                        Err(application_error) => {
                            return self.failure_response(application_error, conversation_id)
                        }
                    }
                }
                CartOpAction::Remove => self.apply_remove(&mut context, op),
            };
            messages.push(line);
        }
        messages.push(format!("Total del carrito: {}", format_price(context.cart.total())));

        if let Err(application_error) = self.persist(conversation_id, context).await {
            return self.failure_response(application_error, conversation_id);
        }
        OutboundResponse::Messages { messages }
    }

    async fn apply_add(
        &self,
        context: &mut ConversationContext,
        op: &CartOp,
        conversation_id: &ConversationId,
    ) -> Result<String, ApplicationError> {
        let snapshot = self.snapshot_for_reference(context, &op.item_reference).await?;
        let Some(item) = snapshot else {
            info!(
                event_name = "orchestrator.reference_unresolved",
                conversation_id = %conversation_id.0,
                reference = %op.item_reference,
                "add reference did not resolve"
            );
            return Ok(format!(
                "No sé a qué producto te refieres con «{}».",
                op.item_reference
            ));
        };

        let quantity = op.quantity.unwrap_or(1);
        context.cart.apply_delta(&item.id, i64::from(quantity), &item);
        Ok(format!("Añadido: {quantity} × {}.", item.name))
    }

    /// Removal resolves first against what the user actually holds, then
    /// falls back to the recency window, so "quita eso" prefers a cart item
    /// over something merely shown.
    fn apply_remove(&self, context: &mut ConversationContext, op: &CartOp) -> String {
        let cart_candidates: Vec<ItemSnapshot> = context
            .recent_items
            .iter()
            .filter(|item| context.cart.line(&item.id).is_some())
            .cloned()
            .collect();
        let cart_candidates = if cart_candidates.is_empty() {
            context.cart.snapshots()
        } else {
            cart_candidates
        };

        let resolved = match self.resolver.resolve(&op.item_reference, &cart_candidates) {
            ResolvedReference::Item(id) => Some(id),
            ResolvedReference::Unresolved => {
                match self.resolver.resolve(&op.item_reference, &context.recent_items) {
                    ResolvedReference::Item(id) => Some(id),
                    ResolvedReference::Unresolved => None,
                }
            }
        };

        let Some(item_id) = resolved else {
            return format!("No sé a qué producto te refieres con «{}».", op.item_reference);
        };
        let display_name = context
            .cart
            .line(&item_id)
            .map(|line| line.snapshot.name.clone())
            .or_else(|| {
                context
                    .recent_items
                    .iter()
                    .find(|item| item.id == item_id)
                    .map(|item| item.name.clone())
            })
            .unwrap_or_else(|| item_id.0.clone());

        let result = match op.quantity {
            Some(quantity) => context.cart.remove_units(&item_id, quantity).map(|_| {
                format!("Quitadas {quantity} unidades de {display_name}.")
            }),
            None => {
                context.cart.remove_item(&item_id).map(|_| format!("Quitado: {display_name}."))
            }
        };

        match result {
            Ok(line) => line,
            Err(CartError::NotInCart(_)) => {
                format!("«{display_name}» no está en tu carrito.")
            }
            Err(CartError::RemoveExceedsHeld { requested, held, .. }) => format!(
                "No puedo quitar {requested} unidades de {display_name}: \
                 solo hay {held} en el carrito."
            ),
        }
    }

    async fn cart_clear(
        &self,
        conversation_id: &ConversationId,
        mut context: ConversationContext,
    ) -> OutboundResponse {
        context.clear_transaction_state();
        if let Err(application_error) = self.persist(conversation_id, context).await {
            return self.failure_response(application_error, conversation_id);
        }
        OutboundResponse::text("He vaciado tu carrito.")
    }

    async fn checkout_start(
        &self,
        conversation_id: &ConversationId,
        mut context: ConversationContext,
    ) -> OutboundResponse {
        if context.cart.is_empty() {
            return OutboundResponse::text(
                "Tu carrito está vacío. Añade algún producto antes de tramitar el pedido.",
            );
        }

        context.pending_action = Some(PendingAction {
            step: self.checkout.initial_state(),
            data: Default::default(),
        });
        let opening = self.checkout.opening_prompt();
        let mut messages = render_cart(&context);
        messages.push(opening);

        if let Err(application_error) = self.persist(conversation_id, context).await {
            return self.failure_response(application_error, conversation_id);
        }
        OutboundResponse::Messages { messages }
    }

    async fn checkout_turn(
        &self,
        conversation_id: &ConversationId,
        input: &str,
        mut context: ConversationContext,
    ) -> OutboundResponse {
        let Some(pending) = context.pending_action.clone() else {
            return OutboundResponse::text("No hay ningún pedido en curso.");
        };

        let mut outcome = self.checkout.step(&pending.step, input, &pending.data);

        if let Some(CheckoutSideEffect::LookupCustomer { email }) = outcome.side_effect.clone() {
            let found = match self.customers.find_by_email(&email).await {
                Ok(found) => found,
                Err(source) => {
                    // State is left untouched so the user can retry the turn.
                    return self.failure_response(
                        ApplicationError::Persistence(source.to_string()),
                        conversation_id,
                    );
                }
            };
            outcome = self.checkout.apply_customer_lookup(&email, found.as_ref(), &outcome.data);
        }

        if outcome.side_effect == Some(CheckoutSideEffect::Finalize) {
            return self.finalize(conversation_id, context, outcome).await;
        }

        context.pending_action = outcome
            .next
            .map(|step| PendingAction { step, data: outcome.data });
        if let Err(application_error) = self.persist(conversation_id, context).await {
            return self.failure_response(application_error, conversation_id);
        }
        OutboundResponse::Messages { messages: outcome.replies }
    }

    async fn finalize(
        &self,
        conversation_id: &ConversationId,
        mut context: ConversationContext,
        outcome: StepOutcome,
    ) -> OutboundResponse {
        if context.cart.is_empty() {
            // The cart emptied mid-flow; abort instead of creating a
            // partial order.
            warn!(
                event_name = "orchestrator.checkout_aborted_empty_cart",
                conversation_id = %conversation_id.0,
                "checkout reached finalization with an empty cart"
            );
            context.pending_action = None;
            if let Err(application_error) = self.persist(conversation_id, context).await {
                return self.failure_response(application_error, conversation_id);
            }
            return OutboundResponse::text(
                "Tu carrito quedó vacío, así que he cancelado el pedido. \
                 Añade productos y vuelve a intentarlo cuando quieras.",
            );
        }

        let Some(draft) = outcome.data.into_draft() else {
            error!(
                event_name = "orchestrator.checkout_incomplete_data",
                conversation_id = %conversation_id.0,
                "finalization reached with missing customer fields"
            );
            context.pending_action = None;
            if let Err(application_error) = self.persist(conversation_id, context).await {
                return self.failure_response(application_error, conversation_id);
            }
            return self.failure_response(
                ApplicationError::Domain(
                    vendo_core::errors::DomainError::InvariantViolation(
                        "checkout finalized with incomplete customer data".to_string(),
                    ),
                ),
                conversation_id,
            );
        };

        let customer = match self.customers.create_or_update(&draft).await {
            Ok(customer) => customer,
            Err(source) => {
                return self.failure_response(
                    ApplicationError::Persistence(source.to_string()),
                    conversation_id,
                );
            }
        };

        let order = Order::from_cart(customer.id.clone(), &context.cart);
        if let Err(source) = self.orders.create(&order).await {
            return self.failure_response(
                ApplicationError::Persistence(source.to_string()),
                conversation_id,
            );
        }

        let summary = render_order_summary(&order);
        context.clear_transaction_state();
        if let Err(application_error) = self.persist(conversation_id, context.clone()).await {
            // The order exists; a stale context is recoverable, so log and
            // still confirm to the user.
            error!(
                event_name = "orchestrator.context_clear_failed",
                conversation_id = %conversation_id.0,
                error = %application_error,
                "could not clear context after order creation"
            );
        }

        info!(
            event_name = "orchestrator.order_created",
            conversation_id = %conversation_id.0,
            order_id = %order.id.0,
            total = %order.total,
            "order created from checkout flow"
        );

        let notifier = Arc::clone(&self.notifier);
        let notify_order = order.clone();
        let notify_email = customer.email.clone();
        tokio::spawn(async move {
            if let Err(notify_error) =
                notifier.order_invoice(&notify_order, &notify_email).await
            {
                warn!(
                    event_name = "orchestrator.invoice_notification_failed",
                    order_id = %notify_order.id.0,
                    error = %notify_error,
                    "invoice notification failed; order is unaffected"
                );
            }
        });

        let mut messages = vec![format!("¡Pedido confirmado, {}!", customer.name)];
        messages.extend(summary);
        messages.push(format!("Te enviaremos la factura a {}.", customer.email));
        OutboundResponse::Messages { messages }
    }

    /// Window resolution first; a miss falls back to the catalog, by exact
    /// id and then by search, so an explicit product name works even with a
    /// cold window.
    async fn snapshot_for_reference(
        &self,
        context: &ConversationContext,
        reference: &str,
    ) -> Result<Option<ItemSnapshot>, ApplicationError> {
        if let ResolvedReference::Item(id) =
            self.resolver.resolve(reference, &context.recent_items)
        {
            return Ok(context.recent_items.iter().find(|item| item.id == id).cloned());
        }
        let reference = reference.trim();
        if let Some(item) = self
            .catalog
            .find_by_id(&ItemId(reference.to_string()))
            .await
            .map_err(|source| ApplicationError::Integration(source.to_string()))?
        {
            return Ok(Some(item));
        }
        let matches = self
            .catalog
            .search(reference, 1)
            .await
            .map_err(|source| ApplicationError::Integration(source.to_string()))?;
        Ok(matches.into_iter().next())
    }

    async fn persist(
        &self,
        conversation_id: &ConversationId,
        context: ConversationContext,
    ) -> Result<(), ApplicationError> {
        self.store
            .put(conversation_id, context)
            .await
            .map_err(|source| ApplicationError::Persistence(source.to_string()))
    }

    fn failure_response(
        &self,
        application_error: ApplicationError,
        conversation_id: &ConversationId,
    ) -> OutboundResponse {
        let interface = application_error.into_interface(conversation_id.0.clone());
        error!(
            event_name = "orchestrator.turn_failed",
            conversation_id = %conversation_id.0,
            error = %interface,
            "turn ended in a collaborator failure"
        );
        OutboundResponse::text(interface.user_message())
    }
}

/// Advisory check applied before feeding input to the checkout machine: a
/// command marker, a question mark, or a leading interrogative word means
/// the message is answered by general intent handling instead.
pub fn looks_like_interruption(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.starts_with('/') || trimmed.starts_with('!') {
        return true;
    }
    if trimmed.contains('?') || trimmed.contains('¿') {
        return true;
    }
    let first_word: String = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .map(|character| match character.to_lowercase().next().unwrap_or(character) {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            lowered => lowered,
        })
        .collect();
    matches!(
        first_word.as_str(),
        "que" | "cual" | "cuales" | "cuanto" | "cuanta" | "cuantos" | "cuantas" | "como"
            | "donde" | "cuando" | "quien" | "quienes"
    )
}

fn render_listing(context: &ConversationContext, results: &[ItemSnapshot]) -> Vec<String> {
    results
        .iter()
        .filter_map(|item| {
            context
                .recent_items
                .iter()
                .position(|recent| recent.id == item.id)
                .map(|position| {
                    format!(
                        "{}. {} ({}) — {}",
                        position + 1,
                        item.name,
                        item.brand,
                        format_price(item.unit_price)
                    )
                })
        })
        .collect()
}

fn render_cart(context: &ConversationContext) -> Vec<String> {
    if context.cart.is_empty() {
        return vec!["Tu carrito está vacío.".to_string()];
    }
    let mut messages: Vec<String> = context
        .cart
        .lines()
        .map(|(_, line)| {
            format!(
                "{} × {} — {}",
                line.quantity,
                line.snapshot.name,
                format_price(line.line_total())
            )
        })
        .collect();
    messages.push(format!("Total: {}", format_price(context.cart.total())));
    messages
}

fn render_order_summary(order: &Order) -> Vec<String> {
    let mut messages: Vec<String> = order
        .lines
        .iter()
        .map(|line| {
            format!(
                "{} × {} — {}",
                line.quantity,
                line.name,
                format_price(line.unit_price * Decimal::from(line.quantity))
            )
        })
        .collect();
    messages.push(format!("Total del pedido: {}", format_price(order.total)));
    messages
}

fn format_price(amount: Decimal) -> String {
    format!("{} €", amount.round_dp(2))
}
