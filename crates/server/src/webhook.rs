use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use vendo_agent::{IntentClassifier, Orchestrator, OutboundResponse};
use vendo_core::context::ConversationId;

use crate::bootstrap::Application;

#[derive(Clone)]
pub struct WebhookState {
    pub orchestrator: Arc<Orchestrator>,
    pub classifier: Arc<dyn IntentClassifier>,
}

/// One inbound chat message, as delivered by the messaging gateway.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub conversation_id: String,
    pub text: String,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/webhook", post(handle)).with_state(state)
}

pub async fn serve(app: Application) -> std::io::Result<()> {
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.webhook.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "webhook endpoint started"
    );

    let state = WebhookState {
        orchestrator: app.orchestrator.clone(),
        classifier: app.classifier.clone(),
    };
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

pub async fn handle(
    State(state): State<WebhookState>,
    Json(message): Json<InboundMessage>,
) -> (StatusCode, Json<OutboundResponse>) {
    if message.text.trim().is_empty() || message.conversation_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(OutboundResponse::Messages {
                messages: vec!["No he recibido ningún mensaje.".to_string()],
            }),
        );
    }

    let conversation_id = ConversationId(message.conversation_id);
    // No per-conversation transcript is stored, so the history window is
    // empty; see the IntentClassifier contract.
    let intent = match state.classifier.classify(&message.text, &[]).await {
        Ok(intent) => Some(intent),
        Err(error) => {
            // Survivable: the orchestrator answers conversationally, and a
            // pending checkout still consumes the turn.
            warn!(
                event_name = "webhook.classifier_failed",
                conversation_id = %conversation_id.0,
                error = %error,
                "intent classification failed"
            );
            None
        }
    };

    let response =
        state.orchestrator.handle_message(&conversation_id, &message.text, intent).await;
    (StatusCode::OK, Json(response))
}
