use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use vendo_agent::{ClassifiedIntent, IntentClassifier};
use vendo_core::config::LlmConfig;

/// The classifier prompt pins the model to translation duty: it maps the
/// message to an intent shape and copies the user's wording into references.
/// Resolving "ese martillo" to a concrete product happens in our code, never
/// in the model.
const SYSTEM_PROMPT: &str = "\
Eres el clasificador de intenciones de una tienda que atiende por chat en español. \
Responde únicamente con un objeto JSON con esta forma:\n\
{\"kind\": \"greeting|product_search|product_detail|cart_update|cart_view|cart_clear|checkout_start|unknown\", \
\"search_terms\": string|null, \"item_reference\": string|null, \
\"cart_ops\": [{\"action\": \"add|remove\", \"item_reference\": string, \"quantity\": number|null}]}\n\
Copia las palabras del usuario tal cual en item_reference (por ejemplo \"ese martillo\" o \"el 2\"); \
nunca lo sustituyas por un producto concreto. \
En una retirada, quantity null significa quitar la línea entera. \
Si no estás seguro, usa \"unknown\".";

pub struct OpenAiClassifier {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiClassifier {
    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client =
            Client::builder().timeout(Duration::from_secs(config.timeout_secs.max(1))).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl IntentClassifier for OpenAiClassifier {
    async fn classify(&self, text: &str, history: &[String]) -> Result<ClassifiedIntent> {
        let Some(api_key) = &self.api_key else {
            return Err(anyhow!("llm.api_key is not configured"));
        };

        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
        for turn in history {
            messages.push(json!({ "role": "user", "content": turn }));
        }
        messages.push(json!({ "role": "user", "content": text }));

        let body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": messages,
        });

        let completion: ChatCompletion = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("classifier request failed")?
            .error_for_status()
            .context("classifier returned an error status")?
            .json()
            .await
            .context("classifier response was not valid JSON")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("classifier returned no choices"))?;
        debug!(event_name = "classifier.response", content = %content, "classifier raw output");

        serde_json::from_str::<ClassifiedIntent>(&content)
            .context("classifier output did not match the intent schema")
    }
}

#[cfg(test)]
mod tests {
    use vendo_agent::IntentKind;
    use vendo_core::config::LlmConfig;

    use super::{ChatCompletion, OpenAiClassifier};

    #[test]
    fn builds_from_default_config_without_an_api_key() {
        let classifier = OpenAiClassifier::from_config(&LlmConfig {
            api_key: None,
            base_url: "https://api.openai.com/v1/".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        })
        .expect("client builds");
        assert_eq!(classifier.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn completion_content_parses_into_an_intent() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": "{\"kind\": \"cart_update\", \"cart_ops\": [{\"action\": \"add\", \"item_reference\": \"ese martillo\", \"quantity\": 2}]}"
                }
            }]
        }"#;
        let completion: ChatCompletion = serde_json::from_str(raw).expect("decode envelope");
        let intent: vendo_agent::ClassifiedIntent =
            serde_json::from_str(&completion.choices[0].message.content).expect("decode intent");

        assert_eq!(intent.kind, IntentKind::CartUpdate);
        assert_eq!(intent.cart_ops[0].item_reference, "ese martillo");
        assert_eq!(intent.cart_ops[0].quantity, Some(2));
    }
}
