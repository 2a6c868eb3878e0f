use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use zapdash_core::{NativeChat, NativeContact, NativeMessage};

use crate::error::{EvolutionError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one Evolution API instance.
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub base_url: String,
    pub api_key: String,
    pub instance: String,
}

/// Filters accepted by the gateway's findMessages query.
#[derive(Debug, Clone, Default)]
pub struct FindMessagesParams {
    pub remote_jid: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Connection state of the WhatsApp instance as the gateway reports it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionState {
    pub state: String,
}

/// HTTP client for the Evolution API. The apikey header rides on every
/// request; instance name is baked into each route.
pub struct EvolutionClient {
    http: reqwest::Client,
    base_url: String,
    instance: String,
}

impl EvolutionClient {
    pub fn new(config: &EvolutionConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(EvolutionError::Config("EVOLUTION_API_URL vazio".to_string()));
        }

        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| EvolutionError::Config("EVOLUTION_API_TOKEN inválido".to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert("apikey", api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            instance: config.instance.clone(),
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub async fn send_text_message(&self, number: &str, text: &str) -> Result<NativeMessage> {
        let body = json!({ "number": number, "text": text });
        let value = self
            .post_json(&format!("/message/sendText/{}", self.instance), &body)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn find_messages(&self, params: &FindMessagesParams) -> Result<Vec<NativeMessage>> {
        let mut body = json!({
            "page": params.page.unwrap_or(1),
            "limit": params.limit.unwrap_or(100),
        });
        if let Some(remote_jid) = params.remote_jid.as_deref() {
            body["where"] = json!({ "key": { "remoteJid": remote_jid } });
        }

        let value = self
            .post_json(&format!("/chat/findMessages/{}", self.instance), &body)
            .await?;
        Ok(unwrap_records(value, "findMessages"))
    }

    pub async fn find_chats(&self, limit: u32) -> Result<Vec<NativeChat>> {
        let value = self
            .post_json(&format!("/chat/findChats/{}", self.instance), &json!({ "limit": limit }))
            .await?;
        Ok(unwrap_records(value, "findChats"))
    }

    pub async fn find_contacts(&self) -> Result<Vec<NativeContact>> {
        let value = self
            .post_json(&format!("/chat/findContacts/{}", self.instance), &json!({}))
            .await?;
        Ok(unwrap_records(value, "findContacts"))
    }

    pub async fn connection_state(&self) -> Result<ConnectionState> {
        let value = self
            .get_json(&format!("/instance/connectionState/{}", self.instance))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Healthy means the instance reports an open WhatsApp connection.
    /// Transport errors read as unhealthy rather than bubbling up.
    pub async fn health_check(&self) -> bool {
        match self.connection_state().await {
            Ok(state) => state.state == "open",
            Err(e) => {
                warn!("Evolution API indisponível: {e}");
                false
            }
        }
    }

    /// Point the gateway's webhook at a URL for the given event types.
    pub async fn set_webhook(&self, url: &str, events: &[&str]) -> Result<Value> {
        let body = json!({ "url": url, "events": events, "enabled": true });
        self.post_json(&format!("/webhook/set/{}", self.instance), &body)
            .await
    }

    pub async fn get_webhook(&self) -> Result<Value> {
        self.get_json(&format!("/webhook/find/{}", self.instance))
            .await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {url}");
        let response = self.http.post(&url).json(body).send().await?;
        Self::into_value(response).await
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {url}");
        let response = self.http.get(&url).send().await?;
        Self::into_value(response).await
    }

    async fn into_value(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvolutionError::Api { status: status.as_u16(), body });
        }
        Ok(response.json().await?)
    }
}

/// The gateway wraps list responses inconsistently across versions: a bare
/// array, `{"messages": [...]}` or `{"data": [...]}`. Anything else reads as
/// empty. Items that fail to deserialize are dropped with a warning instead
/// of failing the whole fetch.
fn unwrap_records<T: DeserializeOwned>(value: Value, operation: &str) -> Vec<T> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("messages") {
                items
            } else if let Some(Value::Array(items)) = map.remove("data") {
                items
            } else {
                warn!("Resposta de {operation} sem lista reconhecível");
                Vec::new()
            }
        }
        other => {
            warn!("Resposta inesperada de {operation}: {other}");
            Vec::new()
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Item descartado em {operation}: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_a_bare_array() {
        let value = json!([{ "key": { "id": "A" } }, { "key": { "id": "B" } }]);
        let messages: Vec<NativeMessage> = unwrap_records(value, "findMessages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].key.id, "A");
    }

    #[test]
    fn unwraps_a_messages_envelope() {
        let value = json!({ "messages": [{ "key": { "id": "A" } }] });
        let messages: Vec<NativeMessage> = unwrap_records(value, "findMessages");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn unwraps_a_data_envelope() {
        let value = json!({ "data": [{ "id": "5511999990001@s.whatsapp.net" }] });
        let contacts: Vec<NativeContact> = unwrap_records(value, "findContacts");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, "5511999990001@s.whatsapp.net");
    }

    #[test]
    fn unknown_envelopes_read_as_empty() {
        let value = json!({ "total": 0 });
        let messages: Vec<NativeMessage> = unwrap_records(value, "findMessages");
        assert!(messages.is_empty());

        let value = json!("nope");
        let messages: Vec<NativeMessage> = unwrap_records(value, "findMessages");
        assert!(messages.is_empty());
    }

    #[test]
    fn undecodable_items_are_dropped_not_fatal() {
        let value = json!([
            { "key": { "id": "A" } },
            { "key": "not-an-object" },
            { "key": { "id": "B" } },
        ]);
        let messages: Vec<NativeMessage> = unwrap_records(value, "findMessages");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn empty_base_url_is_a_config_error() {
        let config = EvolutionConfig {
            base_url: String::new(),
            api_key: "secret".to_string(),
            instance: "main".to_string(),
        };
        assert!(matches!(EvolutionClient::new(&config), Err(EvolutionError::Config(_))));
    }

    #[test]
    fn non_ascii_api_key_is_a_config_error() {
        let config = EvolutionConfig {
            base_url: "http://localhost:8080".to_string(),
            api_key: "chave\ncom-quebra".to_string(),
            instance: "main".to_string(),
        };
        assert!(matches!(EvolutionClient::new(&config), Err(EvolutionError::Config(_))));
    }
}
