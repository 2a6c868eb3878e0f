use async_trait::async_trait;

use zapdash_core::{NativeChat, NativeContact, NativeMessage};
use zapdash_evolution::{EvolutionClient, EvolutionError, FindMessagesParams};

/// The fetch/send surface of the messaging gateway as the engine sees it.
/// Keeping it a trait lets tests run the whole pipeline against canned data.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn find_messages(
        &self,
        params: &FindMessagesParams,
    ) -> Result<Vec<NativeMessage>, EvolutionError>;

    async fn find_chats(&self, limit: u32) -> Result<Vec<NativeChat>, EvolutionError>;

    async fn find_contacts(&self) -> Result<Vec<NativeContact>, EvolutionError>;

    async fn send_text(&self, number: &str, text: &str) -> Result<NativeMessage, EvolutionError>;
}

#[async_trait]
impl MessagingGateway for EvolutionClient {
    async fn find_messages(
        &self,
        params: &FindMessagesParams,
    ) -> Result<Vec<NativeMessage>, EvolutionError> {
        EvolutionClient::find_messages(self, params).await
    }

    async fn find_chats(&self, limit: u32) -> Result<Vec<NativeChat>, EvolutionError> {
        EvolutionClient::find_chats(self, limit).await
    }

    async fn find_contacts(&self) -> Result<Vec<NativeContact>, EvolutionError> {
        EvolutionClient::find_contacts(self).await
    }

    async fn send_text(&self, number: &str, text: &str) -> Result<NativeMessage, EvolutionError> {
        self.send_text_message(number, text).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Canned gateway for engine tests. Fetches serve the configured data;
    /// sends are recorded and echoed back with a fixed id.
    #[derive(Default)]
    pub struct FakeGateway {
        pub contacts: Vec<NativeContact>,
        pub chats: Vec<NativeChat>,
        pub messages: Vec<NativeMessage>,
        pub filtered: HashMap<String, Vec<NativeMessage>>,
        pub fail_fetches: bool,
        pub sent: Mutex<Vec<(String, String)>>,
        pub send_reply_id: Option<String>,
    }

    impl FakeGateway {
        fn offline() -> EvolutionError {
            EvolutionError::Api { status: 500, body: "offline".to_string() }
        }
    }

    #[async_trait]
    impl MessagingGateway for FakeGateway {
        async fn find_messages(
            &self,
            params: &FindMessagesParams,
        ) -> Result<Vec<NativeMessage>, EvolutionError> {
            if self.fail_fetches {
                return Err(Self::offline());
            }
            match params.remote_jid.as_deref() {
                Some(jid) => Ok(self.filtered.get(jid).cloned().unwrap_or_default()),
                None => {
                    let limit = params.limit.unwrap_or(100) as usize;
                    Ok(self.messages.iter().take(limit).cloned().collect())
                }
            }
        }

        async fn find_chats(&self, _limit: u32) -> Result<Vec<NativeChat>, EvolutionError> {
            if self.fail_fetches {
                return Err(Self::offline());
            }
            Ok(self.chats.clone())
        }

        async fn find_contacts(&self) -> Result<Vec<NativeContact>, EvolutionError> {
            if self.fail_fetches {
                return Err(Self::offline());
            }
            Ok(self.contacts.clone())
        }

        async fn send_text(
            &self,
            number: &str,
            text: &str,
        ) -> Result<NativeMessage, EvolutionError> {
            self.sent.lock().unwrap().push((number.to_string(), text.to_string()));
            let mut reply = NativeMessage::default();
            reply.key.remote_jid = number.to_string();
            reply.key.from_me = true;
            reply.key.id = self.send_reply_id.clone().unwrap_or_else(|| "SENT1".to_string());
            reply.message_timestamp = Some(1_700_000_100);
            Ok(reply)
        }
    }
}
