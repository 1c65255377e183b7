pub mod http;
pub mod offline;

use async_trait::async_trait;
use log::{ info, warn };
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use self::http::HttpChatClient;
use self::offline::OfflineChatClient;
use crate::models::chat::{ CleanupReport, Message };
use crate::responder::LocalResponder;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("chat service unreachable: {0}")]
    Transport(String),
    #[error("chat service rejected the request with status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("chat service returned an unexpected body: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Malformed(err.to_string())
    }
}

/// The remote side of the conversation.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Whole stored log, oldest first.
    async fn fetch_history(&self) -> Result<Vec<Message>, GatewayError>;

    /// One request, no retries. The returned message is always an assistant turn.
    async fn send_message(&self, message: &str) -> Result<Message, GatewayError>;

    async fn cleanup(&self, days: u32) -> Result<CleanupReport, GatewayError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: Url,
    pub api_key: Option<String>,
    pub offline: bool,
}

pub fn new_client(config: &ChatConfig) -> Arc<dyn ChatClient> {
    let client: Arc<dyn ChatClient> = if config.offline {
        Arc::new(OfflineChatClient::new())
    } else {
        Arc::new(HttpChatClient::from_config(config))
    };
    info!("Chat client configured: {}", client.describe());
    client
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Remote,
    Local,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub message: Message,
    pub source: ReplySource,
}

/// Remote first, local rules on any failure. Always yields an assistant turn.
#[derive(Clone)]
pub struct ReplyResolver {
    client: Arc<dyn ChatClient>,
    responder: LocalResponder,
}

impl ReplyResolver {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            responder: LocalResponder::new(),
        }
    }

    pub fn client(&self) -> Arc<dyn ChatClient> {
        Arc::clone(&self.client)
    }

    pub async fn resolve(&self, utterance: &str) -> Resolution {
        match self.client.send_message(utterance).await {
            Ok(message) => Resolution {
                message,
                source: ReplySource::Remote,
            },
            Err(e) => {
                warn!("Falling back to local responder: {}", e);
                Resolution {
                    message: Message::assistant(self.responder.respond(utterance)),
                    source: ReplySource::Local,
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::chat::Role;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use tokio::sync::Semaphore;

    /// Scripted client: answers with `reply` or fails, optionally holding each call until
    /// the gate hands out a permit. `history_gate` does the same for history fetches.
    pub struct ScriptedClient {
        pub reply: Option<String>,
        pub history: Result<Vec<Message>, ()>,
        pub gate: Option<Arc<Semaphore>>,
        pub history_gate: Option<Arc<Semaphore>>,
        pub calls: AtomicUsize,
        pub fetches: AtomicUsize,
    }

    async fn pass(gate: &Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    impl ScriptedClient {
        pub fn answering(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                history: Ok(Vec::new()),
                gate: None,
                history_gate: None,
                calls: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                history: Err(()),
                gate: None,
                history_gate: None,
                calls: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn fetch_history(&self) -> Result<Vec<Message>, GatewayError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            pass(&self.history_gate).await;
            self.history.clone().map_err(|_| GatewayError::Transport("scripted".into()))
        }

        async fn send_message(&self, _message: &str) -> Result<Message, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            pass(&self.gate).await;
            match &self.reply {
                Some(text) => Ok(Message::new(Role::Assistant, text.clone())),
                None => Err(GatewayError::Status { status: 500, body: String::new() }),
            }
        }

        async fn cleanup(&self, _days: u32) -> Result<CleanupReport, GatewayError> {
            Err(GatewayError::Transport("scripted".into()))
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedClient;
    use super::*;
    use crate::models::chat::Role;

    #[tokio::test]
    async fn remote_reply_is_authoritative() {
        let resolver = ReplyResolver::new(Arc::new(ScriptedClient::answering("from server")));
        let resolution = resolver.resolve("lua").await;
        assert_eq!(resolution.source, ReplySource::Remote);
        assert_eq!(resolution.message.content, "from server");
    }

    #[tokio::test]
    async fn failure_is_replaced_by_local_reply() {
        let resolver = ReplyResolver::new(Arc::new(ScriptedClient::failing()));
        let resolution = resolver.resolve("3*4").await;
        assert_eq!(resolution.source, ReplySource::Local);
        assert_eq!(resolution.message.role, Role::Assistant);
        assert!(resolution.message.content.contains("12"));
    }

    #[tokio::test]
    async fn offline_mode_always_answers_locally() {
        let config = ChatConfig {
            base_url: Url::parse("http://127.0.0.1:9/chat").unwrap(),
            api_key: None,
            offline: true,
        };
        let resolver = ReplyResolver::new(new_client(&config));
        let resolution = resolver.resolve("случайный текст").await;
        assert_eq!(resolution.source, ReplySource::Local);
        assert!(resolution.message.content.contains("случайный текст"));
    }
}
