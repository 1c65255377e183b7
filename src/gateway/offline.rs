use async_trait::async_trait;

use super::{ ChatClient, GatewayError };
use crate::models::chat::{ CleanupReport, Message };

/// Stands in for an unreachable chat service.
#[derive(Debug, Default)]
pub struct OfflineChatClient;

impl OfflineChatClient {
    pub fn new() -> Self {
        Self
    }

    fn unavailable() -> GatewayError {
        GatewayError::Transport("offline mode".to_string())
    }
}

#[async_trait]
impl ChatClient for OfflineChatClient {
    async fn fetch_history(&self) -> Result<Vec<Message>, GatewayError> {
        Err(Self::unavailable())
    }

    async fn send_message(&self, _message: &str) -> Result<Message, GatewayError> {
        Err(Self::unavailable())
    }

    async fn cleanup(&self, _days: u32) -> Result<CleanupReport, GatewayError> {
        Err(Self::unavailable())
    }

    fn describe(&self) -> String {
        "offline (local responder only)".to_string()
    }
}
