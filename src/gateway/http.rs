use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, RequestBuilder, Response };
use serde::de::DeserializeOwned;
use url::Url;

use super::{ ChatClient, ChatConfig, GatewayError };
use crate::models::chat::{
    CleanupReport,
    CleanupRequest,
    Message,
    SendMessageRequest,
    SendMessageResponse,
};

pub const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone)]
pub struct HttpChatClient {
    http: HttpClient,
    url: Url,
    api_key: Option<String>,
}

impl HttpChatClient {
    pub fn new(url: Url, api_key: Option<String>) -> Self {
        Self {
            http: HttpClient::new(),
            url,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header(API_KEY_HEADER, key),
            None => req,
        }
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str::<T>(&body)?)
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn fetch_history(&self) -> Result<Vec<Message>, GatewayError> {
        let resp = self.authorize(self.http.get(self.url.clone())).send().await?;
        let messages: Vec<Message> = Self::read_json(resp).await?;
        debug!("Fetched {} stored messages", messages.len());
        Ok(messages)
    }

    async fn send_message(&self, message: &str) -> Result<Message, GatewayError> {
        let req = self.http.post(self.url.clone()).json(&SendMessageRequest { message });
        let resp = self.authorize(req).send().await?;
        let data: SendMessageResponse = Self::read_json(resp).await?;
        Ok(data.ai_response.into())
    }

    async fn cleanup(&self, days: u32) -> Result<CleanupReport, GatewayError> {
        let req = self.http.post(self.url.clone()).json(&CleanupRequest { cleanup: true, days });
        let resp = self.authorize(req).send().await?;
        Self::read_json(resp).await
    }

    fn describe(&self) -> String {
        format!("http {} (api key: {})", self.url, if self.api_key.is_some() {
            "set"
        } else {
            "none"
        })
    }
}
