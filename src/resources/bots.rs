use chrono::Utc;
use log::debug;
use reqwest::Client as HttpClient;
use url::Url;

use super::cache::RecordCache;
use super::{ read_json, ResourceError };
use crate::gateway::http::API_KEY_HEADER;
use crate::models::resources::{
    RegisterBotRequest,
    RegisterBotResponse,
    TelegramBot,
    ToggleBotRequest,
    ToggleBotResponse,
};

#[derive(Debug, Clone)]
pub struct BotManager {
    http: HttpClient,
    url: Option<Url>,
    webhook_url: Option<String>,
    cache: RecordCache<TelegramBot>,
}

impl BotManager {
    pub fn new(http: HttpClient, url: Option<Url>, webhook_url: Option<String>) -> Self {
        Self {
            http,
            url,
            webhook_url: webhook_url.filter(|w| !w.is_empty()),
            cache: RecordCache::new(),
        }
    }

    fn endpoint(&self) -> Result<Url, ResourceError> {
        self.url.clone().ok_or(ResourceError::NotConfigured("bot"))
    }

    pub fn list(&self) -> Vec<TelegramBot> {
        self.cache.snapshot()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<TelegramBot> {
        self.cache.find(|b| b.id == id)
    }

    /// Lists bots; the service only returns those owned by `api_key`.
    pub async fn refresh(&self, api_key: Option<&str>) -> Result<Vec<TelegramBot>, ResourceError> {
        let mut req = self.http.get(self.endpoint()?);
        if let Some(key) = api_key {
            req = req.header(API_KEY_HEADER, key);
        }
        let bots: Vec<TelegramBot> = read_json(req.send().await?).await?;
        debug!("Fetched {} Telegram bots", bots.len());
        self.cache.replace_all(bots.clone());
        Ok(bots)
    }

    pub async fn register(
        &self,
        api_key: &str,
        telegram_token: &str
    ) -> Result<TelegramBot, ResourceError> {
        let api_key = api_key.trim();
        let telegram_token = telegram_token.trim();
        if api_key.is_empty() || telegram_token.is_empty() {
            return Err(
                ResourceError::Validation(
                    "Выберите API ключ и введите Telegram токен".to_string()
                )
            );
        }
        let webhook_url = self.webhook_url.clone().ok_or(ResourceError::NotConfigured("webhook"))?;

        let resp = self.http
            .post(self.endpoint()?)
            .header(API_KEY_HEADER, api_key)
            .json(&RegisterBotRequest { telegram_token, webhook_url: &webhook_url })
            .send().await?;
        let registered: RegisterBotResponse = read_json(resp).await?;

        let bot = TelegramBot {
            id: registered.id,
            telegram_token: telegram_token.to_string(),
            bot_username: registered.bot_username,
            is_active: true,
            webhook_url,
            created_at: Utc::now(),
            last_activity: None,
        };
        self.cache.push(bot.clone());
        Ok(bot)
    }

    /// Flips `is_active`, preferring the state the service reports back.
    pub async fn toggle(&self, api_key: &str, bot_id: &str) -> Result<TelegramBot, ResourceError> {
        let current = self.find(bot_id).ok_or_else(|| ResourceError::NotFound {
            kind: "bot",
            id: bot_id.to_string(),
        })?;
        let numeric_id = bot_id
            .parse::<i64>()
            .map_err(|_| ResourceError::Validation(format!("bot id '{}' is not numeric", bot_id)))?;

        let resp = self.http
            .put(self.endpoint()?)
            .header(API_KEY_HEADER, api_key)
            .json(&ToggleBotRequest { bot_id: numeric_id })
            .send().await?;
        let toggled: ToggleBotResponse = read_json(resp).await?;
        let is_active = toggled.is_active.unwrap_or(!current.is_active);

        self.cache
            .update_where(
                |b| b.id == bot_id,
                |b| {
                    b.is_active = is_active;
                }
            )
            .into_iter()
            .next()
            .ok_or_else(|| ResourceError::NotFound {
                kind: "bot",
                id: bot_id.to_string(),
            })
    }
}
