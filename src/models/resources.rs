use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Deserializer, Serialize };
use uuid::Uuid;

use super::chat::{ opaque_id, optional_timestamp, wire_timestamp };

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    /// Null once revoked; revoked keys still show up in the service listing.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default = "Utc::now", deserialize_with = "wire_timestamp")]
    pub created: DateTime<Utc>,
    #[serde(
        rename = "lastUsed",
        default,
        deserialize_with = "optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
pub struct CreateKeyRequest<'a> {
    pub name: &'a str,
}

/// Inert input/output pair kept for the session. Nothing trains on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: String,
    pub input: String,
    pub output: String,
    pub category: String,
    pub created: DateTime<Utc>,
}

impl TrainingExample {
    pub fn new(input: &str, output: &str, category: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            input: input.to_string(),
            output: output.to_string(),
            category: category.to_string(),
            created: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelegramBot {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub telegram_token: String,
    #[serde(default)]
    pub bot_username: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub webhook_url: String,
    #[serde(default = "Utc::now", deserialize_with = "wire_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl TelegramBot {
    pub fn display_name(&self) -> String {
        match &self.bot_username {
            Some(name) if !name.is_empty() => format!("@{}", name),
            _ => "Telegram Bot".to_string(),
        }
    }

    /// First ten and last five characters, the way the bot service lists tokens.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.telegram_token.chars().collect();
        if chars.len() <= 15 {
            return self.telegram_token.clone();
        }
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 5..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error> where D: Deserializer<'de> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize, Debug)]
pub struct RegisterBotRequest<'a> {
    pub telegram_token: &'a str,
    pub webhook_url: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct RegisterBotResponse {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default)]
    pub bot_username: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ToggleBotRequest {
    pub bot_id: i64,
}

#[derive(Deserialize, Debug, Default)]
pub struct ToggleBotResponse {
    #[serde(default)]
    pub is_active: Option<bool>,
}
