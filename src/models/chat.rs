use chrono::{ DateTime, NaiveDateTime, Utc };
use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

pub const GREETING: &str =
    "Привет! Я MadAI — искусственный интеллект с поддержкой Lua, JavaScript, Python и математики. Чем могу помочь?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of the conversation. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now", deserialize_with = "wire_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn greeting() -> Self {
        Self::assistant(GREETING)
    }
}

#[derive(Serialize, Debug)]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
}

#[derive(Serialize, Debug)]
pub struct CleanupRequest {
    pub cleanup: bool,
    pub days: u32,
}

/// Assistant turn as returned by the chat service.
#[derive(Deserialize, Debug, Clone)]
pub struct AssistantTurn {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub content: String,
    #[serde(default = "Utc::now", deserialize_with = "wire_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl From<AssistantTurn> for Message {
    fn from(turn: AssistantTurn) -> Self {
        Message {
            id: turn.id,
            role: Role::Assistant,
            content: turn.content,
            timestamp: turn.timestamp,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct SendMessageResponse {
    pub ai_response: AssistantTurn,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CleanupReport {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub deleted_messages: u64,
    #[serde(default)]
    pub message: String,
}

/// Remote ids arrive as integers, local ones as strings; both end up as text.
pub fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error> where D: Deserializer<'de> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unsupported id value: {}", other))),
    }
}

/// Accepts RFC 3339 or a naive ISO-8601 timestamp (taken as UTC). Null means "now".
pub fn wire_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where D: Deserializer<'de>
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(Utc::now()),
        Some(raw) => parse_timestamp(&raw).map_err(serde::de::Error::custom),
    }
}

pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where D: Deserializer<'de>
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw).map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}
