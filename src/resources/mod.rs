//! Thin managers over the remote key and bot collections, plus the session-only training
//! examples. Each keeps a local copy that only changes after the remote side agreed.

pub mod bots;
pub mod cache;
pub mod keys;
pub mod training;

use chrono::{ DateTime, Utc };
use log::{ error, info };
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{ Arc, Mutex, PoisonError };
use thiserror::Error;

pub use bots::BotManager;
pub use keys::KeyManager;
pub use training::TrainingManager;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service answered {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("unexpected response body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{0}")]
    Validation(String),
    #[error("no {kind} with id '{id}'")]
    NotFound {
        kind: &'static str,
        id: String,
    },
    #[error("{0} service is not configured")]
    NotConfigured(&'static str),
}

pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ResourceError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ResourceError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

pub(crate) async fn expect_success(resp: Response) -> Result<(), ResourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ResourceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient, user-facing outcome of a resource operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            description,
            at: Utc::now(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: Some(description.into()),
            at: Utc::now(),
        }
    }
}

const NOTICE_CAPACITY: usize = 50;

/// Bounded queue of notices waiting to be shown.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    queue: Arc<Mutex<VecDeque<Notice>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}{}", notice.title, describe(&notice)),
            NoticeLevel::Error => error!("{}{}", notice.title, describe(&notice)),
        }
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() == NOTICE_CAPACITY {
            queue.pop_front();
        }
        queue.push_back(notice);
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect()
    }
}

fn describe(notice: &Notice) -> String {
    notice.description.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}
