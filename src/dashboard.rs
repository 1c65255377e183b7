use futures::future::join;
use log::{ debug, error, info };
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::error::Error;
use url::Url;

use crate::cli::Args;
use crate::conversation::{ Conversation, Submission, SubmissionPolicy };
use crate::gateway::{ new_client, ChatConfig, ReplyResolver };
use crate::models::chat::CleanupReport;
use crate::models::resources::{ ApiKey, TelegramBot, TrainingExample };
use crate::resources::{
    expect_success,
    BotManager,
    KeyManager,
    Notice,
    Notices,
    ResourceError,
    TrainingManager,
};

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub chat: ChatConfig,
    pub keys_url: Option<Url>,
    pub bots_url: Option<Url>,
    pub webhook_url: Option<String>,
    pub knowledge_url: Option<Url>,
    pub policy: SubmissionPolicy,
}

fn parse_optional_url(raw: &Option<String>, what: &str) -> Result<Option<Url>, String> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Url::parse(s).map(Some).map_err(|e| format!("Invalid {} '{}': {}", what, s, e)),
    }
}

impl DashboardConfig {
    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_url = Url::parse(&args.chat_url).map_err(|e|
            format!("Invalid chat URL '{}': {}", args.chat_url, e)
        )?;
        Ok(Self {
            chat: ChatConfig {
                base_url: chat_url,
                api_key: args.chat_api_key.clone(),
                offline: args.offline,
            },
            keys_url: parse_optional_url(&args.keys_url, "keys URL")?,
            bots_url: parse_optional_url(&args.bots_url, "bots URL")?,
            webhook_url: args.webhook_url.clone(),
            knowledge_url: parse_optional_url(&args.knowledge_url, "knowledge URL")?,
            policy: if args.serialize_submissions {
                SubmissionPolicy::RejectWhilePending
            } else {
                SubmissionPolicy::Interleave
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub training_examples: usize,
    pub api_keys: usize,
    pub telegram_bots: usize,
    pub messages: usize,
}

/// Session controller: the only owner of the conversation and the resource caches.
#[derive(Clone)]
pub struct Dashboard {
    http: HttpClient,
    conversation: Conversation,
    keys: KeyManager,
    bots: BotManager,
    training: TrainingManager,
    notices: Notices,
    knowledge_url: Option<Url>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        let http = HttpClient::new();
        let resolver = ReplyResolver::new(new_client(&config.chat));
        info!("Submission policy: {:?}", config.policy);

        Self {
            conversation: Conversation::new(resolver, config.policy),
            keys: KeyManager::new(http.clone(), config.keys_url),
            bots: BotManager::new(http.clone(), config.bots_url, config.webhook_url),
            training: TrainingManager::new(),
            notices: Notices::new(),
            knowledge_url: config.knowledge_url,
            http,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    pub fn bots(&self) -> &BotManager {
        &self.bots
    }

    pub fn training(&self) -> &TrainingManager {
        &self.training
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn stats(&self) -> Stats {
        Stats {
            training_examples: self.training.len(),
            api_keys: self.keys.len(),
            telegram_bots: self.bots.len(),
            messages: self.conversation.len(),
        }
    }

    /// Start-up fetch. Every failure here is logged and otherwise ignored.
    pub async fn load_initial(&self) {
        let (_, keys) = join(self.conversation.load_initial(), self.keys.refresh()).await;
        if let Err(e) = keys {
            error!("Error loading API keys: {}", e);
        }

        match self.keys.first_key() {
            Some(key) => {
                if let Err(e) = self.bots.refresh(Some(&key)).await {
                    error!("Error loading Telegram bots: {}", e);
                }
            }
            None => debug!("No API key on record; skipping bot listing"),
        }

        if let Err(e) = self.seed_knowledge().await {
            error!("Error seeding knowledge base: {}", e);
        }
    }

    async fn seed_knowledge(&self) -> Result<(), ResourceError> {
        let Some(mut url) = self.knowledge_url.clone() else {
            return Ok(());
        };
        url.query_pairs_mut().append_pair("seed", "true");
        expect_success(self.http.get(url).send().await?).await?;
        debug!("Knowledge base seed requested");
        Ok(())
    }

    pub fn send_message(&self, text: &str) -> Submission {
        self.conversation.submit(text)
    }

    pub async fn cleanup_messages(&self, days: u32) -> Option<CleanupReport> {
        match self.conversation.client().cleanup(days).await {
            Ok(report) => {
                self.notices.push(Notice::info("Очистка завершена", Some(report.message.clone())));
                Some(report)
            }
            Err(e) => {
                self.notices.push(Notice::error("Ошибка", format!("Не удалось очистить историю: {}", e)));
                None
            }
        }
    }

    pub async fn refresh_keys(&self) -> Result<Vec<ApiKey>, ResourceError> {
        self.keys.refresh().await.map_err(|e| {
            self.notices.push(Notice::error("Ошибка", format!("Не удалось загрузить ключи: {}", e)));
            e
        })
    }

    pub async fn create_key(&self, name: Option<&str>) -> Result<ApiKey, ResourceError> {
        match self.keys.create(name).await {
            Ok(key) => {
                self.notices.push(
                    Notice::info("API ключ создан", Some("Новый ключ добавлен в список".into()))
                );
                Ok(key)
            }
            Err(e) => {
                debug!("Key creation failed: {}", e);
                self.notices.push(Notice::error("Ошибка", "Не удалось создать ключ"));
                Err(e)
            }
        }
    }

    pub async fn delete_key(&self, id: &str) -> Result<(), ResourceError> {
        match self.keys.delete(id).await {
            Ok(()) => {
                self.notices.push(Notice::info("Ключ удален", Some("API ключ успешно удален".into())));
                Ok(())
            }
            Err(e) => {
                debug!("Key deletion failed: {}", e);
                self.notices.push(Notice::error("Ошибка", "Не удалось удалить ключ"));
                Err(e)
            }
        }
    }

    /// Lists bots for `api_key`, or for the first cached key when none is given.
    pub async fn refresh_bots(&self, api_key: Option<&str>) -> Result<Vec<TelegramBot>, ResourceError> {
        let key = api_key.map(str::to_string).or_else(|| self.keys.first_key());
        self.bots.refresh(key.as_deref()).await.map_err(|e| {
            self.notices.push(Notice::error("Ошибка", format!("Не удалось загрузить ботов: {}", e)));
            e
        })
    }

    pub async fn register_bot(
        &self,
        api_key: &str,
        telegram_token: &str
    ) -> Result<TelegramBot, ResourceError> {
        match self.bots.register(api_key, telegram_token).await {
            Ok(bot) => {
                self.notices.push(
                    Notice::info(
                        "Бот подключен!",
                        Some(
                            format!(
                                "@{} готов к работе",
                                bot.bot_username.as_deref().unwrap_or_default()
                            )
                        )
                    )
                );
                Ok(bot)
            }
            Err(ResourceError::Validation(msg)) => {
                self.notices.push(Notice::error("Заполните все поля", msg.clone()));
                Err(ResourceError::Validation(msg))
            }
            Err(e @ ResourceError::NotConfigured(_)) => {
                self.notices.push(Notice::error("Не настроено", e.to_string()));
                Err(e)
            }
            Err(e) => {
                debug!("Bot registration failed: {}", e);
                self.notices.push(Notice::error("Ошибка", "Проверьте токен и попробуйте снова"));
                Err(e)
            }
        }
    }

    pub async fn toggle_bot(&self, api_key: &str, bot_id: &str) -> Result<TelegramBot, ResourceError> {
        match self.bots.toggle(api_key, bot_id).await {
            Ok(bot) => {
                let title = if bot.is_active { "Бот активирован" } else { "Бот остановлен" };
                self.notices.push(Notice::info(title, None));
                Ok(bot)
            }
            Err(e) => {
                debug!("Bot toggle failed: {}", e);
                self.notices.push(Notice::error("Ошибка", "Не удалось изменить статус"));
                Err(e)
            }
        }
    }

    pub fn add_training_example(
        &self,
        input: &str,
        output: &str,
        category: &str
    ) -> Result<TrainingExample, ResourceError> {
        match self.training.add(input, output, category) {
            Ok(example) => {
                self.notices.push(
                    Notice::info("Пример добавлен!", Some("AI обучился на новом примере".into()))
                );
                Ok(example)
            }
            Err(e) => {
                self.notices.push(Notice::error("Заполните все поля", e.to_string()));
                Err(e)
            }
        }
    }

    pub fn delete_training_example(&self, id: &str) -> Result<(), ResourceError> {
        match self.training.delete(id) {
            Ok(()) => {
                self.notices.push(
                    Notice::info("Пример удален", Some("Обучающий пример удален из базы".into()))
                );
                Ok(())
            }
            Err(e) => {
                self.notices.push(Notice::error("Ошибка", e.to_string()));
                Err(e)
            }
        }
    }
}
