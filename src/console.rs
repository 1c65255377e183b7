use log::debug;
use std::error::Error;
use tokio::io::{ stdin, AsyncBufReadExt, BufReader };
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use crate::conversation::Submission;
use crate::dashboard::Dashboard;
use crate::models::chat::{ Message, Role };
use crate::models::resources::{ ApiKey, TelegramBot };
use crate::resources::{ Notice, NoticeLevel };

const HELP: &str = "\
Commands:
  <text>                         send a message
  /history                       show the conversation
  /keys                          list API keys
  /newkey [name]                 create an API key
  /delkey <id>                   delete an API key
  /bots [api_key]                list Telegram bots
  /addbot <api_key> <token>      register a Telegram bot
  /toggle <api_key> <bot_id>     pause or resume a bot
  /train <input> | <output> | <category>
  /examples                      list training examples
  /untrain <id>                  delete a training example
  /stats                         counters
  /help                          this text
  /quit                          exit";

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Say(String),
    History,
    Keys,
    NewKey(Option<String>),
    DeleteKey(String),
    Bots(Option<String>),
    AddBot {
        api_key: String,
        token: String,
    },
    Toggle {
        api_key: String,
        bot_id: String,
    },
    Train {
        input: String,
        output: String,
        category: String,
    },
    Examples,
    Untrain(String),
    Stats,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ConsoleCommand {
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return ConsoleCommand::Say(line.to_string());
    };
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest.trim(), ""),
    };
    let words: Vec<&str> = args.split_whitespace().collect();

    match (name, words.as_slice()) {
        ("history", _) => ConsoleCommand::History,
        ("keys", _) => ConsoleCommand::Keys,
        ("newkey", _) => ConsoleCommand::NewKey(Some(args.to_string()).filter(|a| !a.is_empty())),
        ("delkey", [id]) => ConsoleCommand::DeleteKey(id.to_string()),
        ("bots", []) => ConsoleCommand::Bots(None),
        ("bots", [key]) => ConsoleCommand::Bots(Some(key.to_string())),
        ("addbot", [key, token]) =>
            ConsoleCommand::AddBot { api_key: key.to_string(), token: token.to_string() },
        ("toggle", [key, id]) =>
            ConsoleCommand::Toggle { api_key: key.to_string(), bot_id: id.to_string() },
        ("train", _) => {
            let parts: Vec<&str> = args.splitn(3, '|').map(str::trim).collect();
            let field = |i: usize| parts.get(i).copied().unwrap_or_default().to_string();
            ConsoleCommand::Train { input: field(0), output: field(1), category: field(2) }
        }
        ("examples", _) => ConsoleCommand::Examples,
        ("untrain", [id]) => ConsoleCommand::Untrain(id.to_string()),
        ("stats", _) => ConsoleCommand::Stats,
        ("help", _) => ConsoleCommand::Help,
        ("quit" | "exit", _) => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(line.trim().to_string()),
    }
}

pub(crate) fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "madai",
    };
    println!("[{}] {}: {}", message.timestamp.format("%H:%M:%S"), who, message.content);
}

pub(crate) fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        let marker = match notice.level {
            NoticeLevel::Info => "*",
            NoticeLevel::Error => "!",
        };
        match notice.description {
            Some(d) => println!("{} {}: {}", marker, notice.title, d),
            None => println!("{} {}", marker, notice.title),
        }
    }
}

pub(crate) fn print_keys(keys: &[ApiKey]) {
    for key in keys {
        println!("{}\t{}\t{}\t{}", key.id, key.name, key.key, key.created.format("%Y-%m-%d"));
    }
}

pub(crate) fn print_bots(bots: &[TelegramBot]) {
    for bot in bots {
        let state = if bot.is_active { "Активен" } else { "Неактивен" };
        println!("{}\t{}\t{}\t{}", bot.id, bot.display_name(), state, bot.masked_token());
    }
}

/// Runs one console command. Returns `false` when the session should end.
pub async fn execute(dashboard: &Dashboard, command: ConsoleCommand) -> bool {
    match command {
        ConsoleCommand::Say(text) => {
            match dashboard.send_message(&text) {
                Submission::Ignored => {}
                Submission::Rejected => println!("! Дождитесь ответа на предыдущее сообщение"),
                submission => {
                    if let Some(resolution) = submission.into_reply().await {
                        debug!("Reply source: {:?}", resolution.source);
                        print_message(&resolution.message);
                    }
                }
            }
        }
        ConsoleCommand::History => {
            for message in dashboard.conversation().messages() {
                print_message(&message);
            }
        }
        ConsoleCommand::Keys => {
            if let Ok(keys) = dashboard.refresh_keys().await {
                print_keys(&keys);
            }
        }
        ConsoleCommand::NewKey(name) => {
            if let Ok(key) = dashboard.create_key(name.as_deref()).await {
                print_keys(&[key]);
            }
        }
        ConsoleCommand::DeleteKey(id) => {
            if let Err(e) = dashboard.delete_key(&id).await {
                debug!("delkey failed: {}", e);
            }
        }
        ConsoleCommand::Bots(key) => {
            if let Ok(bots) = dashboard.refresh_bots(key.as_deref()).await {
                print_bots(&bots);
            }
        }
        ConsoleCommand::AddBot { api_key, token } => {
            if let Err(e) = dashboard.register_bot(&api_key, &token).await {
                debug!("addbot failed: {}", e);
            }
        }
        ConsoleCommand::Toggle { api_key, bot_id } => {
            if let Err(e) = dashboard.toggle_bot(&api_key, &bot_id).await {
                debug!("toggle failed: {}", e);
            }
        }
        ConsoleCommand::Train { input, output, category } => {
            if let Err(e) = dashboard.add_training_example(&input, &output, &category) {
                debug!("train failed: {}", e);
            }
        }
        ConsoleCommand::Examples => {
            for example in dashboard.training().list() {
                println!("{}\t[{}]\t{} => {}", example.id, example.category, example.input, example.output);
            }
        }
        ConsoleCommand::Untrain(id) => {
            if let Err(e) = dashboard.delete_training_example(&id) {
                debug!("untrain failed: {}", e);
            }
        }
        ConsoleCommand::Stats => {
            let stats = dashboard.stats();
            println!(
                "Примеров обучения: {}\nAPI ключей: {}\nTelegram ботов: {}\nСообщений в чате: {}",
                stats.training_examples,
                stats.api_keys,
                stats.telegram_bots,
                stats.messages
            );
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Unknown(line) => println!("Unknown command: {} (try /help)", line),
    }
    print_notices(dashboard.notices().drain());
    true
}

pub async fn run(dashboard: Dashboard) -> Result<(), Box<dyn Error + Send + Sync>> {
    dashboard.load_initial().await;
    for message in dashboard.conversation().messages() {
        print_message(&message);
    }
    println!("(/help for commands)");

    let mut lines = LinesStream::new(BufReader::new(stdin()).lines());
    while let Some(line) = lines.next().await {
        if !execute(&dashboard, parse_line(&line?)).await {
            break;
        }
    }
    Ok(())
}
