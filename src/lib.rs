pub mod cli;
pub mod console;
pub mod conversation;
pub mod dashboard;
pub mod gateway;
pub mod models;
pub mod resources;
pub mod responder;
pub mod server;

use cli::{ Args, BotAction, Command, KeyAction };
use console::{ print_bots, print_keys, print_notices };
use dashboard::{ Dashboard, DashboardConfig };
use log::info;
use server::Server;
use std::error::Error;

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(not set)")
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Chat Service URL: {}", args.chat_url);
    info!("Chat API Key: {}", if args.chat_api_key.is_some() { "set" } else { "(not set)" });
    info!("Offline Mode: {}", args.offline);
    info!("Serialize Submissions: {}", args.serialize_submissions);
    info!("Keys Service URL: {}", show(&args.keys_url));
    info!("Bots Service URL: {}", show(&args.bots_url));
    info!("Webhook URL: {}", show(&args.webhook_url));
    info!("Knowledge Service URL: {}", show(&args.knowledge_url));
    info!("-------------------------");

    let dashboard = Dashboard::new(DashboardConfig::from_args(&args)?);

    let result = match args.command.clone().unwrap_or(Command::Chat) {
        Command::Chat => console::run(dashboard.clone()).await,
        Command::Ask { text } => {
            if let Some(resolution) = dashboard.send_message(&text).into_reply().await {
                info!("Reply source: {:?}", resolution.source);
                println!("{}", resolution.message.content);
            }
            Ok(())
        }
        Command::Keys { action } => run_keys(&dashboard, action).await,
        Command::Bots { action } => run_bots(&dashboard, action).await,
        Command::Cleanup { days } => {
            if let Some(report) = dashboard.cleanup_messages(days).await {
                println!("Удалено сообщений: {} ({})", report.deleted_messages, report.message);
            }
            Ok(())
        }
        Command::Serve => {
            info!("Starting server on: {}", args.server_addr);
            Server::new(args.server_addr.clone(), dashboard.clone(), args.server_api_key.clone()).run().await
        }
    };

    print_notices(dashboard.notices().drain());
    result
}

async fn run_keys(dashboard: &Dashboard, action: KeyAction) -> Result<(), Box<dyn Error + Send + Sync>> {
    match action {
        KeyAction::List => print_keys(&dashboard.refresh_keys().await?),
        KeyAction::Create { name } => print_keys(&[dashboard.create_key(name.as_deref()).await?]),
        KeyAction::Delete { id } => dashboard.delete_key(&id).await?,
    }
    Ok(())
}

async fn run_bots(dashboard: &Dashboard, action: BotAction) -> Result<(), Box<dyn Error + Send + Sync>> {
    match action {
        BotAction::List { api_key } => {
            if api_key.is_none() {
                dashboard.refresh_keys().await?;
            }
            print_bots(&dashboard.refresh_bots(api_key.as_deref()).await?);
        }
        BotAction::Register { api_key, token } => {
            print_bots(&[dashboard.register_bot(&api_key, &token).await?]);
        }
        BotAction::Toggle { api_key, id } => {
            // toggling needs the bot in the local cache
            dashboard.refresh_bots(Some(&api_key)).await?;
            print_bots(&[dashboard.toggle_bot(&api_key, &id).await?]);
        }
    }
    Ok(())
}

