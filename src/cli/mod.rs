use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat Service Args ---
    /// Chat service endpoint (GET history, POST {message})
    #[arg(long, env = "CHAT_URL", default_value = "http://127.0.0.1:8000/chat")]
    pub chat_url: String,

    /// Optional API key sent as X-Api-Key on chat calls
    #[arg(long, env = "CHAT_API_KEY")]
    pub chat_api_key: Option<String>,

    /// Never contact the chat service; every reply comes from the local responder
    #[arg(long, env = "OFFLINE", default_value = "false")]
    pub offline: bool,

    /// Reject a new message while the previous reply is still pending (default: interleave)
    #[arg(long, env = "SERIALIZE_SUBMISSIONS", default_value = "false")]
    pub serialize_submissions: bool,

    // --- Resource Service Args ---
    /// API key service endpoint (GET, POST {name}, DELETE ?id=)
    #[arg(long, env = "KEYS_URL")]
    pub keys_url: Option<String>,

    /// Telegram bot service endpoint (GET, POST, PUT; authenticated with X-Api-Key)
    #[arg(long, env = "BOTS_URL")]
    pub bots_url: Option<String>,

    /// Webhook URL handed to the bot service when registering a bot
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Knowledge service endpoint, seeded once (GET ?seed=true) during the initial load
    #[arg(long, env = "KNOWLEDGE_URL")]
    pub knowledge_url: Option<String>,

    // --- Local API Args ---
    /// Host address and port for `serve` to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// If set, local API clients must send this value in X-Api-Key.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive console (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        text: String,
    },
    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Manage Telegram bots
    Bots {
        #[command(subcommand)]
        action: BotAction,
    },
    /// Ask the chat service to delete stored messages older than N days
    Cleanup {
        #[arg(long, default_value = "1")]
        days: u32,
    },
    /// Serve the session over a local JSON API
    Serve,
}

#[derive(Subcommand, Debug, Clone)]
pub enum KeyAction {
    List,
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum BotAction {
    List {
        /// Key to list bots for (defaults to the first key on record)
        #[arg(long)]
        api_key: Option<String>,
    },
    Register {
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        token: String,
    },
    Toggle {
        #[arg(long)]
        api_key: String,
        id: String,
    },
}
