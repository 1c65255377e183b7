pub mod api;

use crate::dashboard::Dashboard;
use log::{ info, warn };
use std::error::Error;

pub struct Server {
    addr: String,
    dashboard: Dashboard,
    api_key: Option<String>,
}

impl Server {
    pub fn new(addr: String, dashboard: Dashboard, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        if api_key.is_some() {
            info!("Server configured with API Key authentication.");
        } else {
            warn!("Server configured WITHOUT API Key authentication. Requests are open.");
        }

        Self { addr, dashboard, api_key }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.dashboard.load_initial().await;
        api::start_http_server(&self.addr, self.dashboard.clone(), self.api_key.clone()).await
    }
}
