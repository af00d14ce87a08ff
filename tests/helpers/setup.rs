use reminder_engine_api::Application;
use reminder_engine_infra::{Config, GatewayRestApi, ReminderContext};
use std::sync::Arc;

pub struct TestApp {
    pub config: Config,
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }
}

// Launch the application as a background task
pub async fn spawn_app() -> TestApp {
    let mut ctx = ReminderContext::create_inmemory();
    ctx.config.port = 0; // Random port
    ctx.config.gateway = None;
    ctx.gateway = Arc::new(GatewayRestApi::new(None, ctx.config.http_timeout));

    let config = ctx.config.clone();
    let application = Application::new(ctx)
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}", application.port());
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    TestApp {
        config,
        address,
        client: reqwest::Client::new(),
    }
}
