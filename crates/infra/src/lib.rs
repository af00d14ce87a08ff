mod config;
mod repos;
mod services;
mod system;
mod task_registry;

pub use config::{Config, GatewayConfig, PushConfig};
pub use repos::{
    IChannelConnectionRepo, INotificationLogRepo, IPushSubscriptionRepo,
    IReminderExpansionJobsRepo, IReminderSettingsRepo, IResourceRepo, IScheduledReminderRepo,
    Repos,
};
pub use services::*;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use system::{ISys, StaticTimeSys};
use system::RealSys;
pub use task_registry::TaskRegistry;
use tracing::info;

#[derive(Clone)]
pub struct ReminderContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub gateway: Arc<dyn IGatewayClient>,
    pub push: Arc<dyn IPushSender>,
    /// Background tasks, e.g. the pairing pollers
    pub tasks: TaskRegistry,
}

impl ReminderContext {
    fn create(repos: Repos, config: Config) -> Self {
        let gateway = GatewayRestApi::new(config.gateway.clone(), config.http_timeout);
        let push = PushRelayApi::new(config.push.clone(), config.http_timeout);
        Self {
            repos,
            config,
            sys: Arc::new(RealSys {}),
            gateway: Arc::new(gateway),
            push: Arc::new(push),
            tasks: TaskRegistry::new(),
        }
    }

    /// Context backed by in-memory repositories, used when no database is
    /// configured and by tests
    pub fn create_inmemory() -> Self {
        Self::create(Repos::create_inmemory(), Config::new())
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> anyhow::Result<ReminderContext> {
    let config = Config::new();
    match get_psql_connection_string() {
        Some(connection_string) => {
            let repos = Repos::create_postgres(&connection_string).await?;
            Ok(ReminderContext::create(repos, config))
        }
        None => {
            info!("DATABASE_URL is not set. Using in-memory repositories.");
            Ok(ReminderContext::create(Repos::create_inmemory(), config))
        }
    }
}

fn get_psql_connection_string() -> Option<String> {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING)
        .ok()
        .filter(|url| !url.is_empty())
}

/// Runs the pending migrations. Does nothing without a database.
pub async fn run_migration() -> Result<(), MigrateError> {
    let connection_string = match get_psql_connection_string() {
        Some(connection_string) => connection_string,
        None => return Ok(()),
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await?;

    sqlx::migrate!().run(&pool).await
}
