mod channel_connection;
mod notification_log;
mod push_subscription;
mod reminder_expansion_jobs;
mod reminder_settings;
mod resource;
mod scheduled_reminder;
mod shared;

pub use channel_connection::IChannelConnectionRepo;
use channel_connection::{InMemoryChannelConnectionRepo, PostgresChannelConnectionRepo};
pub use notification_log::INotificationLogRepo;
use notification_log::{InMemoryNotificationLogRepo, PostgresNotificationLogRepo};
pub use push_subscription::IPushSubscriptionRepo;
use push_subscription::{InMemoryPushSubscriptionRepo, PostgresPushSubscriptionRepo};
pub use reminder_expansion_jobs::IReminderExpansionJobsRepo;
use reminder_expansion_jobs::{
    InMemoryReminderExpansionJobsRepo, PostgresReminderExpansionJobsRepo,
};
pub use reminder_settings::IReminderSettingsRepo;
use reminder_settings::{InMemoryReminderSettingsRepo, PostgresReminderSettingsRepo};
pub use resource::IResourceRepo;
use resource::{InMemoryResourceRepo, PostgresResourceRepo};
pub use scheduled_reminder::IScheduledReminderRepo;
use scheduled_reminder::{InMemoryScheduledReminderRepo, PostgresScheduledReminderRepo};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Repos {
    pub reminder_settings: Arc<dyn IReminderSettingsRepo>,
    pub scheduled_reminders: Arc<dyn IScheduledReminderRepo>,
    pub reminder_expansion_jobs: Arc<dyn IReminderExpansionJobsRepo>,
    pub notification_log: Arc<dyn INotificationLogRepo>,
    pub channel_connections: Arc<dyn IChannelConnectionRepo>,
    pub push_subscriptions: Arc<dyn IPushSubscriptionRepo>,
    pub resources: Arc<dyn IResourceRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");
        Ok(Self {
            reminder_settings: Arc::new(PostgresReminderSettingsRepo::new(pool.clone())),
            scheduled_reminders: Arc::new(PostgresScheduledReminderRepo::new(pool.clone())),
            reminder_expansion_jobs: Arc::new(PostgresReminderExpansionJobsRepo::new(
                pool.clone(),
            )),
            notification_log: Arc::new(PostgresNotificationLogRepo::new(pool.clone())),
            channel_connections: Arc::new(PostgresChannelConnectionRepo::new(pool.clone())),
            push_subscriptions: Arc::new(PostgresPushSubscriptionRepo::new(pool.clone())),
            resources: Arc::new(PostgresResourceRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        Self {
            reminder_settings: Arc::new(InMemoryReminderSettingsRepo::new()),
            scheduled_reminders: Arc::new(InMemoryScheduledReminderRepo::new()),
            reminder_expansion_jobs: Arc::new(InMemoryReminderExpansionJobsRepo::new()),
            notification_log: Arc::new(InMemoryNotificationLogRepo::new()),
            channel_connections: Arc::new(InMemoryChannelConnectionRepo::new()),
            push_subscriptions: Arc::new(InMemoryPushSubscriptionRepo::new()),
            resources: Arc::new(InMemoryResourceRepo::new()),
        }
    }
}
