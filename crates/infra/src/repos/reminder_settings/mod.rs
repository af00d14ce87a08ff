mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderSettingsRepo;
pub use postgres::PostgresReminderSettingsRepo;
use reminder_engine_domain::{ReminderSettings, ID};

#[async_trait::async_trait]
pub trait IReminderSettingsRepo: Send + Sync {
    async fn find(&self, organization_id: &ID) -> Option<ReminderSettings>;
    /// Replaces the settings of the organization or inserts them
    async fn save(&self, settings: &ReminderSettings) -> anyhow::Result<()>;
}
