mod inmemory;
mod postgres;

pub use inmemory::InMemoryNotificationLogRepo;
pub use postgres::PostgresNotificationLogRepo;
use reminder_engine_domain::{NotificationLogEntry, ID};

/// Append only, entries are never updated
#[async_trait::async_trait]
pub trait INotificationLogRepo: Send + Sync {
    async fn insert(&self, entry: &NotificationLogEntry) -> anyhow::Result<()>;
    /// Most recent entries first
    async fn find_by_organization(&self, organization_id: &ID, limit: usize)
        -> Vec<NotificationLogEntry>;
    async fn find_by_reminder(&self, reminder_id: &ID) -> Vec<NotificationLogEntry>;
}
