mod inmemory;
mod postgres;

pub use inmemory::InMemoryResourceRepo;
pub use postgres::PostgresResourceRepo;
use reminder_engine_domain::{ResourceSnapshot, ID};

/// Latest known state of every resource that has reminders
#[async_trait::async_trait]
pub trait IResourceRepo: Send + Sync {
    async fn upsert(&self, resource: &ResourceSnapshot) -> anyhow::Result<()>;
    async fn find(&self, resource_id: &ID) -> Option<ResourceSnapshot>;
    async fn delete(&self, resource_id: &ID) -> Option<ResourceSnapshot>;
}
