mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderExpansionJobsRepo;
pub use postgres::PostgresReminderExpansionJobsRepo;
use reminder_engine_domain::{ReminderExpansionJob, ID};

#[async_trait::async_trait]
pub trait IReminderExpansionJobsRepo: Send + Sync {
    /// There is at most one job per resource and trigger kind, a new job
    /// replaces the old one
    async fn upsert(&self, job: &ReminderExpansionJob) -> anyhow::Result<()>;
    async fn delete_all_before(&self, before: i64) -> Vec<ReminderExpansionJob>;
    async fn delete_by_resource(&self, resource_id: &ID) -> anyhow::Result<()>;
}
