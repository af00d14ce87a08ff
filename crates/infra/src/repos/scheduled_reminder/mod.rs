mod inmemory;
mod postgres;

pub use inmemory::InMemoryScheduledReminderRepo;
pub use postgres::PostgresScheduledReminderRepo;
use reminder_engine_domain::{ScheduledReminder, TriggerKind, ID};

#[async_trait::async_trait]
pub trait IScheduledReminderRepo: Send + Sync {
    /// Inserts the reminders whose dedup key is not taken yet. A key held by
    /// a cancelled reminder is revived to pending with the new schedule, any
    /// other existing key is left untouched. Returns how many reminders were
    /// inserted or revived.
    async fn insert_many(&self, reminders: &[ScheduledReminder]) -> anyhow::Result<u64>;
    async fn find(&self, reminder_id: &ID) -> Option<ScheduledReminder>;
    async fn find_by_resource(&self, resource_id: &ID) -> Vec<ScheduledReminder>;
    /// Reminders a dispatch run at `now` may claim, oldest first
    async fn find_due(&self, now: i64, lease_millis: i64, limit: usize) -> Vec<ScheduledReminder>;
    /// Atomically moves a claimable reminder to `processing`. Returns `None`
    /// when another run claimed it first or it is no longer due.
    async fn claim(
        &self,
        reminder_id: &ID,
        now: i64,
        lease_millis: i64,
    ) -> anyhow::Result<Option<ScheduledReminder>>;
    /// Stores the outcome of a claimed reminder. Only succeeds while the
    /// reminder is still held by the same claim.
    async fn complete(&self, reminder: &ScheduledReminder) -> anyhow::Result<bool>;
    /// Cancels pending reminders of a resource, restricted to `trigger_kinds`
    /// when given
    async fn cancel_pending(
        &self,
        resource_id: &ID,
        trigger_kinds: Option<&[TriggerKind]>,
    ) -> anyhow::Result<u64>;
    async fn cancel_pending_by_organization(
        &self,
        organization_id: &ID,
        trigger_kinds: Option<&[TriggerKind]>,
    ) -> anyhow::Result<u64>;
}
