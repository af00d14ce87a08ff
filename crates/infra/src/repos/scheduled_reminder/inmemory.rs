use super::IScheduledReminderRepo;
use crate::repos::shared::inmemory_repo::*;
use reminder_engine_domain::{ReminderStatus, ScheduledReminder, TriggerKind, ID};

pub struct InMemoryScheduledReminderRepo {
    reminders: std::sync::Mutex<Vec<ScheduledReminder>>,
}

impl InMemoryScheduledReminderRepo {
    pub fn new() -> Self {
        Self {
            reminders: std::sync::Mutex::new(Vec::new()),
        }
    }
}

fn matches_kinds(reminder: &ScheduledReminder, trigger_kinds: Option<&[TriggerKind]>) -> bool {
    trigger_kinds
        .map(|kinds| kinds.contains(&reminder.trigger_kind))
        .unwrap_or(true)
}

#[async_trait::async_trait]
impl IScheduledReminderRepo for InMemoryScheduledReminderRepo {
    async fn insert_many(&self, reminders: &[ScheduledReminder]) -> anyhow::Result<u64> {
        let mut collection = self.reminders.lock().unwrap();
        let mut scheduled = 0;
        for reminder in reminders {
            let key = reminder.dedup_key();
            match collection.iter_mut().find(|r| r.dedup_key() == key) {
                Some(existing) if existing.status == ReminderStatus::Cancelled => {
                    existing.scheduled_at = reminder.scheduled_at;
                    existing.channel = reminder.channel;
                    existing.status = ReminderStatus::Pending;
                    existing.attempts = 0;
                    existing.last_error = None;
                    existing.claimed_at = None;
                    existing.sent_at = None;
                    scheduled += 1;
                }
                Some(_) => (),
                None => {
                    collection.push(reminder.clone());
                    scheduled += 1;
                }
            }
        }
        Ok(scheduled)
    }

    async fn find(&self, reminder_id: &ID) -> Option<ScheduledReminder> {
        find(reminder_id, &self.reminders)
    }

    async fn find_by_resource(&self, resource_id: &ID) -> Vec<ScheduledReminder> {
        find_by(&self.reminders, |r| r.resource_id == *resource_id)
    }

    async fn find_due(&self, now: i64, lease_millis: i64, limit: usize) -> Vec<ScheduledReminder> {
        let mut due = find_by(&self.reminders, |r| r.is_claimable(now, lease_millis));
        due.sort_by_key(|r| r.scheduled_at);
        due.truncate(limit);
        due
    }

    async fn claim(
        &self,
        reminder_id: &ID,
        now: i64,
        lease_millis: i64,
    ) -> anyhow::Result<Option<ScheduledReminder>> {
        let mut collection = self.reminders.lock().unwrap();
        let claimed = collection
            .iter_mut()
            .find(|r| r.id == *reminder_id && r.is_claimable(now, lease_millis))
            .map(|r| {
                r.status = ReminderStatus::Processing;
                r.claimed_at = Some(now);
                r.clone()
            });
        Ok(claimed)
    }

    async fn complete(&self, reminder: &ScheduledReminder) -> anyhow::Result<bool> {
        let updated = update_many(
            &self.reminders,
            |r| {
                r.id == reminder.id
                    && r.status == ReminderStatus::Processing
                    && r.claimed_at == reminder.claimed_at
            },
            |r| {
                r.status = reminder.status;
                r.attempts = reminder.attempts;
                r.last_error = reminder.last_error.clone();
                r.sent_at = reminder.sent_at;
            },
        );
        Ok(updated > 0)
    }

    async fn cancel_pending(
        &self,
        resource_id: &ID,
        trigger_kinds: Option<&[TriggerKind]>,
    ) -> anyhow::Result<u64> {
        Ok(update_many(
            &self.reminders,
            |r| {
                r.resource_id == *resource_id
                    && r.status == ReminderStatus::Pending
                    && matches_kinds(r, trigger_kinds)
            },
            |r| r.status = ReminderStatus::Cancelled,
        ))
    }

    async fn cancel_pending_by_organization(
        &self,
        organization_id: &ID,
        trigger_kinds: Option<&[TriggerKind]>,
    ) -> anyhow::Result<u64> {
        Ok(update_many(
            &self.reminders,
            |r| {
                r.organization_id == *organization_id
                    && r.status == ReminderStatus::Pending
                    && matches_kinds(r, trigger_kinds)
            },
            |r| r.status = ReminderStatus::Cancelled,
        ))
    }
}
