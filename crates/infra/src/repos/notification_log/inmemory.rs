use super::INotificationLogRepo;
use crate::repos::shared::inmemory_repo::*;
use reminder_engine_domain::{NotificationLogEntry, ID};

pub struct InMemoryNotificationLogRepo {
    entries: std::sync::Mutex<Vec<NotificationLogEntry>>,
}

impl InMemoryNotificationLogRepo {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl INotificationLogRepo for InMemoryNotificationLogRepo {
    async fn insert(&self, entry: &NotificationLogEntry) -> anyhow::Result<()> {
        insert(entry, &self.entries);
        Ok(())
    }

    async fn find_by_organization(
        &self,
        organization_id: &ID,
        limit: usize,
    ) -> Vec<NotificationLogEntry> {
        let mut entries = find_by(&self.entries, |e| e.organization_id == *organization_id);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        entries
    }

    async fn find_by_reminder(&self, reminder_id: &ID) -> Vec<NotificationLogEntry> {
        find_by(&self.entries, |e| e.reminder_id == *reminder_id)
    }
}
