use super::IReminderSettingsRepo;
use crate::repos::shared::inmemory_repo::*;
use reminder_engine_domain::{ReminderSettings, ID};

pub struct InMemoryReminderSettingsRepo {
    settings: std::sync::Mutex<Vec<ReminderSettings>>,
}

impl InMemoryReminderSettingsRepo {
    pub fn new() -> Self {
        Self {
            settings: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderSettingsRepo for InMemoryReminderSettingsRepo {
    async fn find(&self, organization_id: &ID) -> Option<ReminderSettings> {
        find(organization_id, &self.settings)
    }

    async fn save(&self, settings: &ReminderSettings) -> anyhow::Result<()> {
        upsert(settings, &self.settings);
        Ok(())
    }
}
