use reminder_engine_domain::{
    DeliveryChannel, IntervalFollowUp, ReminderSettings, TriggerTemplates, ID,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettingsDTO {
    pub organization_id: ID,
    pub enabled: bool,
    pub channel: DeliveryChannel,
    pub timezone: String,
    pub triggers: TriggerTemplates,
    pub follow_up: IntervalFollowUp,
    pub updated: i64,
}

impl ReminderSettingsDTO {
    pub fn new(settings: ReminderSettings) -> Self {
        Self {
            organization_id: settings.organization_id,
            enabled: settings.enabled,
            channel: settings.channel,
            timezone: settings.timezone.name().to_string(),
            triggers: settings.triggers,
            follow_up: settings.follow_up,
            updated: settings.updated,
        }
    }
}
