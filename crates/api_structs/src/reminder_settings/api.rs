use crate::dtos::ReminderSettingsDTO;
use reminder_engine_domain::{ReminderSettings, ID};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettingsResponse {
    pub settings: ReminderSettingsDTO,
}

impl ReminderSettingsResponse {
    pub fn new(settings: ReminderSettings) -> Self {
        Self {
            settings: ReminderSettingsDTO::new(settings),
        }
    }
}

pub mod get_reminder_settings {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub org_id: ID,
    }

    pub type APIResponse = ReminderSettingsResponse;
}

pub mod update_reminder_settings {
    use super::*;
    use reminder_engine_domain::{DeliveryChannel, IntervalFollowUp, TriggerTemplates};

    #[derive(Deserialize)]
    pub struct PathParams {
        pub org_id: ID,
    }

    /// Settings are replaced wholesale
    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub enabled: bool,
        pub channel: DeliveryChannel,
        pub timezone: String,
        pub triggers: TriggerTemplates,
        pub follow_up: IntervalFollowUp,
    }

    pub type APIResponse = ReminderSettingsResponse;
}
