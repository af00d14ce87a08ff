use reminder_engine_domain::{NotificationLogEntry, ID};
use serde::{Deserialize, Serialize};

pub mod get_notification_logs {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub org_id: ID,
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct QueryParams {
        #[serde(default)]
        pub limit: Option<usize>,
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub entries: Vec<NotificationLogEntry>,
    }

    impl APIResponse {
        pub fn new(entries: Vec<NotificationLogEntry>) -> Self {
            Self { entries }
        }
    }
}
