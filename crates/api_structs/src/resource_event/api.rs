use reminder_engine_domain::{ResourceEventKind, ResourceSnapshot, ID};
use serde::{Deserialize, Serialize};

pub mod submit_resource_event {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub org_id: ID,
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub kind: ResourceEventKind,
        pub resource: ResourceSnapshot,
        /// Defaults to the time the event is received
        #[serde(default)]
        pub occurred_at: Option<i64>,
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub accepted: bool,
    }
}
