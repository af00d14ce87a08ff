use serde::{Deserialize, Serialize};

pub mod dispatch_due_reminders {
    use super::*;

    #[derive(Debug, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        /// Dispatch as if it was this timestamp, defaults to now
        #[serde(default)]
        pub now: Option<i64>,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub claimed: usize,
        pub sent: usize,
        pub failed: usize,
        pub cancelled: usize,
    }
}
