use reminder_engine_domain::{PushSubscription, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscriptionDTO {
    pub id: ID,
    pub user_id: ID,
    pub endpoint: String,
    pub created: i64,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscriptionResponse {
    pub subscription: PushSubscriptionDTO,
}

impl PushSubscriptionResponse {
    pub fn new(subscription: PushSubscription) -> Self {
        Self {
            subscription: PushSubscriptionDTO {
                id: subscription.id,
                user_id: subscription.user_id,
                endpoint: subscription.endpoint,
                created: subscription.created,
            },
        }
    }
}

pub mod register_push_subscription {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub user_id: ID,
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SubscriptionKeys {
        pub p256dh: String,
        pub auth: String,
    }

    /// Same shape as a browser `PushSubscription` serialized to json
    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub endpoint: String,
        pub keys: SubscriptionKeys,
    }

    pub type APIResponse = PushSubscriptionResponse;
}

pub mod unregister_push_subscription {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub subscription_id: ID,
    }

    pub type APIResponse = PushSubscriptionResponse;
}
