use super::IPushSubscriptionRepo;
use crate::repos::shared::inmemory_repo::*;
use reminder_engine_domain::{PushSubscription, ID};

pub struct InMemoryPushSubscriptionRepo {
    subscriptions: std::sync::Mutex<Vec<PushSubscription>>,
}

impl InMemoryPushSubscriptionRepo {
    pub fn new() -> Self {
        Self {
            subscriptions: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IPushSubscriptionRepo for InMemoryPushSubscriptionRepo {
    async fn upsert(&self, subscription: &PushSubscription) -> anyhow::Result<PushSubscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        match subscriptions
            .iter_mut()
            .find(|s| s.endpoint == subscription.endpoint)
        {
            Some(existing) => {
                existing.user_id = subscription.user_id.clone();
                existing.key_p256dh = subscription.key_p256dh.clone();
                existing.key_auth = subscription.key_auth.clone();
                Ok(existing.clone())
            }
            None => {
                subscriptions.push(subscription.clone());
                Ok(subscription.clone())
            }
        }
    }

    async fn find_by_user(&self, user_id: &ID) -> Vec<PushSubscription> {
        find_by(&self.subscriptions, |s| s.user_id == *user_id)
    }

    async fn delete(&self, subscription_id: &ID) -> Option<PushSubscription> {
        delete(subscription_id, &self.subscriptions)
    }
}
