mod inmemory;
mod postgres;

pub use inmemory::InMemoryPushSubscriptionRepo;
pub use postgres::PostgresPushSubscriptionRepo;
use reminder_engine_domain::{PushSubscription, ID};

#[async_trait::async_trait]
pub trait IPushSubscriptionRepo: Send + Sync {
    /// Registering an endpoint that already exists moves it to the new user
    /// and keys
    async fn upsert(&self, subscription: &PushSubscription) -> anyhow::Result<PushSubscription>;
    async fn find_by_user(&self, user_id: &ID) -> Vec<PushSubscription>;
    async fn delete(&self, subscription_id: &ID) -> Option<PushSubscription>;
}
