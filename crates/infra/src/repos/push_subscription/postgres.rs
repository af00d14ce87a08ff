use super::IPushSubscriptionRepo;
use reminder_engine_domain::{PushSubscription, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;

pub struct PostgresPushSubscriptionRepo {
    pool: PgPool,
}

impl PostgresPushSubscriptionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PushSubscriptionRaw {
    subscription_uid: Uuid,
    user_uid: Uuid,
    endpoint: String,
    key_p256dh: String,
    key_auth: String,
    created: i64,
}

impl From<PushSubscriptionRaw> for PushSubscription {
    fn from(raw: PushSubscriptionRaw) -> Self {
        Self {
            id: raw.subscription_uid.into(),
            user_id: raw.user_uid.into(),
            endpoint: raw.endpoint,
            key_p256dh: raw.key_p256dh,
            key_auth: raw.key_auth,
            created: raw.created,
        }
    }
}

#[async_trait::async_trait]
impl IPushSubscriptionRepo for PostgresPushSubscriptionRepo {
    async fn upsert(&self, subscription: &PushSubscription) -> anyhow::Result<PushSubscription> {
        let raw: PushSubscriptionRaw = sqlx::query_as(
            r#"
            INSERT INTO push_subscriptions
                (subscription_uid, user_uid, endpoint, key_p256dh, key_auth, created)
            VALUES($1, $2, $3, $4, $5, $6)
            ON CONFLICT (endpoint) DO UPDATE SET
                user_uid = EXCLUDED.user_uid,
                key_p256dh = EXCLUDED.key_p256dh,
                key_auth = EXCLUDED.key_auth
            RETURNING *
            "#,
        )
        .bind(subscription.id.inner_ref())
        .bind(subscription.user_id.inner_ref())
        .bind(&subscription.endpoint)
        .bind(&subscription.key_p256dh)
        .bind(&subscription.key_auth)
        .bind(subscription.created)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to upsert push subscription of user: {}. DB returned error: {:?}",
                subscription.user_id, e
            );
            e
        })?;
        Ok(raw.into())
    }

    async fn find_by_user(&self, user_id: &ID) -> Vec<PushSubscription> {
        sqlx::query_as::<_, PushSubscriptionRaw>(
            r#"
            SELECT * FROM push_subscriptions AS s
            WHERE s.user_uid = $1
            "#,
        )
        .bind(user_id.inner_ref())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!(
                "Find push subscriptions of user: {} failed. DB returned error: {:?}",
                user_id, e
            );
            vec![]
        })
        .into_iter()
        .map(|raw| raw.into())
        .collect()
    }

    async fn delete(&self, subscription_id: &ID) -> Option<PushSubscription> {
        sqlx::query_as::<_, PushSubscriptionRaw>(
            r#"
            DELETE FROM push_subscriptions AS s
            WHERE s.subscription_uid = $1
            RETURNING *
            "#,
        )
        .bind(subscription_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()?
        .map(|raw| raw.into())
    }
}
