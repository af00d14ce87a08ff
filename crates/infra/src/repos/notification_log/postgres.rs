use super::INotificationLogRepo;
use reminder_engine_domain::{NotificationLogEntry, ID};
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use tracing::error;

pub struct PostgresNotificationLogRepo {
    pool: PgPool,
}

impl PostgresNotificationLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NotificationLogRaw {
    entry_uid: Uuid,
    organization_uid: Uuid,
    reminder_uid: Uuid,
    recipient_uid: Uuid,
    channel: String,
    title: String,
    body: String,
    tag: String,
    data: serde_json::Value,
    status: String,
    error_message: Option<String>,
    created_at: i64,
    sent_at: Option<i64>,
}

impl TryFrom<NotificationLogRaw> for NotificationLogEntry {
    type Error = anyhow::Error;

    fn try_from(raw: NotificationLogRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: raw.entry_uid.into(),
            organization_id: raw.organization_uid.into(),
            reminder_id: raw.reminder_uid.into(),
            recipient_id: raw.recipient_uid.into(),
            channel: raw.channel.parse()?,
            title: raw.title,
            body: raw.body,
            tag: raw.tag,
            data: raw.data,
            status: raw.status.parse()?,
            error_message: raw.error_message,
            created_at: raw.created_at,
            sent_at: raw.sent_at,
        })
    }
}

fn into_entries(rows: Vec<NotificationLogRaw>) -> Vec<NotificationLogEntry> {
    rows.into_iter()
        .filter_map(|raw| raw.try_into().ok())
        .collect()
}

#[async_trait::async_trait]
impl INotificationLogRepo for PostgresNotificationLogRepo {
    async fn insert(&self, entry: &NotificationLogEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_log
                (entry_uid, organization_uid, reminder_uid, recipient_uid, channel, title, body,
                tag, data, status, error_message, created_at, sent_at)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entry.id.inner_ref())
        .bind(entry.organization_id.inner_ref())
        .bind(entry.reminder_id.inner_ref())
        .bind(entry.recipient_id.inner_ref())
        .bind(entry.channel.as_str())
        .bind(&entry.title)
        .bind(&entry.body)
        .bind(&entry.tag)
        .bind(Json(&entry.data))
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .bind(entry.created_at)
        .bind(entry.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert notification log entry: {:?}. DB returned error: {:?}",
                entry, e
            );
            e
        })?;
        Ok(())
    }

    async fn find_by_organization(
        &self,
        organization_id: &ID,
        limit: usize,
    ) -> Vec<NotificationLogEntry> {
        let rows: Vec<NotificationLogRaw> = sqlx::query_as(
            r#"
            SELECT * FROM notification_log AS n
            WHERE n.organization_uid = $1
            ORDER BY n.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(organization_id.inner_ref())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!(
                "Find notification log of organization: {} failed. DB returned error: {:?}",
                organization_id, e
            );
            vec![]
        });
        into_entries(rows)
    }

    async fn find_by_reminder(&self, reminder_id: &ID) -> Vec<NotificationLogEntry> {
        let rows: Vec<NotificationLogRaw> = sqlx::query_as(
            r#"
            SELECT * FROM notification_log AS n
            WHERE n.reminder_uid = $1
            ORDER BY n.created_at
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default();
        into_entries(rows)
    }
}
