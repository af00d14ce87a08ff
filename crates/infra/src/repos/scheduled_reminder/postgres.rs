use super::IScheduledReminderRepo;
use reminder_engine_domain::{ScheduledReminder, TriggerKind, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;

pub struct PostgresScheduledReminderRepo {
    pool: PgPool,
}

impl PostgresScheduledReminderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ScheduledReminderRaw {
    reminder_uid: Uuid,
    organization_uid: Uuid,
    resource_type: String,
    resource_uid: Uuid,
    trigger_kind: String,
    occurrence_index: i32,
    scheduled_at: i64,
    channel: String,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    claimed_at: Option<i64>,
    sent_at: Option<i64>,
    created: i64,
}

impl TryFrom<ScheduledReminderRaw> for ScheduledReminder {
    type Error = anyhow::Error;

    fn try_from(raw: ScheduledReminderRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: raw.reminder_uid.into(),
            organization_id: raw.organization_uid.into(),
            resource_type: raw.resource_type.parse()?,
            resource_id: raw.resource_uid.into(),
            trigger_kind: raw.trigger_kind.parse()?,
            occurrence_index: u32::try_from(raw.occurrence_index)?,
            scheduled_at: raw.scheduled_at,
            channel: raw.channel.parse()?,
            status: raw.status.parse()?,
            attempts: u32::try_from(raw.attempts)?,
            last_error: raw.last_error,
            claimed_at: raw.claimed_at,
            sent_at: raw.sent_at,
            created: raw.created,
        })
    }
}

fn into_reminders(rows: Vec<ScheduledReminderRaw>) -> Vec<ScheduledReminder> {
    rows.into_iter()
        .filter_map(|raw| {
            let id = raw.reminder_uid;
            raw.try_into()
                .map_err(|e| error!("Stored reminder: {} is malformed: {:?}", id, e))
                .ok()
        })
        .collect()
}

fn kind_names(trigger_kinds: Option<&[TriggerKind]>) -> Option<Vec<String>> {
    trigger_kinds.map(|kinds| kinds.iter().map(|k| k.as_str().to_string()).collect())
}

#[async_trait::async_trait]
impl IScheduledReminderRepo for PostgresScheduledReminderRepo {
    async fn insert_many(&self, reminders: &[ScheduledReminder]) -> anyhow::Result<u64> {
        let mut scheduled = 0;
        for reminder in reminders {
            scheduled += sqlx::query(
                r#"
                INSERT INTO scheduled_reminders
                    (reminder_uid, organization_uid, resource_type, resource_uid, trigger_kind,
                    occurrence_index, scheduled_at, channel, status, attempts, created)
                VALUES($1, $2, $3, $4, $5, $6, $7, $8, 'pending', 0, $9)
                ON CONFLICT (resource_uid, trigger_kind, occurrence_index) DO UPDATE SET
                    scheduled_at = EXCLUDED.scheduled_at,
                    channel = EXCLUDED.channel,
                    status = 'pending',
                    attempts = 0,
                    last_error = NULL,
                    claimed_at = NULL,
                    sent_at = NULL
                WHERE scheduled_reminders.status = 'cancelled'
                "#,
            )
            .bind(reminder.id.inner_ref())
            .bind(reminder.organization_id.inner_ref())
            .bind(reminder.resource_type.as_str())
            .bind(reminder.resource_id.inner_ref())
            .bind(reminder.trigger_kind.as_str())
            .bind(reminder.occurrence_index as i32)
            .bind(reminder.scheduled_at)
            .bind(reminder.channel.as_str())
            .bind(reminder.created)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Unable to insert reminder: {:?}. DB returned error: {:?}",
                    reminder, e
                );
                e
            })?
            .rows_affected();
        }
        Ok(scheduled)
    }

    async fn find(&self, reminder_id: &ID) -> Option<ScheduledReminder> {
        let raw: Option<ScheduledReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM scheduled_reminders AS r
            WHERE r.reminder_uid = $1
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find reminder with id: {} failed. DB returned error: {:?}",
                reminder_id, e
            )
        })
        .ok()?;
        into_reminders(raw.into_iter().collect()).pop()
    }

    async fn find_by_resource(&self, resource_id: &ID) -> Vec<ScheduledReminder> {
        let rows: Vec<ScheduledReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM scheduled_reminders AS r
            WHERE r.resource_uid = $1
            ORDER BY r.scheduled_at
            "#,
        )
        .bind(resource_id.inner_ref())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!(
                "Find reminders of resource: {} failed. DB returned error: {:?}",
                resource_id, e
            );
            vec![]
        });
        into_reminders(rows)
    }

    async fn find_due(&self, now: i64, lease_millis: i64, limit: usize) -> Vec<ScheduledReminder> {
        let rows: Vec<ScheduledReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM scheduled_reminders AS r
            WHERE (r.status = 'pending' AND r.scheduled_at <= $1)
                OR (r.status = 'processing' AND r.claimed_at <= $2)
            ORDER BY r.scheduled_at
            LIMIT $3
            "#,
        )
        .bind(now)
        .bind(now - lease_millis)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!("Find due reminders failed. DB returned error: {:?}", e);
            vec![]
        });
        into_reminders(rows)
    }

    async fn claim(
        &self,
        reminder_id: &ID,
        now: i64,
        lease_millis: i64,
    ) -> anyhow::Result<Option<ScheduledReminder>> {
        let raw: Option<ScheduledReminderRaw> = sqlx::query_as(
            r#"
            UPDATE scheduled_reminders AS r
            SET status = 'processing', claimed_at = $2
            WHERE r.reminder_uid = $1 AND (
                (r.status = 'pending' AND r.scheduled_at <= $2)
                OR (r.status = 'processing' AND r.claimed_at <= $3)
            )
            RETURNING *
            "#,
        )
        .bind(reminder_id.inner_ref())
        .bind(now)
        .bind(now - lease_millis)
        .fetch_optional(&self.pool)
        .await?;
        raw.map(ScheduledReminder::try_from).transpose()
    }

    async fn complete(&self, reminder: &ScheduledReminder) -> anyhow::Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE scheduled_reminders AS r
            SET status = $2, attempts = $3, last_error = $4, sent_at = $5
            WHERE r.reminder_uid = $1 AND r.status = 'processing' AND r.claimed_at = $6
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.status.as_str())
        .bind(reminder.attempts as i32)
        .bind(&reminder.last_error)
        .bind(reminder.sent_at)
        .bind(reminder.claimed_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    async fn cancel_pending(
        &self,
        resource_id: &ID,
        trigger_kinds: Option<&[TriggerKind]>,
    ) -> anyhow::Result<u64> {
        let cancelled = sqlx::query(
            r#"
            UPDATE scheduled_reminders AS r
            SET status = 'cancelled'
            WHERE r.resource_uid = $1 AND r.status = 'pending'
                AND ($2::text[] IS NULL OR r.trigger_kind = ANY($2))
            "#,
        )
        .bind(resource_id.inner_ref())
        .bind(kind_names(trigger_kinds))
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(cancelled)
    }

    async fn cancel_pending_by_organization(
        &self,
        organization_id: &ID,
        trigger_kinds: Option<&[TriggerKind]>,
    ) -> anyhow::Result<u64> {
        let cancelled = sqlx::query(
            r#"
            UPDATE scheduled_reminders AS r
            SET status = 'cancelled'
            WHERE r.organization_uid = $1 AND r.status = 'pending'
                AND ($2::text[] IS NULL OR r.trigger_kind = ANY($2))
            "#,
        )
        .bind(organization_id.inner_ref())
        .bind(kind_names(trigger_kinds))
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(cancelled)
    }
}
