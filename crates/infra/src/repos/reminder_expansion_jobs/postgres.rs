use super::IReminderExpansionJobsRepo;
use reminder_engine_domain::{ReminderExpansionJob, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;

pub struct PostgresReminderExpansionJobsRepo {
    pool: PgPool,
}

impl PostgresReminderExpansionJobsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct JobRaw {
    organization_uid: Uuid,
    resource_uid: Uuid,
    trigger_kind: String,
    next_index: i32,
    creation_anchor: i64,
    run_at: i64,
}

impl TryFrom<JobRaw> for ReminderExpansionJob {
    type Error = anyhow::Error;

    fn try_from(raw: JobRaw) -> anyhow::Result<Self> {
        Ok(Self {
            organization_id: raw.organization_uid.into(),
            resource_id: raw.resource_uid.into(),
            trigger_kind: raw.trigger_kind.parse()?,
            next_index: u32::try_from(raw.next_index)?,
            creation_anchor: raw.creation_anchor,
            run_at: raw.run_at,
        })
    }
}

#[async_trait::async_trait]
impl IReminderExpansionJobsRepo for PostgresReminderExpansionJobsRepo {
    async fn upsert(&self, job: &ReminderExpansionJob) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminder_expansion_jobs
                (organization_uid, resource_uid, trigger_kind, next_index, creation_anchor, run_at)
            VALUES($1, $2, $3, $4, $5, $6)
            ON CONFLICT (resource_uid, trigger_kind) DO UPDATE SET
                next_index = EXCLUDED.next_index,
                creation_anchor = EXCLUDED.creation_anchor,
                run_at = EXCLUDED.run_at
            "#,
        )
        .bind(job.organization_id.inner_ref())
        .bind(job.resource_id.inner_ref())
        .bind(job.trigger_kind.as_str())
        .bind(job.next_index as i32)
        .bind(job.creation_anchor)
        .bind(job.run_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_all_before(&self, before: i64) -> Vec<ReminderExpansionJob> {
        let rows: Vec<JobRaw> = sqlx::query_as(
            r#"
            DELETE FROM reminder_expansion_jobs AS j
            WHERE j.run_at <= $1
            RETURNING *
            "#,
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!("Delete expansion jobs failed. DB returned error: {:?}", e);
            vec![]
        });
        rows.into_iter()
            .filter_map(|raw| raw.try_into().ok())
            .collect()
    }

    async fn delete_by_resource(&self, resource_id: &ID) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM reminder_expansion_jobs AS j
            WHERE j.resource_uid = $1
            "#,
        )
        .bind(resource_id.inner_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
