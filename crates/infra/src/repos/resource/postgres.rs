use super::IResourceRepo;
use reminder_engine_domain::{ResourceSnapshot, ID};
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use tracing::error;

pub struct PostgresResourceRepo {
    pool: PgPool,
}

impl PostgresResourceRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ResourceRaw {
    snapshot: Json<ResourceSnapshot>,
}

#[async_trait::async_trait]
impl IResourceRepo for PostgresResourceRepo {
    async fn upsert(&self, resource: &ResourceSnapshot) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO resources (resource_uid, organization_uid, snapshot)
            VALUES($1, $2, $3)
            ON CONFLICT (resource_uid) DO UPDATE SET
                snapshot = EXCLUDED.snapshot
            "#,
        )
        .bind(resource.id.inner_ref())
        .bind(resource.organization_id.inner_ref())
        .bind(Json(resource))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to upsert resource: {}. DB returned error: {:?}",
                resource.id, e
            );
            e
        })?;
        Ok(())
    }

    async fn find(&self, resource_id: &ID) -> Option<ResourceSnapshot> {
        sqlx::query_as::<_, ResourceRaw>(
            r#"
            SELECT r.snapshot FROM resources AS r
            WHERE r.resource_uid = $1
            "#,
        )
        .bind(resource_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find resource: {} failed. DB returned error: {:?}",
                resource_id, e
            )
        })
        .ok()?
        .map(|raw| raw.snapshot.0)
    }

    async fn delete(&self, resource_id: &ID) -> Option<ResourceSnapshot> {
        sqlx::query_as::<_, ResourceRaw>(
            r#"
            DELETE FROM resources AS r
            WHERE r.resource_uid = $1
            RETURNING r.snapshot
            "#,
        )
        .bind(resource_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()?
        .map(|raw| raw.snapshot.0)
    }
}
