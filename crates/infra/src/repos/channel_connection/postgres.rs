use super::IChannelConnectionRepo;
use reminder_engine_domain::{ChannelConnection, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;

pub struct PostgresChannelConnectionRepo {
    pool: PgPool,
}

impl PostgresChannelConnectionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ChannelConnectionRaw {
    organization_uid: Uuid,
    instance_name: Option<String>,
    instance_token: Option<String>,
    state: String,
    phone_number: Option<String>,
    profile_name: Option<String>,
    connected_at: Option<i64>,
    pairing_started_at: Option<i64>,
    updated: i64,
}

impl TryFrom<ChannelConnectionRaw> for ChannelConnection {
    type Error = anyhow::Error;

    fn try_from(raw: ChannelConnectionRaw) -> anyhow::Result<Self> {
        Ok(Self {
            organization_id: raw.organization_uid.into(),
            instance_name: raw.instance_name,
            instance_token: raw.instance_token,
            state: raw.state.parse()?,
            phone_number: raw.phone_number,
            profile_name: raw.profile_name,
            connected_at: raw.connected_at,
            pairing_started_at: raw.pairing_started_at,
            updated: raw.updated,
        })
    }
}

#[async_trait::async_trait]
impl IChannelConnectionRepo for PostgresChannelConnectionRepo {
    async fn find(&self, organization_id: &ID) -> Option<ChannelConnection> {
        let raw: ChannelConnectionRaw = match sqlx::query_as(
            r#"
            SELECT * FROM channel_connections AS c
            WHERE c.organization_uid = $1
            "#,
        )
        .bind(organization_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(raw) => raw?,
            Err(e) => {
                error!(
                    "Find channel connection of organization: {} failed. DB returned error: {:?}",
                    organization_id, e
                );
                return None;
            }
        };
        raw.try_into().ok()
    }

    async fn save(&self, connection: &ChannelConnection) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channel_connections
                (organization_uid, instance_name, instance_token, state, phone_number,
                profile_name, connected_at, pairing_started_at, updated)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (organization_uid) DO UPDATE SET
                instance_name = EXCLUDED.instance_name,
                instance_token = EXCLUDED.instance_token,
                state = EXCLUDED.state,
                phone_number = EXCLUDED.phone_number,
                profile_name = EXCLUDED.profile_name,
                connected_at = EXCLUDED.connected_at,
                pairing_started_at = EXCLUDED.pairing_started_at,
                updated = EXCLUDED.updated
            "#,
        )
        .bind(connection.organization_id.inner_ref())
        .bind(&connection.instance_name)
        .bind(&connection.instance_token)
        .bind(connection.state.as_str())
        .bind(&connection.phone_number)
        .bind(&connection.profile_name)
        .bind(connection.connected_at)
        .bind(connection.pairing_started_at)
        .bind(connection.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to save channel connection of organization: {}. DB returned error: {:?}",
                connection.organization_id, e
            );
            e
        })?;
        Ok(())
    }

    async fn save_if_unchanged(
        &self,
        connection: &ChannelConnection,
        expected: Option<&ChannelConnection>,
    ) -> anyhow::Result<bool> {
        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO channel_connections
                        (organization_uid, instance_name, instance_token, state, phone_number,
                        profile_name, connected_at, pairing_started_at, updated)
                    VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (organization_uid) DO NOTHING
                    "#,
                )
                .bind(connection.organization_id.inner_ref())
                .bind(&connection.instance_name)
                .bind(&connection.instance_token)
                .bind(connection.state.as_str())
                .bind(&connection.phone_number)
                .bind(&connection.profile_name)
                .bind(connection.connected_at)
                .bind(connection.pairing_started_at)
                .bind(connection.updated)
                .execute(&self.pool)
                .await
            }
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE channel_connections AS c SET
                        instance_name = $2,
                        instance_token = $3,
                        state = $4,
                        phone_number = $5,
                        profile_name = $6,
                        connected_at = $7,
                        pairing_started_at = $8,
                        updated = $9
                    WHERE c.organization_uid = $1
                        AND c.instance_name IS NOT DISTINCT FROM $10
                        AND c.instance_token IS NOT DISTINCT FROM $11
                        AND c.state = $12
                        AND c.updated = $13
                    "#,
                )
                .bind(connection.organization_id.inner_ref())
                .bind(&connection.instance_name)
                .bind(&connection.instance_token)
                .bind(connection.state.as_str())
                .bind(&connection.phone_number)
                .bind(&connection.profile_name)
                .bind(connection.connected_at)
                .bind(connection.pairing_started_at)
                .bind(connection.updated)
                .bind(&expected.instance_name)
                .bind(&expected.instance_token)
                .bind(expected.state.as_str())
                .bind(expected.updated)
                .execute(&self.pool)
                .await
            }
        };

        let result = result.map_err(|e| {
            error!(
                "Unable to save channel connection of organization: {}. DB returned error: {:?}",
                connection.organization_id, e
            );
            e
        })?;
        Ok(result.rows_affected() == 1)
    }
}
