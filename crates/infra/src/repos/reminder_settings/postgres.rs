use super::IReminderSettingsRepo;
use reminder_engine_domain::{ReminderSettings, ID};
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use tracing::error;

pub struct PostgresReminderSettingsRepo {
    pool: PgPool,
}

impl PostgresReminderSettingsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderSettingsRaw {
    organization_uid: Uuid,
    enabled: bool,
    channel: String,
    timezone: String,
    triggers: serde_json::Value,
    follow_up: serde_json::Value,
    updated: i64,
}

impl TryFrom<ReminderSettingsRaw> for ReminderSettings {
    type Error = anyhow::Error;

    fn try_from(raw: ReminderSettingsRaw) -> anyhow::Result<Self> {
        Ok(Self {
            organization_id: raw.organization_uid.into(),
            enabled: raw.enabled,
            channel: raw.channel.parse()?,
            timezone: raw.timezone.parse().map_err(anyhow::Error::msg)?,
            triggers: serde_json::from_value(raw.triggers)?,
            follow_up: serde_json::from_value(raw.follow_up)?,
            updated: raw.updated,
        })
    }
}

#[async_trait::async_trait]
impl IReminderSettingsRepo for PostgresReminderSettingsRepo {
    async fn find(&self, organization_id: &ID) -> Option<ReminderSettings> {
        let raw: ReminderSettingsRaw = match sqlx::query_as(
            r#"
            SELECT * FROM reminder_settings AS s
            WHERE s.organization_uid = $1
            "#,
        )
        .bind(organization_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!(
                    "Find reminder settings for organization: {} failed. DB returned error: {:?}",
                    organization_id, e
                );
                return None;
            }
        };
        match raw.try_into() {
            Ok(settings) => Some(settings),
            Err(e) => {
                error!(
                    "Stored reminder settings for organization: {} are malformed: {:?}",
                    organization_id, e
                );
                None
            }
        }
    }

    async fn save(&self, settings: &ReminderSettings) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminder_settings
                (organization_uid, enabled, channel, timezone, triggers, follow_up, updated)
            VALUES($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (organization_uid) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                channel = EXCLUDED.channel,
                timezone = EXCLUDED.timezone,
                triggers = EXCLUDED.triggers,
                follow_up = EXCLUDED.follow_up,
                updated = EXCLUDED.updated
            "#,
        )
        .bind(settings.organization_id.inner_ref())
        .bind(settings.enabled)
        .bind(settings.channel.as_str())
        .bind(settings.timezone.name())
        .bind(Json(&settings.triggers))
        .bind(Json(&settings.follow_up))
        .bind(settings.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to save reminder settings: {:?}. DB returned error: {:?}",
                settings, e
            );
            e
        })?;
        Ok(())
    }
}
