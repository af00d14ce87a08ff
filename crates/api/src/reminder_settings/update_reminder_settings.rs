use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use chrono_tz::Tz;
use reminder_engine_api_structs::update_reminder_settings::*;
use reminder_engine_domain::{
    DeliveryChannel, IntervalFollowUp, InvalidSettingsError, ReminderSettings, TriggerTemplates,
    ID,
};
use reminder_engine_infra::ReminderContext;
use tracing::info;

fn handle_error(e: UseCaseError) -> ApiError {
    match e {
        UseCaseError::InvalidTimezone(tz) => {
            ApiError::BadClientData(format!("Invalid timezone provided: {}", tz))
        }
        UseCaseError::InvalidSettings(err) => ApiError::BadClientData(format!(
            "Bad reminder settings provided. Error message: {}",
            err
        )),
        UseCaseError::StorageError => ApiError::InternalError,
    }
}

pub async fn update_reminder_settings_controller(
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let body = body.0;
    let usecase = UpdateReminderSettingsUseCase {
        organization_id: path.into_inner().org_id,
        enabled: body.enabled,
        channel: body.channel,
        timezone: body.timezone,
        triggers: body.triggers,
        follow_up: body.follow_up,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| HttpResponse::Ok().json(APIResponse::new(res.settings)))
        .map_err(handle_error)
}

#[derive(Debug)]
pub struct UpdateReminderSettingsUseCase {
    pub organization_id: ID,
    pub enabled: bool,
    pub channel: DeliveryChannel,
    pub timezone: String,
    pub triggers: TriggerTemplates,
    pub follow_up: IntervalFollowUp,
}

#[derive(Debug)]
pub struct UseCaseResponse {
    pub settings: ReminderSettings,
    /// Pending reminders cancelled because their trigger got disabled
    pub cancelled: u64,
}

#[derive(Debug)]
pub enum UseCaseError {
    InvalidTimezone(String),
    InvalidSettings(InvalidSettingsError),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateReminderSettingsUseCase {
    type Response = UseCaseResponse;

    type Errors = UseCaseError;

    const NAME: &'static str = "UpdateReminderSettings";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let timezone = self
            .timezone
            .parse::<Tz>()
            .map_err(|_| UseCaseError::InvalidTimezone(self.timezone.clone()))?;

        let settings = ReminderSettings {
            organization_id: self.organization_id.clone(),
            enabled: self.enabled,
            channel: self.channel,
            timezone,
            triggers: self.triggers.clone(),
            follow_up: self.follow_up.clone(),
            updated: ctx.sys.get_timestamp_millis(),
        };
        settings.validate().map_err(UseCaseError::InvalidSettings)?;

        ctx.repos
            .reminder_settings
            .save(&settings)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let disabled = settings.disabled_triggers();
        let cancelled = if disabled.is_empty() {
            0
        } else {
            ctx.repos
                .scheduled_reminders
                .cancel_pending_by_organization(&self.organization_id, Some(&disabled))
                .await
                .map_err(|_| UseCaseError::StorageError)?
        };
        if cancelled > 0 {
            info!(
                "Cancelled {} pending reminders of disabled triggers {:?}",
                cancelled, disabled
            );
        }

        Ok(UseCaseResponse {
            settings,
            cancelled,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::test_utils::{setup, task, DAY, START_TS};
    use reminder_engine_domain::{
        RepeatDuration, RepeatRule, RepeatType, ReminderStatus, ScheduledReminder, TriggerKind,
    };

    fn usecase(organization_id: &ID) -> UpdateReminderSettingsUseCase {
        let defaults = ReminderSettings::new(organization_id.clone());
        UpdateReminderSettingsUseCase {
            organization_id: organization_id.clone(),
            enabled: true,
            channel: DeliveryChannel::Both,
            timezone: "America/Sao_Paulo".into(),
            triggers: defaults.triggers,
            follow_up: defaults.follow_up,
        }
    }

    #[actix_web::test]
    async fn saves_valid_settings() {
        let ctx = setup().ctx;
        let organization_id = ID::default();
        let res = usecase(&organization_id).execute(&ctx).await.unwrap();
        assert_eq!(res.settings.timezone, chrono_tz::America::Sao_Paulo);
        assert_eq!(res.settings.updated, START_TS);

        let stored = ctx
            .repos
            .reminder_settings
            .find(&organization_id)
            .await
            .unwrap();
        assert_eq!(stored, res.settings);
    }

    #[actix_web::test]
    async fn rejects_invalid_timezone() {
        let ctx = setup().ctx;
        let mut usecase = usecase(&ID::default());
        usecase.timezone = "Mars/Olympus".into();
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::InvalidTimezone(_))
        ));
    }

    #[actix_web::test]
    async fn rejects_zero_interval_rule_without_saving() {
        let ctx = setup().ctx;
        let organization_id = ID::default();
        let mut usecase = usecase(&organization_id);
        usecase.triggers.on_due.repeat =
            RepeatRule::every(RepeatType::Days, 0, RepeatDuration::Forever);
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::InvalidSettings(
                InvalidSettingsError::InvalidRule { .. }
            ))
        ));
        assert!(ctx
            .repos
            .reminder_settings
            .find(&organization_id)
            .await
            .is_none());
    }

    #[actix_web::test]
    async fn disabling_a_trigger_cancels_its_pending_reminders() {
        let ctx = setup().ctx;
        let organization_id = ID::default();
        let resource = task(&organization_id);
        let on_due = ScheduledReminder::new(
            &resource,
            TriggerKind::OnDue,
            0,
            START_TS + 2 * DAY,
            DeliveryChannel::Push,
            START_TS,
        );
        let before_due = ScheduledReminder::new(
            &resource,
            TriggerKind::BeforeDue,
            0,
            START_TS + DAY,
            DeliveryChannel::Push,
            START_TS,
        );
        ctx.repos
            .scheduled_reminders
            .insert_many(&[on_due.clone(), before_due.clone()])
            .await
            .unwrap();

        let mut usecase = usecase(&organization_id);
        usecase.triggers.on_due.enabled = false;
        let res = usecase.execute(&ctx).await.unwrap();
        assert_eq!(res.cancelled, 1);

        let on_due = ctx.repos.scheduled_reminders.find(&on_due.id).await.unwrap();
        assert_eq!(on_due.status, ReminderStatus::Cancelled);
        let before_due = ctx
            .repos
            .scheduled_reminders
            .find(&before_due.id)
            .await
            .unwrap();
        assert_eq!(before_due.status, ReminderStatus::Pending);
    }

    #[actix_web::test]
    async fn turning_reminders_off_cancels_everything() {
        let ctx = setup().ctx;
        let organization_id = ID::default();
        let resource = task(&organization_id);
        let reminder = ScheduledReminder::new(
            &resource,
            TriggerKind::AfterCreation,
            0,
            START_TS,
            DeliveryChannel::Push,
            START_TS,
        );
        ctx.repos
            .scheduled_reminders
            .insert_many(&[reminder.clone()])
            .await
            .unwrap();

        let mut usecase = usecase(&organization_id);
        usecase.enabled = false;
        let res = usecase.execute(&ctx).await.unwrap();
        assert_eq!(res.cancelled, 1);
    }
}
