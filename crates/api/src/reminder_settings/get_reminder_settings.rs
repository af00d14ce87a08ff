use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::get_reminder_settings::*;
use reminder_engine_domain::{ReminderSettings, ID};
use reminder_engine_infra::ReminderContext;

pub async fn get_reminder_settings_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = GetReminderSettingsUseCase {
        organization_id: path.into_inner().org_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|settings| HttpResponse::Ok().json(APIResponse::new(settings)))
        .map_err(|_| ApiError::InternalError)
}

/// Organizations that never saved settings get the defaults
#[derive(Debug)]
pub struct GetReminderSettingsUseCase {
    pub organization_id: ID,
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetReminderSettingsUseCase {
    type Response = ReminderSettings;

    type Errors = ();

    const NAME: &'static str = "GetReminderSettings";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let settings = ctx
            .repos
            .reminder_settings
            .find(&self.organization_id)
            .await
            .unwrap_or_else(|| ReminderSettings::new(self.organization_id.clone()));
        Ok(settings)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::test_utils::setup;

    #[actix_web::test]
    async fn returns_defaults_for_unknown_organization() {
        let ctx = setup().ctx;
        let organization_id = ID::default();
        let mut usecase = GetReminderSettingsUseCase {
            organization_id: organization_id.clone(),
        };
        let settings = usecase.execute(&ctx).await.unwrap();
        assert_eq!(settings, ReminderSettings::new(organization_id.clone()));
        // Reading does not persist anything
        assert!(ctx
            .repos
            .reminder_settings
            .find(&organization_id)
            .await
            .is_none());
    }
}
