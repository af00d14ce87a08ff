use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::get_notification_logs::*;
use reminder_engine_domain::{NotificationLogEntry, ID};
use reminder_engine_infra::ReminderContext;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

pub async fn get_notification_logs_controller(
    path: web::Path<PathParams>,
    query: web::Query<QueryParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = GetNotificationLogsUseCase {
        organization_id: path.into_inner().org_id,
        limit: query.limit,
    };

    execute(usecase, &ctx)
        .await
        .map(|entries| HttpResponse::Ok().json(APIResponse::new(entries)))
        .map_err(|_| ApiError::InternalError)
}

/// Newest entries first
#[derive(Debug)]
pub struct GetNotificationLogsUseCase {
    pub organization_id: ID,
    pub limit: Option<usize>,
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetNotificationLogsUseCase {
    type Response = Vec<NotificationLogEntry>;

    type Errors = ();

    const NAME: &'static str = "GetNotificationLogs";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Ok(ctx
            .repos
            .notification_log
            .find_by_organization(&self.organization_id, limit)
            .await)
    }
}
