use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::register_push_subscription::*;
use reminder_engine_domain::{InvalidSubscriptionError, PushSubscription, ID};
use reminder_engine_infra::ReminderContext;

fn handle_error(e: UseCaseError) -> ApiError {
    match e {
        UseCaseError::InvalidSubscription(e) => ApiError::BadClientData(e.to_string()),
        UseCaseError::StorageError => ApiError::InternalError,
    }
}

pub async fn register_push_subscription_controller(
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let body = body.0;
    let usecase = RegisterPushSubscriptionUseCase {
        user_id: path.into_inner().user_id,
        endpoint: body.endpoint,
        key_p256dh: body.keys.p256dh,
        key_auth: body.keys.auth,
    };

    execute(usecase, &ctx)
        .await
        .map(|subscription| HttpResponse::Ok().json(APIResponse::new(subscription)))
        .map_err(handle_error)
}

/// Registering the same endpoint again refreshes its keys and owner
#[derive(Debug)]
pub struct RegisterPushSubscriptionUseCase {
    pub user_id: ID,
    pub endpoint: String,
    pub key_p256dh: String,
    pub key_auth: String,
}

#[derive(Debug)]
pub enum UseCaseError {
    InvalidSubscription(InvalidSubscriptionError),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for RegisterPushSubscriptionUseCase {
    type Response = PushSubscription;

    type Errors = UseCaseError;

    const NAME: &'static str = "RegisterPushSubscription";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let subscription = PushSubscription::new(
            self.user_id.clone(),
            self.endpoint.clone(),
            self.key_p256dh.clone(),
            self.key_auth.clone(),
            ctx.sys.get_timestamp_millis(),
        )
        .map_err(UseCaseError::InvalidSubscription)?;

        ctx.repos
            .push_subscriptions
            .upsert(&subscription)
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}
