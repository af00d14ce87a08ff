use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::unregister_push_subscription::*;
use reminder_engine_domain::{PushSubscription, ID};
use reminder_engine_infra::ReminderContext;

fn handle_error(e: UseCaseError) -> ApiError {
    match e {
        UseCaseError::NotFound(id) => ApiError::NotFound(format!(
            "The push subscription with id: {}, was not found.",
            id
        )),
    }
}

pub async fn unregister_push_subscription_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = UnregisterPushSubscriptionUseCase {
        subscription_id: path.into_inner().subscription_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|subscription| HttpResponse::Ok().json(APIResponse::new(subscription)))
        .map_err(handle_error)
}

#[derive(Debug)]
pub struct UnregisterPushSubscriptionUseCase {
    pub subscription_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
}

#[async_trait::async_trait(?Send)]
impl UseCase for UnregisterPushSubscriptionUseCase {
    type Response = PushSubscription;

    type Errors = UseCaseError;

    const NAME: &'static str = "UnregisterPushSubscription";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        ctx.repos
            .push_subscriptions
            .delete(&self.subscription_id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.subscription_id.clone()))
    }
}
