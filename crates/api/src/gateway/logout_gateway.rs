use super::{handle_gateway_error, poller::stop_polling};
use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::logout_gateway::*;
use reminder_engine_domain::{ChannelConnection, ID};
use reminder_engine_infra::{GatewayError, ReminderContext};
use tracing::info;

fn handle_error(e: UseCaseError) -> ApiError {
    match e {
        UseCaseError::GatewayNotConfigured => {
            handle_gateway_error(GatewayError::NotConfigured)
        }
        UseCaseError::NoInstance => {
            ApiError::NotFound("The organization has no gateway instance.".into())
        }
        UseCaseError::Gateway(e) => handle_gateway_error(e),
        UseCaseError::StorageError => ApiError::InternalError,
    }
}

pub async fn logout_gateway_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = LogoutGatewayUseCase {
        organization_id: path.into_inner().org_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|connection| HttpResponse::Ok().json(APIResponse::new(connection, false)))
        .map_err(handle_error)
}

/// Logs the phone out. The instance is kept so it can be paired again.
#[derive(Debug)]
pub struct LogoutGatewayUseCase {
    pub organization_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    GatewayNotConfigured,
    NoInstance,
    Gateway(GatewayError),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for LogoutGatewayUseCase {
    type Response = ChannelConnection;

    type Errors = UseCaseError;

    const NAME: &'static str = "LogoutGateway";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        if !ctx.gateway.is_configured() {
            return Err(UseCaseError::GatewayNotConfigured);
        }
        let mut connection = ctx
            .repos
            .channel_connections
            .find(&self.organization_id)
            .await
            .ok_or(UseCaseError::NoInstance)?;
        let instance_name = connection
            .instance_name
            .clone()
            .ok_or(UseCaseError::NoInstance)?;

        stop_polling(ctx, &self.organization_id);
        let now = ctx.sys.get_timestamp_millis();
        match ctx.gateway.logout(&instance_name).await {
            Ok(()) => {
                connection
                    .mark_logged_out(now)
                    .map_err(|_| UseCaseError::NoInstance)?;
                info!("Gateway instance {} logged out", instance_name);
            }
            Err(GatewayError::NotFound) => {
                info!(
                    "Gateway instance {} no longer exists, resetting the connection",
                    instance_name
                );
                connection.reset(now);
            }
            Err(e) => return Err(UseCaseError::Gateway(e)),
        }

        ctx.repos
            .channel_connections
            .save(&connection)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        Ok(connection)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::test_utils::{connect_gateway, setup};
    use reminder_engine_domain::ConnectionState;

    #[actix_web::test]
    async fn logout_disconnects_and_keeps_instance() {
        let test = setup();
        let organization_id = ID::default();
        connect_gateway(&test.ctx, &organization_id).await;

        let mut usecase = LogoutGatewayUseCase {
            organization_id: organization_id.clone(),
        };
        let connection = usecase.execute(&test.ctx).await.unwrap();
        assert_eq!(connection.state, ConnectionState::Disconnected);
        assert_eq!(connection.instance_name.as_deref(), Some("org-test"));
    }

    #[actix_web::test]
    async fn logout_without_instance_fails() {
        let test = setup();
        let mut usecase = LogoutGatewayUseCase {
            organization_id: ID::default(),
        };
        assert!(matches!(
            usecase.execute(&test.ctx).await,
            Err(UseCaseError::NoInstance)
        ));
    }
}
