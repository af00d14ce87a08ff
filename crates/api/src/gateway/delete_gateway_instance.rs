use super::{handle_gateway_error, poller::stop_polling};
use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::delete_gateway_instance::*;
use reminder_engine_domain::{ChannelConnection, ID};
use reminder_engine_infra::{GatewayError, ReminderContext};
use tracing::{info, warn};

fn handle_error(e: UseCaseError) -> ApiError {
    match e {
        UseCaseError::GatewayNotConfigured => {
            handle_gateway_error(GatewayError::NotConfigured)
        }
        UseCaseError::Gateway(e) => handle_gateway_error(e),
        UseCaseError::StorageError => ApiError::InternalError,
    }
}

pub async fn delete_gateway_instance_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = DeleteGatewayInstanceUseCase {
        organization_id: path.into_inner().org_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|connection| HttpResponse::Ok().json(APIResponse::new(connection, false)))
        .map_err(handle_error)
}

/// Deletes the remote instance and clears every local credential
#[derive(Debug)]
pub struct DeleteGatewayInstanceUseCase {
    pub organization_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    GatewayNotConfigured,
    Gateway(GatewayError),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for DeleteGatewayInstanceUseCase {
    type Response = ChannelConnection;

    type Errors = UseCaseError;

    const NAME: &'static str = "DeleteGatewayInstance";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        stop_polling(ctx, &self.organization_id);
        let now = ctx.sys.get_timestamp_millis();
        let mut connection = ctx
            .repos
            .channel_connections
            .find(&self.organization_id)
            .await
            .unwrap_or_else(|| ChannelConnection::absent(self.organization_id.clone(), now));

        if let Some(instance_name) = connection.instance_name.clone() {
            if !ctx.gateway.is_configured() {
                return Err(UseCaseError::GatewayNotConfigured);
            }
            if connection.is_connected() {
                if let Err(e) = ctx.gateway.logout(&instance_name).await {
                    warn!(
                        "Unable to log out gateway instance {} before deletion: {}",
                        instance_name, e
                    );
                }
            }
            match ctx.gateway.delete_instance(&instance_name).await {
                Ok(()) | Err(GatewayError::NotFound) => {
                    info!("Gateway instance {} deleted", instance_name)
                }
                Err(e) => return Err(UseCaseError::Gateway(e)),
            }
        }

        connection.reset(now);
        ctx.repos
            .channel_connections
            .save(&connection)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        Ok(connection)
    }
}
