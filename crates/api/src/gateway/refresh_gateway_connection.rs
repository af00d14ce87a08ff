use super::poller::is_polling;
use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::get_gateway_connection::*;
use reminder_engine_domain::{ChannelConnection, ID};
use reminder_engine_infra::{GatewayError, ReminderContext};
use tracing::{info, warn};

pub async fn get_gateway_connection_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let organization_id = path.into_inner().org_id;
    let usecase = RefreshGatewayConnectionUseCase {
        organization_id: organization_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|connection| {
            let polling = is_polling(&ctx, &organization_id);
            HttpResponse::Ok().json(APIResponse::new(connection, polling))
        })
        .map_err(|_| ApiError::InternalError)
}

/// Reads the remote state of the organization's instance and applies it to
/// the stored connection. A gateway that no longer knows the instance resets
/// the connection to `absent`. Other gateway failures leave it untouched, and
/// so does an observation of a row that changed while the gateway was asked.
#[derive(Debug)]
pub struct RefreshGatewayConnectionUseCase {
    pub organization_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for RefreshGatewayConnectionUseCase {
    type Response = ChannelConnection;

    type Errors = UseCaseError;

    const NAME: &'static str = "RefreshGatewayConnection";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let stored = ctx
            .repos
            .channel_connections
            .find(&self.organization_id)
            .await;
        let mut connection = stored
            .clone()
            .unwrap_or_else(|| ChannelConnection::absent(self.organization_id.clone(), now));

        let instance_name = match (&connection.instance_name, ctx.gateway.is_configured()) {
            (Some(name), true) => name.clone(),
            _ => return Ok(connection),
        };

        let changed = match ctx.gateway.connection_state(&instance_name).await {
            Ok(remote) => {
                let changed = connection.observe(&remote, now);
                if changed {
                    info!(
                        "Gateway connection of organization {} is now {}",
                        self.organization_id, connection.state
                    );
                }
                changed
            }
            Err(GatewayError::NotFound) => {
                info!(
                    "Gateway instance {} no longer exists, resetting the connection of organization {}",
                    instance_name, self.organization_id
                );
                connection.reset(now);
                true
            }
            Err(e) => {
                warn!(
                    "Unable to read the state of gateway instance {}: {}",
                    instance_name, e
                );
                false
            }
        };

        if changed {
            let saved = ctx
                .repos
                .channel_connections
                .save_if_unchanged(&connection, stored.as_ref())
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            if !saved {
                info!(
                    "Gateway connection of organization {} changed while its instance was polled, dropping the observation",
                    self.organization_id
                );
                return Ok(ctx
                    .repos
                    .channel_connections
                    .find(&self.organization_id)
                    .await
                    .unwrap_or_else(|| {
                        ChannelConnection::absent(self.organization_id.clone(), now)
                    }));
            }
        }

        Ok(connection)
    }
}
