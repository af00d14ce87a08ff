use super::poller::{is_polling, start_polling, stop_polling};
use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::{start_gateway_polling, stop_gateway_polling};
use reminder_engine_domain::{ChannelConnection, ID};
use reminder_engine_infra::ReminderContext;

fn handle_error(e: UseCaseError) -> ApiError {
    match e {
        UseCaseError::NoInstance => ApiError::NotFound(
            "The organization has no gateway instance. Start pairing first.".into(),
        ),
    }
}

pub async fn start_gateway_polling_controller(
    path: web::Path<start_gateway_polling::PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let organization_id = path.into_inner().org_id;
    let usecase = StartGatewayPollingUseCase {
        organization_id: organization_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|connection| {
            let polling = is_polling(&ctx, &organization_id);
            HttpResponse::Ok().json(start_gateway_polling::APIResponse::new(connection, polling))
        })
        .map_err(handle_error)
}

pub async fn stop_gateway_polling_controller(
    path: web::Path<stop_gateway_polling::PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = StopGatewayPollingUseCase {
        organization_id: path.into_inner().org_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|connection| {
            HttpResponse::Ok().json(stop_gateway_polling::APIResponse::new(connection, false))
        })
        .map_err(|_| ApiError::InternalError)
}

#[derive(Debug)]
pub struct StartGatewayPollingUseCase {
    pub organization_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    NoInstance,
}

#[async_trait::async_trait(?Send)]
impl UseCase for StartGatewayPollingUseCase {
    type Response = ChannelConnection;

    type Errors = UseCaseError;

    const NAME: &'static str = "StartGatewayPolling";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let connection = match ctx.repos.channel_connections.find(&self.organization_id).await {
            Some(connection) if connection.instance_name.is_some() => connection,
            _ => return Err(UseCaseError::NoInstance),
        };
        start_polling(ctx, &self.organization_id);
        Ok(connection)
    }
}

#[derive(Debug)]
pub struct StopGatewayPollingUseCase {
    pub organization_id: ID,
}

#[async_trait::async_trait(?Send)]
impl UseCase for StopGatewayPollingUseCase {
    type Response = ChannelConnection;

    type Errors = ();

    const NAME: &'static str = "StopGatewayPolling";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        stop_polling(ctx, &self.organization_id);
        let connection = ctx
            .repos
            .channel_connections
            .find(&self.organization_id)
            .await
            .unwrap_or_else(|| {
                ChannelConnection::absent(
                    self.organization_id.clone(),
                    ctx.sys.get_timestamp_millis(),
                )
            });
        Ok(connection)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::test_utils::{setup, START_TS};

    #[actix_web::test]
    async fn start_and_stop() {
        let test = setup();
        let organization_id = ID::default();
        let mut start = StartGatewayPollingUseCase {
            organization_id: organization_id.clone(),
        };
        assert!(matches!(
            start.execute(&test.ctx).await,
            Err(UseCaseError::NoInstance)
        ));

        let mut connection = ChannelConnection::absent(organization_id.clone(), START_TS);
        connection
            .begin_pairing("org-test".into(), None, START_TS)
            .unwrap();
        test.ctx
            .repos
            .channel_connections
            .save(&connection)
            .await
            .unwrap();

        start.execute(&test.ctx).await.unwrap();
        assert!(is_polling(&test.ctx, &organization_id));

        let mut stop = StopGatewayPollingUseCase {
            organization_id: organization_id.clone(),
        };
        stop.execute(&test.ctx).await.unwrap();
        assert!(!is_polling(&test.ctx, &organization_id));
    }
}
