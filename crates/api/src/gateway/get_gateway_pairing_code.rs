use super::{
    handle_gateway_error, poller::is_polling, PairingOutcome, StartPollingWhilePairing,
};
use crate::error::ApiError;
use crate::shared::usecase::{execute, Subscriber, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::get_gateway_pairing_code::*;
use reminder_engine_domain::{ChannelConnection, ConnectionState, ID};
use reminder_engine_infra::{ConnectOutcome, GatewayError, ReminderContext};

fn handle_error(e: UseCaseError) -> ApiError {
    match e {
        UseCaseError::GatewayNotConfigured => {
            handle_gateway_error(GatewayError::NotConfigured)
        }
        UseCaseError::NoInstance => ApiError::NotFound(
            "The organization has no gateway instance. Start pairing first.".into(),
        ),
        UseCaseError::AlreadyConnected => {
            ApiError::Conflict("The gateway is already connected.".into())
        }
        UseCaseError::Gateway(e) => handle_gateway_error(e),
        UseCaseError::StorageError => ApiError::InternalError,
    }
}

pub async fn get_gateway_pairing_code_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let organization_id = path.into_inner().org_id;
    let usecase = GetGatewayPairingCodeUseCase {
        organization_id: organization_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|res| {
            let polling = is_polling(&ctx, &organization_id);
            HttpResponse::Ok().json(APIResponse::new(res.connection, res.pairing, polling))
        })
        .map_err(handle_error)
}

/// Fetches a fresh pairing payload for the existing instance, e.g. after the
/// pairing window elapsed
#[derive(Debug)]
pub struct GetGatewayPairingCodeUseCase {
    pub organization_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    GatewayNotConfigured,
    NoInstance,
    AlreadyConnected,
    Gateway(GatewayError),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetGatewayPairingCodeUseCase {
    type Response = PairingOutcome;

    type Errors = UseCaseError;

    const NAME: &'static str = "GetGatewayPairingCode";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        if !ctx.gateway.is_configured() {
            return Err(UseCaseError::GatewayNotConfigured);
        }
        let now = ctx.sys.get_timestamp_millis();
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
        if connection.is_connected() {
            return Err(UseCaseError::AlreadyConnected);
        }

        let pairing = match ctx.gateway.connect(&instance_name).await {
            Ok(ConnectOutcome::Pairing(payload)) => {
                if connection.state != ConnectionState::Pairing {
                    connection
                        .begin_pairing(instance_name, None, now)
                        .map_err(|_| UseCaseError::AlreadyConnected)?;
                    save(&connection, ctx).await?;
                }
                Some(payload)
            }
            Ok(ConnectOutcome::AlreadyOpen) => {
                if let Ok(remote) = ctx.gateway.connection_state(&instance_name).await {
                    if connection.observe(&remote, now) {
                        save(&connection, ctx).await?;
                    }
                }
                None
            }
            Err(GatewayError::NotFound) => {
                connection.reset(now);
                save(&connection, ctx).await?;
                return Err(UseCaseError::Gateway(GatewayError::NotFound));
            }
            Err(e) => return Err(UseCaseError::Gateway(e)),
        };

        Ok(PairingOutcome {
            connection,
            pairing,
        })
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(StartPollingWhilePairing)]
    }
}

async fn save(connection: &ChannelConnection, ctx: &ReminderContext) -> Result<(), UseCaseError> {
    ctx.repos
        .channel_connections
        .save(connection)
        .await
        .map_err(|_| UseCaseError::StorageError)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::test_utils::{pairing_payload, setup, START_TS};

    async fn pairing_connection(ctx: &ReminderContext) -> ID {
        let organization_id = ID::default();
        let mut connection = ChannelConnection::absent(organization_id.clone(), START_TS);
        connection
            .begin_pairing("org-test".into(), None, START_TS)
            .unwrap();
        ctx.repos.channel_connections.save(&connection).await.unwrap();
        organization_id
    }

    #[actix_web::test]
    async fn returns_fresh_payload_for_existing_instance() {
        let test = setup();
        let organization_id = pairing_connection(&test.ctx).await;
        let mut usecase = GetGatewayPairingCodeUseCase {
            organization_id: organization_id.clone(),
        };
        let res = usecase.execute(&test.ctx).await.unwrap();
        assert_eq!(res.pairing, Some(pairing_payload()));
        assert_eq!(res.connection.instance_name.as_deref(), Some("org-test"));
        assert!(test.gateway.created.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn requires_an_instance() {
        let test = setup();
        let mut usecase = GetGatewayPairingCodeUseCase {
            organization_id: ID::default(),
        };
        assert!(matches!(
            usecase.execute(&test.ctx).await,
            Err(UseCaseError::NoInstance)
        ));
    }

    #[actix_web::test]
    async fn unknown_instance_resets_to_absent() {
        let test = setup();
        let organization_id = pairing_connection(&test.ctx).await;
        *test.gateway.connect_outcome.lock().unwrap() = Err(GatewayError::NotFound);

        let mut usecase = GetGatewayPairingCodeUseCase {
            organization_id: organization_id.clone(),
        };
        assert!(matches!(
            usecase.execute(&test.ctx).await,
            Err(UseCaseError::Gateway(GatewayError::NotFound))
        ));
        let connection = test
            .ctx
            .repos
            .channel_connections
            .find(&organization_id)
            .await
            .unwrap();
        assert_eq!(connection.state, ConnectionState::Absent);
        assert_eq!(connection.instance_name, None);
    }
}
