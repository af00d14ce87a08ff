use super::{
    handle_gateway_error, poller::is_polling, PairingOutcome, StartPollingWhilePairing,
};
use crate::error::ApiError;
use crate::shared::usecase::{execute, Subscriber, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::initiate_gateway_pairing::*;
use reminder_engine_domain::{ChannelConnection, ID};
use reminder_engine_infra::{ConnectOutcome, GatewayError, ReminderContext};
use reminder_engine_utils::create_random_secret;
use tracing::info;

fn handle_error(e: UseCaseError) -> ApiError {
    match e {
        UseCaseError::GatewayNotConfigured => {
            handle_gateway_error(GatewayError::NotConfigured)
        }
        UseCaseError::AlreadyConnected => {
            ApiError::Conflict("The gateway is already connected. Log out first.".into())
        }
        UseCaseError::Gateway(e) => handle_gateway_error(e),
        UseCaseError::StorageError => ApiError::InternalError,
    }
}

pub async fn initiate_gateway_pairing_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let organization_id = path.into_inner().org_id;
    let usecase = InitiateGatewayPairingUseCase {
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

/// Creates the remote instance of the organization, unless one exists from
/// an earlier pairing, and asks the gateway for a pairing payload
#[derive(Debug)]
pub struct InitiateGatewayPairingUseCase {
    pub organization_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    GatewayNotConfigured,
    AlreadyConnected,
    Gateway(GatewayError),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for InitiateGatewayPairingUseCase {
    type Response = PairingOutcome;

    type Errors = UseCaseError;

    const NAME: &'static str = "InitiateGatewayPairing";

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
            .unwrap_or_else(|| ChannelConnection::absent(self.organization_id.clone(), now));
        if connection.is_connected() {
            return Err(UseCaseError::AlreadyConnected);
        }

        let (instance_name, token) = match connection.instance_name.clone() {
            Some(name) => (name, None),
            None => {
                let name = format!("org-{}-{}", self.organization_id, create_random_secret(6));
                let created = ctx
                    .gateway
                    .create_instance(&name)
                    .await
                    .map_err(UseCaseError::Gateway)?;
                info!(
                    "Created gateway instance {} for organization {}",
                    created.instance_name, self.organization_id
                );
                (created.instance_name, created.token)
            }
        };
        connection
            .begin_pairing(instance_name.clone(), token, now)
            .map_err(|_| UseCaseError::AlreadyConnected)?;
        save(&connection, ctx).await?;

        let pairing = match ctx.gateway.connect(&instance_name).await {
            Ok(ConnectOutcome::Pairing(payload)) => Some(payload),
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
    use crate::gateway::poller::stop_polling;
    use crate::shared::test_utils::{
        connect_gateway, pairing_payload, remote, setup, setup_with_gateway, FakeGateway,
    };
    use reminder_engine_domain::{ConnectionState, RemoteInstanceState};

    #[actix_web::test]
    async fn creates_instance_and_starts_polling() {
        let test = setup();
        let organization_id = ID::default();
        let usecase = InitiateGatewayPairingUseCase {
            organization_id: organization_id.clone(),
        };
        let res = execute(usecase, &test.ctx).await.unwrap();
        assert_eq!(res.connection.state, ConnectionState::Pairing);
        assert_eq!(res.pairing, Some(pairing_payload()));
        assert_eq!(res.connection.instance_token.as_deref(), Some("instance-token"));

        let created = test.gateway.created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert!(created[0].starts_with(&format!("org-{}-", organization_id)));
        assert!(is_polling(&test.ctx, &organization_id));
        stop_polling(&test.ctx, &organization_id);
    }

    #[actix_web::test]
    async fn pairing_again_reuses_the_instance() {
        let test = setup();
        let organization_id = ID::default();
        let mut usecase = InitiateGatewayPairingUseCase {
            organization_id: organization_id.clone(),
        };
        let first = usecase.execute(&test.ctx).await.unwrap();
        let second = usecase.execute(&test.ctx).await.unwrap();
        assert_eq!(first.connection.instance_name, second.connection.instance_name);
        assert_eq!(test.gateway.created.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn failed_creation_leaves_absent() {
        let test = setup();
        *test.gateway.create_result.lock().unwrap() =
            Err(GatewayError::Transient("status 503".into()));
        let organization_id = ID::default();
        let mut usecase = InitiateGatewayPairingUseCase {
            organization_id: organization_id.clone(),
        };
        assert!(matches!(
            usecase.execute(&test.ctx).await,
            Err(UseCaseError::Gateway(GatewayError::Transient(_)))
        ));
        assert!(test
            .ctx
            .repos
            .channel_connections
            .find(&organization_id)
            .await
            .is_none());
    }

    #[actix_web::test]
    async fn rejects_when_connected_or_unconfigured() {
        let test = setup();
        let organization_id = ID::default();
        connect_gateway(&test.ctx, &organization_id).await;
        let mut usecase = InitiateGatewayPairingUseCase {
            organization_id: organization_id.clone(),
        };
        assert!(matches!(
            usecase.execute(&test.ctx).await,
            Err(UseCaseError::AlreadyConnected)
        ));

        let test = setup_with_gateway(FakeGateway::unconfigured());
        assert!(matches!(
            usecase.execute(&test.ctx).await,
            Err(UseCaseError::GatewayNotConfigured)
        ));
    }

    #[actix_web::test]
    async fn already_open_instance_connects_without_payload() {
        let test = setup();
        *test.gateway.connect_outcome.lock().unwrap() = Ok(ConnectOutcome::AlreadyOpen);
        test.gateway
            .set_remote_state(Ok(remote(RemoteInstanceState::Open)));

        let organization_id = ID::default();
        let usecase = InitiateGatewayPairingUseCase {
            organization_id: organization_id.clone(),
        };
        let res = execute(usecase, &test.ctx).await.unwrap();
        assert_eq!(res.pairing, None);
        assert_eq!(res.connection.state, ConnectionState::Connected);
        assert!(!is_polling(&test.ctx, &organization_id));
    }
}
