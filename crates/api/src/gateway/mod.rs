mod delete_gateway_instance;
mod get_gateway_pairing_code;
mod initiate_gateway_pairing;
mod logout_gateway;
mod poller;
mod polling;
mod refresh_gateway_connection;

use crate::error::ApiError;
use crate::shared::usecase::{Subscriber, UseCase};
use actix_web::web;
use delete_gateway_instance::delete_gateway_instance_controller;
use get_gateway_pairing_code::get_gateway_pairing_code_controller;
use initiate_gateway_pairing::initiate_gateway_pairing_controller;
use logout_gateway::logout_gateway_controller;
use polling::{start_gateway_polling_controller, stop_gateway_polling_controller};
use refresh_gateway_connection::get_gateway_connection_controller;
use reminder_engine_domain::{ChannelConnection, ConnectionState, PairingPayload};
use reminder_engine_infra::{GatewayError, ReminderContext};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/organizations/{org_id}/gateway",
        web::get().to(get_gateway_connection_controller),
    );
    cfg.route(
        "/organizations/{org_id}/gateway",
        web::post().to(initiate_gateway_pairing_controller),
    );
    cfg.route(
        "/organizations/{org_id}/gateway",
        web::delete().to(delete_gateway_instance_controller),
    );
    cfg.route(
        "/organizations/{org_id}/gateway/pairing-code",
        web::get().to(get_gateway_pairing_code_controller),
    );
    cfg.route(
        "/organizations/{org_id}/gateway/polling",
        web::post().to(start_gateway_polling_controller),
    );
    cfg.route(
        "/organizations/{org_id}/gateway/polling",
        web::delete().to(stop_gateway_polling_controller),
    );
    cfg.route(
        "/organizations/{org_id}/gateway/logout",
        web::post().to(logout_gateway_controller),
    );
}

fn handle_gateway_error(e: GatewayError) -> ApiError {
    match e {
        GatewayError::NotConfigured => ApiError::ServiceUnavailable(e.to_string()),
        GatewayError::NotFound => ApiError::NotFound(
            "The gateway instance no longer exists. Start pairing again.".into(),
        ),
        GatewayError::Transient(_) | GatewayError::Rejected(_) | GatewayError::InvalidResponse(_) => {
            ApiError::ServiceUnavailable(e.to_string())
        }
    }
}

/// Connection and, while the phone still has to be paired, what to show the
/// administrator
#[derive(Debug)]
pub struct PairingOutcome {
    pub connection: ChannelConnection,
    pub pairing: Option<PairingPayload>,
}

/// Watches the connection until the phone is paired
pub struct StartPollingWhilePairing;

#[async_trait::async_trait(?Send)]
impl<U> Subscriber<U> for StartPollingWhilePairing
where
    U: UseCase<Response = PairingOutcome>,
{
    async fn notify(&self, e: &U::Response, ctx: &ReminderContext) {
        if e.connection.state == ConnectionState::Pairing {
            poller::start_polling(ctx, &e.connection.organization_id);
        }
    }
}
