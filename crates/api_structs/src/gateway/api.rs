use crate::dtos::{ChannelConnectionDTO, PairingPayloadDTO};
use reminder_engine_domain::{ChannelConnection, PairingPayload, ID};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct PathParams {
    pub org_id: ID,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConnectionResponse {
    pub connection: ChannelConnectionDTO,
}

impl ChannelConnectionResponse {
    pub fn new(connection: ChannelConnection, polling: bool) -> Self {
        Self {
            connection: ChannelConnectionDTO::new(connection, polling),
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingResponse {
    pub connection: ChannelConnectionDTO,
    /// `None` when the phone is already paired
    pub pairing: Option<PairingPayloadDTO>,
}

impl PairingResponse {
    pub fn new(connection: ChannelConnection, pairing: Option<PairingPayload>, polling: bool) -> Self {
        Self {
            connection: ChannelConnectionDTO::new(connection, polling),
            pairing: pairing.map(PairingPayloadDTO::new),
        }
    }
}

pub mod get_gateway_connection {
    pub use super::PathParams;

    pub type APIResponse = super::ChannelConnectionResponse;
}

pub mod initiate_gateway_pairing {
    pub use super::PathParams;

    pub type APIResponse = super::PairingResponse;
}

pub mod get_gateway_pairing_code {
    pub use super::PathParams;

    pub type APIResponse = super::PairingResponse;
}

pub mod start_gateway_polling {
    pub use super::PathParams;

    pub type APIResponse = super::ChannelConnectionResponse;
}

pub mod stop_gateway_polling {
    pub use super::PathParams;

    pub type APIResponse = super::ChannelConnectionResponse;
}

pub mod logout_gateway {
    pub use super::PathParams;

    pub type APIResponse = super::ChannelConnectionResponse;
}

pub mod delete_gateway_instance {
    pub use super::PathParams;

    pub type APIResponse = super::ChannelConnectionResponse;
}
