use reminder_engine_domain::{ChannelConnection, ConnectionState, PairingPayload, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConnectionDTO {
    pub organization_id: ID,
    pub instance_name: Option<String>,
    pub state: ConnectionState,
    pub phone_number: Option<String>,
    pub profile_name: Option<String>,
    pub connected_at: Option<i64>,
    pub polling: bool,
}

impl ChannelConnectionDTO {
    pub fn new(connection: ChannelConnection, polling: bool) -> Self {
        Self {
            organization_id: connection.organization_id,
            instance_name: connection.instance_name,
            state: connection.state,
            phone_number: connection.phone_number,
            profile_name: connection.profile_name,
            connected_at: connection.connected_at,
            polling,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PairingPayloadDTO {
    pub qr_image: Option<String>,
    pub code: Option<String>,
    pub pairing_code: Option<String>,
}

impl PairingPayloadDTO {
    pub fn new(payload: PairingPayload) -> Self {
        Self {
            qr_image: payload.qr_image,
            code: payload.code,
            pairing_code: payload.pairing_code,
        }
    }
}
