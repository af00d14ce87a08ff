use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Absent,
    Pairing,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Pairing => "pairing",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absent" => Ok(Self::Absent),
            "pairing" => Ok(Self::Pairing),
            "connected" => Ok(Self::Connected),
            "disconnected" => Ok(Self::Disconnected),
            _ => Err(anyhow::Error::msg(format!(
                "Unknown connection state: {}",
                s
            ))),
        }
    }
}

/// Connection state reported by the gateway for an instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteInstanceState {
    Open,
    Connecting,
    Close,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteState {
    pub state: RemoteInstanceState,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

/// What the administrator scans or types on the phone to pair it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingPayload {
    /// Base64 encoded QR image
    pub qr_image: Option<String>,
    pub code: Option<String>,
    pub pairing_code: Option<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidTransitionError {
    #[error("Gateway connection is already connected")]
    AlreadyConnected,
    #[error("No gateway instance exists for the organization")]
    NoInstance,
}

/// The external messaging gateway connection of an organization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConnection {
    pub organization_id: ID,
    pub instance_name: Option<String>,
    /// Per instance token handed out by the gateway
    #[serde(skip_serializing)]
    pub instance_token: Option<String>,
    pub state: ConnectionState,
    pub phone_number: Option<String>,
    pub profile_name: Option<String>,
    pub connected_at: Option<i64>,
    pub pairing_started_at: Option<i64>,
    pub updated: i64,
}

impl ChannelConnection {
    pub fn absent(organization_id: ID, now: i64) -> Self {
        Self {
            organization_id,
            instance_name: None,
            instance_token: None,
            state: ConnectionState::Absent,
            phone_number: None,
            profile_name: None,
            connected_at: None,
            pairing_started_at: None,
            updated: now,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// `absent|disconnected -> pairing`. Re-entering pairing keeps the
    /// existing instance.
    pub fn begin_pairing(
        &mut self,
        instance_name: String,
        instance_token: Option<String>,
        now: i64,
    ) -> Result<(), InvalidTransitionError> {
        if self.state == ConnectionState::Connected {
            return Err(InvalidTransitionError::AlreadyConnected);
        }
        self.instance_name = Some(instance_name);
        if instance_token.is_some() {
            self.instance_token = instance_token;
        }
        self.state = ConnectionState::Pairing;
        self.pairing_started_at = Some(now);
        self.updated = now;
        Ok(())
    }

    /// Applies a remote state observed while polling or refreshing. Returns
    /// whether the local state changed.
    pub fn observe(&mut self, remote: &RemoteState, now: i64) -> bool {
        let before = self.state;
        match (self.state, &remote.state) {
            (ConnectionState::Absent, _) => return false,
            (_, RemoteInstanceState::Open) => {
                if self.state != ConnectionState::Connected {
                    self.connected_at = Some(now);
                }
                self.state = ConnectionState::Connected;
                if let Some(phone) = remote.owner.as_deref().and_then(phone_from_owner) {
                    self.phone_number = Some(phone);
                }
                if remote.profile_name.is_some() {
                    self.profile_name = remote.profile_name.clone();
                }
            }
            (ConnectionState::Connected, _) => {
                self.state = ConnectionState::Disconnected;
            }
            // Pairing waits for the phone, disconnected stays disconnected
            // until the administrator pairs again
            _ => (),
        }
        let changed = before != self.state;
        if changed {
            self.updated = now;
        }
        changed
    }

    /// Explicit logout keeps the remote instance so it can be paired again
    pub fn mark_logged_out(&mut self, now: i64) -> Result<(), InvalidTransitionError> {
        if self.instance_name.is_none() {
            return Err(InvalidTransitionError::NoInstance);
        }
        self.state = ConnectionState::Disconnected;
        self.pairing_started_at = None;
        self.updated = now;
        Ok(())
    }

    /// Back to `absent` with every local credential cleared. Used on
    /// intentional deletion and when the gateway no longer knows the instance.
    pub fn reset(&mut self, now: i64) {
        *self = Self::absent(self.organization_id.clone(), now);
    }
}

impl Entity for ChannelConnection {
    fn id(&self) -> &ID {
        &self.organization_id
    }
}

/// The gateway reports the owner as a jid, e.g. `5511999990000@s.whatsapp.net`
/// or `5511999990000:12@s.whatsapp.net`
pub fn phone_from_owner(owner: &str) -> Option<String> {
    let phone = owner.split(|c| c == '@' || c == ':').next()?.trim();
    if phone.is_empty() {
        None
    } else {
        Some(phone.to_string())
    }
}
