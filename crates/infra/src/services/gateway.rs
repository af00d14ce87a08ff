use crate::config::GatewayConfig;
use reminder_engine_domain::{DeliveryError, PairingPayload, RemoteState};
use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway_not_configured")]
    NotConfigured,
    /// The gateway does not know the instance
    #[error("gateway instance not found")]
    NotFound,
    #[error("gateway unavailable: {0}")]
    Transient(String),
    #[error("gateway rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            404 => Self::NotFound,
            408 | 429 | 500..=599 => Self::Transient(format!("status {}: {}", status, body)),
            _ => Self::Rejected(format!("status {}: {}", status, body)),
        }
    }
}

impl From<GatewayError> for DeliveryError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NotConfigured => Self::GatewayNotConfigured,
            GatewayError::Transient(msg) => Self::Transient(msg),
            other => Self::Permanent(other.to_string()),
        }
    }
}

/// A freshly created remote instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInstance {
    pub instance_name: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The phone still has to be paired
    Pairing(PairingPayload),
    /// The instance is already paired
    AlreadyOpen,
}

/// Call contract of the external messaging gateway
#[async_trait::async_trait]
pub trait IGatewayClient: Send + Sync {
    fn is_configured(&self) -> bool;
    async fn create_instance(&self, instance_name: &str) -> Result<CreatedInstance, GatewayError>;
    async fn connect(&self, instance_name: &str) -> Result<ConnectOutcome, GatewayError>;
    async fn connection_state(&self, instance_name: &str) -> Result<RemoteState, GatewayError>;
    async fn logout(&self, instance_name: &str) -> Result<(), GatewayError>;
    async fn delete_instance(&self, instance_name: &str) -> Result<(), GatewayError>;
    async fn send_text(
        &self,
        instance_name: &str,
        number: &str,
        text: &str,
    ) -> Result<(), GatewayError>;
}

pub struct GatewayRestApi {
    client: Client,
    config: Option<GatewayConfig>,
}

impl GatewayRestApi {
    pub fn new(config: Option<GatewayConfig>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, GatewayError> {
        let config = self.config.as_ref().ok_or(GatewayError::NotConfigured)?;
        let mut request = self
            .client
            .request(method.clone(), format!("{}/{}", config.base_url, path))
            .header("apikey", &config.api_key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let res = request.send().await.map_err(|e| {
            error!(
                "[Network Error] Gateway {} {} error. Error message: {:?}",
                method, path, e
            );
            GatewayError::Transient(e.to_string())
        })?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        if status.as_u16() != 404 {
            error!(
                "[Unexpected Response] Gateway {} {} returned status: {}. Body: {}",
                method, path, status, body
            );
        }
        Err(GatewayError::from_status(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, GatewayError> {
        self.send(method.clone(), path, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| {
                error!(
                    "[Unexpected Response] Gateway {} {} error. Error message: {:?}",
                    method, path, e
                );
                GatewayError::InvalidResponse(e.to_string())
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstanceResponse {
    instance: InstanceInfo,
    #[serde(default)]
    hash: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceInfo {
    instance_name: String,
}

/// The connect endpoint either answers with a pairing payload or with the
/// state of an already paired instance
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResponse {
    #[serde(default)]
    base64: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    pairing_code: Option<String>,
    #[serde(default)]
    instance: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ConnectionStateResponse {
    instance: RemoteState,
}

/// The instance token is either the hash itself or `{ apikey }`
fn token_from_hash(hash: Option<serde_json::Value>) -> Option<String> {
    match hash? {
        serde_json::Value::String(token) => Some(token),
        serde_json::Value::Object(map) => map
            .get("apikey")
            .and_then(|token| token.as_str())
            .map(String::from),
        _ => None,
    }
}

impl From<ConnectResponse> for ConnectOutcome {
    fn from(res: ConnectResponse) -> Self {
        let open = res
            .instance
            .as_ref()
            .and_then(|instance| instance.get("state"))
            .and_then(|state| state.as_str())
            == Some("open");
        if open {
            Self::AlreadyOpen
        } else {
            Self::Pairing(PairingPayload {
                qr_image: res.base64,
                code: res.code,
                pairing_code: res.pairing_code,
            })
        }
    }
}

#[async_trait::async_trait]
impl IGatewayClient for GatewayRestApi {
    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn create_instance(&self, instance_name: &str) -> Result<CreatedInstance, GatewayError> {
        let body = json!({
            "instanceName": instance_name,
            "qrcode": true,
            "integration": "WHATSAPP-BAILEYS",
        });
        let res: CreateInstanceResponse = self
            .send_json(Method::POST, "instance/create", Some(body))
            .await?;
        Ok(CreatedInstance {
            instance_name: res.instance.instance_name,
            token: token_from_hash(res.hash),
        })
    }

    async fn connect(&self, instance_name: &str) -> Result<ConnectOutcome, GatewayError> {
        let res: ConnectResponse = self
            .send_json(
                Method::GET,
                &format!("instance/connect/{}", instance_name),
                None,
            )
            .await?;
        Ok(res.into())
    }

    async fn connection_state(&self, instance_name: &str) -> Result<RemoteState, GatewayError> {
        let res: ConnectionStateResponse = self
            .send_json(
                Method::GET,
                &format!("instance/connectionState/{}", instance_name),
                None,
            )
            .await?;
        Ok(res.instance)
    }

    async fn logout(&self, instance_name: &str) -> Result<(), GatewayError> {
        self.send(
            Method::DELETE,
            &format!("instance/logout/{}", instance_name),
            None,
        )
        .await?;
        Ok(())
    }

    async fn delete_instance(&self, instance_name: &str) -> Result<(), GatewayError> {
        self.send(
            Method::DELETE,
            &format!("instance/delete/{}", instance_name),
            None,
        )
        .await?;
        Ok(())
    }

    async fn send_text(
        &self,
        instance_name: &str,
        number: &str,
        text: &str,
    ) -> Result<(), GatewayError> {
        let body = json!({
            "number": number,
            "text": text,
        });
        self.send(
            Method::POST,
            &format!("message/sendText/{}", instance_name),
            Some(body),
        )
        .await?;
        Ok(())
    }
}
