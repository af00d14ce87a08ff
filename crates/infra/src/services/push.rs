use crate::config::PushConfig;
use reminder_engine_domain::{DeliveryError, PushPayload, PushSubscription};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::error;

/// Delivers a payload to one browser push subscription
#[async_trait::async_trait]
pub trait IPushSender: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
struct PushKeys<'a> {
    p256dh: &'a str,
    auth: &'a str,
}

#[derive(Debug, Serialize)]
struct PushTarget<'a> {
    endpoint: &'a str,
    keys: PushKeys<'a>,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    subscription: PushTarget<'a>,
    payload: &'a PushPayload,
}

/// Hands payloads to a relay that performs the web push protocol
pub struct PushRelayApi {
    client: Client,
    config: PushConfig,
}

impl PushRelayApi {
    pub fn new(config: PushConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[async_trait::async_trait]
impl IPushSender for PushRelayApi {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), DeliveryError> {
        if self.config.url.is_empty() {
            return Err(DeliveryError::Permanent(
                "push service is not configured".into(),
            ));
        }
        let body = PushRequest {
            subscription: PushTarget {
                endpoint: &subscription.endpoint,
                keys: PushKeys {
                    p256dh: &subscription.key_p256dh,
                    auth: &subscription.key_auth,
                },
            },
            payload,
        };
        let mut request = self.client.post(&self.config.url).json(&body);
        if let Some(key) = &self.config.key {
            request = request.header("authorization", format!("Bearer {}", key));
        }

        let res = request.send().await.map_err(|e| {
            error!("[Network Error] Push relay error. Error message: {:?}", e);
            DeliveryError::Transient(e.to_string())
        })?;
        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        Err(DeliveryError::from_status(status.as_u16(), &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reminder_engine_domain::ID;

    #[tokio::test]
    async fn unconfigured_relay_is_a_permanent_failure() {
        let api = PushRelayApi::new(
            PushConfig {
                url: "".into(),
                key: None,
                icon: "/icon-192.png".into(),
                badge: "/badge-72.png".into(),
            },
            Duration::from_secs(1),
        );
        let subscription = PushSubscription::new(
            ID::default(),
            "https://push.example.com/1".into(),
            "p256".into(),
            "auth".into(),
            0,
        )
        .unwrap();
        let payload = PushPayload {
            title: "t".into(),
            body: "b".into(),
            icon: "/icon-192.png".into(),
            badge: "/badge-72.png".into(),
            tag: "reminder".into(),
            data: serde_json::Value::Null,
        };
        let res = api.send(&subscription, &payload).await;
        assert!(matches!(res, Err(DeliveryError::Permanent(_))));
    }
}
