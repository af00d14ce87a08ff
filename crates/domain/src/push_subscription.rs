use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// A browser push subscription of a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub id: ID,
    pub user_id: ID,
    pub endpoint: String,
    pub key_p256dh: String,
    pub key_auth: String,
    pub created: i64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidSubscriptionError {
    #[error("Push endpoint must be an https url, got: {0}")]
    InvalidEndpoint(String),
    #[error("Push subscription keys can not be empty")]
    MissingKeys,
}

impl PushSubscription {
    pub fn new(
        user_id: ID,
        endpoint: String,
        key_p256dh: String,
        key_auth: String,
        created: i64,
    ) -> Result<Self, InvalidSubscriptionError> {
        match Url::parse(&endpoint) {
            Ok(url) if url.scheme() == "https" => (),
            _ => return Err(InvalidSubscriptionError::InvalidEndpoint(endpoint)),
        }
        if key_p256dh.trim().is_empty() || key_auth.trim().is_empty() {
            return Err(InvalidSubscriptionError::MissingKeys);
        }

        Ok(Self {
            id: Default::default(),
            user_id,
            endpoint,
            key_p256dh,
            key_auth,
            created,
        })
    }
}

impl Entity for PushSubscription {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// What a browser shows for a push notification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: serde_json::Value,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_https_endpoints_only() {
        let sub = PushSubscription::new(
            ID::default(),
            "https://push.example.com/send/abc".into(),
            "p256".into(),
            "auth".into(),
            0,
        );
        assert!(sub.is_ok());

        let sub = PushSubscription::new(
            ID::default(),
            "http://push.example.com/send/abc".into(),
            "p256".into(),
            "auth".into(),
            0,
        );
        assert!(matches!(sub, Err(InvalidSubscriptionError::InvalidEndpoint(_))));

        let sub = PushSubscription::new(
            ID::default(),
            "https://push.example.com/send/abc".into(),
            "".into(),
            "auth".into(),
            0,
        );
        assert_eq!(sub, Err(InvalidSubscriptionError::MissingKeys));
    }
}
