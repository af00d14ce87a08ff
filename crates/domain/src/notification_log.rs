use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            _ => Err(anyhow::Error::msg(format!(
                "Unknown notification status: {}",
                s
            ))),
        }
    }
}

/// The concrete channel a single delivery went through
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Push,
    Gateway,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Gateway => "gateway",
        }
    }
}

impl FromStr for NotificationChannel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "gateway" => Ok(Self::Gateway),
            _ => Err(anyhow::Error::msg(format!(
                "Unknown notification channel: {}",
                s
            ))),
        }
    }
}

/// Append only record of one delivery outcome for one recipient on one
/// channel. Retries of the same delivery produce a single entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLogEntry {
    pub id: ID,
    pub organization_id: ID,
    pub reminder_id: ID,
    pub recipient_id: ID,
    pub channel: NotificationChannel,
    pub title: String,
    pub body: String,
    pub tag: String,
    pub data: serde_json::Value,
    pub status: NotificationStatus,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub sent_at: Option<i64>,
}

impl Entity for NotificationLogEntry {
    fn id(&self) -> &ID {
        &self.id
    }
}
