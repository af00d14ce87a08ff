use crate::{
    reminder_settings::{DeliveryChannel, TriggerKind},
    resource::{ResourceSnapshot, ResourceType},
    shared::entity::{Entity, ID},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    /// Claimed by a dispatch run. A claim older than the lease may be taken
    /// over by another run.
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed | Self::Cancelled)
    }
}

impl Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(anyhow::Error::msg(format!("Unknown reminder status: {}", s))),
        }
    }
}

/// Identity of a reminder occurrence. At most one `ScheduledReminder` exists
/// per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub resource_id: ID,
    pub trigger_kind: TriggerKind,
    pub occurrence_index: u32,
}

/// A `ScheduledReminder` is one planned delivery of a reminder for a resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReminder {
    pub id: ID,
    pub organization_id: ID,
    pub resource_type: ResourceType,
    pub resource_id: ID,
    pub trigger_kind: TriggerKind,
    /// Position of this occurrence in the trigger's recurrence
    pub occurrence_index: u32,
    pub scheduled_at: i64,
    /// Channel configured when the reminder was planned
    pub channel: DeliveryChannel,
    pub status: ReminderStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Set when a dispatch run claims the reminder
    pub claimed_at: Option<i64>,
    pub sent_at: Option<i64>,
    pub created: i64,
}

impl ScheduledReminder {
    pub fn new(
        resource: &ResourceSnapshot,
        trigger_kind: TriggerKind,
        occurrence_index: u32,
        scheduled_at: i64,
        channel: DeliveryChannel,
        created: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            organization_id: resource.organization_id.clone(),
            resource_type: resource.resource_type,
            resource_id: resource.id.clone(),
            trigger_kind,
            occurrence_index,
            scheduled_at,
            channel,
            status: ReminderStatus::Pending,
            attempts: 0,
            last_error: None,
            claimed_at: None,
            sent_at: None,
            created,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            resource_id: self.resource_id.clone(),
            trigger_kind: self.trigger_kind,
            occurrence_index: self.occurrence_index,
        }
    }

    /// Whether a dispatch run at `now` may claim this reminder
    pub fn is_claimable(&self, now: i64, lease_millis: i64) -> bool {
        match self.status {
            ReminderStatus::Pending => self.scheduled_at <= now,
            ReminderStatus::Processing => self
                .claimed_at
                .map(|claimed| claimed + lease_millis <= now)
                .unwrap_or(true),
            _ => false,
        }
    }
}

impl Entity for ScheduledReminder {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// Marks where generation of an unbounded (or long) recurrence stopped.
/// When `run_at` is reached the next batch of occurrences is generated.
#[derive(Clone, Debug, PartialEq)]
pub struct ReminderExpansionJob {
    pub organization_id: ID,
    pub resource_id: ID,
    pub trigger_kind: TriggerKind,
    /// Occurrence index the next batch starts at
    pub next_index: u32,
    /// Instant after-creation occurrences count from
    pub creation_anchor: i64,
    pub run_at: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn claimable_when_due_or_lease_expired() {
        let resource = ResourceSnapshot {
            id: ID::default(),
            organization_id: ID::default(),
            resource_type: ResourceType::Event,
            title: "Choir practice".into(),
            created_at: 0,
            due_at: Some(1000),
            completed: false,
            organization_name: "Grace Church".into(),
            ministry_name: None,
            assignee_name: None,
            recipients: Vec::new(),
        };
        let mut reminder = ScheduledReminder::new(
            &resource,
            TriggerKind::OnDue,
            0,
            1000,
            DeliveryChannel::Push,
            0,
        );
        assert_eq!(reminder.resource_id, resource.id);
        assert!(!reminder.is_claimable(999, 100));
        assert!(reminder.is_claimable(1000, 100));

        reminder.status = ReminderStatus::Processing;
        reminder.claimed_at = Some(1000);
        assert!(!reminder.is_claimable(1050, 100));
        assert!(reminder.is_claimable(1100, 100));

        reminder.status = ReminderStatus::Sent;
        assert!(!reminder.is_claimable(5000, 100));
    }

    #[test]
    fn status_parses() {
        for status in [
            ReminderStatus::Pending,
            ReminderStatus::Processing,
            ReminderStatus::Sent,
            ReminderStatus::Failed,
            ReminderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ReminderStatus>().unwrap(), status);
        }
        assert!(ReminderStatus::Cancelled.is_terminal());
        assert!(!ReminderStatus::Processing.is_terminal());
    }
}
