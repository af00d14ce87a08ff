use crate::{
    shared::{
        entity::{Entity, ID},
        recurrence::{InvalidRuleError, RepeatRule},
    },
    template::MessageTemplate,
};
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// The lifecycle moment a reminder is anchored to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    AfterCreation,
    BeforeDue,
    OnDue,
    /// Periodic nudge scheduled after a reminder for the resource was delivered
    FollowUp,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 4] = [
        TriggerKind::AfterCreation,
        TriggerKind::BeforeDue,
        TriggerKind::OnDue,
        TriggerKind::FollowUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::AfterCreation => "after_creation",
            TriggerKind::BeforeDue => "before_due",
            TriggerKind::OnDue => "on_due",
            TriggerKind::FollowUp => "follow_up",
        }
    }
}

impl Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow::Error::msg(format!("Unknown trigger kind: {}", s)))
    }
}

/// Where a reminder gets delivered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Push,
    Gateway,
    Both,
}

impl DeliveryChannel {
    pub fn includes_push(&self) -> bool {
        matches!(self, Self::Push | Self::Both)
    }

    pub fn includes_gateway(&self) -> bool {
        matches!(self, Self::Gateway | Self::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Gateway => "gateway",
            Self::Both => "both",
        }
    }
}

impl Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeliveryChannel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "gateway" => Ok(Self::Gateway),
            "both" => Ok(Self::Both),
            _ => Err(anyhow::Error::msg(format!("Unknown channel: {}", s))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Minutes,
    Hours,
    Days,
}

/// Offset applied to a trigger's anchor before occurrences are computed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delay {
    pub value: u32,
    pub unit: DelayUnit,
}

impl Delay {
    pub fn new(value: u32, unit: DelayUnit) -> Self {
        Self { value, unit }
    }

    pub fn as_millis(&self) -> i64 {
        let value = i64::from(self.value);
        let duration = match self.unit {
            DelayUnit::Minutes => Duration::minutes(value),
            DelayUnit::Hours => Duration::hours(value),
            DelayUnit::Days => Duration::days(value),
        };
        duration.num_milliseconds()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTemplate {
    pub enabled: bool,
    pub template: MessageTemplate,
    #[serde(default)]
    pub repeat: RepeatRule,
    #[serde(default)]
    pub delay: Option<Delay>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTemplates {
    pub after_creation: TriggerTemplate,
    pub before_due: TriggerTemplate,
    pub on_due: TriggerTemplate,
}

impl Default for TriggerTemplates {
    fn default() -> Self {
        Self {
            after_creation: TriggerTemplate {
                enabled: true,
                template: MessageTemplate::new(
                    "New [resource_type]: [title]",
                    "[title] was created on [created_date] at [created_time].",
                ),
                repeat: RepeatRule::once(),
                delay: None,
            },
            before_due: TriggerTemplate {
                enabled: true,
                template: MessageTemplate::new(
                    "Reminder: [title]",
                    "Hi [assignee_name], [title] is due on [due_date] at [due_time].",
                ),
                repeat: RepeatRule::once(),
                delay: Some(Delay::new(1, DelayUnit::Days)),
            },
            on_due: TriggerTemplate {
                enabled: true,
                template: MessageTemplate::new(
                    "[title] is due",
                    "[title] is due now ([due_time]). [organization_name]",
                ),
                repeat: RepeatRule::once(),
                delay: None,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalFollowUp {
    pub enabled: bool,
    pub interval_days: u32,
    /// Ceiling on follow-ups per resource. While follow-ups are enabled it
    /// also caps the occurrences of every other trigger of a resource.
    pub max_reminders: u32,
    pub template: MessageTemplate,
}

impl Default for IntervalFollowUp {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_days: 2,
            max_reminders: 3,
            template: MessageTemplate::new(
                "Follow-up: [title]",
                "[title] is still pending. It was due on [due_date].",
            ),
        }
    }
}

/// Per organization reminder configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettings {
    pub organization_id: ID,
    pub enabled: bool,
    pub channel: DeliveryChannel,
    /// Timezone used for calendar arithmetic and for formatting dates in messages
    pub timezone: Tz,
    pub triggers: TriggerTemplates,
    pub follow_up: IntervalFollowUp,
    pub updated: i64,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidSettingsError {
    #[error("Invalid repeat rule for trigger {trigger}: {source}")]
    InvalidRule {
        trigger: TriggerKind,
        source: InvalidRuleError,
    },
    #[error("Unknown tokens {tokens:?} in template of trigger {trigger}")]
    UnknownTokens {
        trigger: TriggerKind,
        tokens: Vec<String>,
    },
    #[error("Template title of trigger {0} is empty")]
    EmptyTitle(TriggerKind),
    #[error("Follow-up interval must be at least one day")]
    ZeroFollowUpInterval,
    #[error("Follow-up max reminders must be at least 1")]
    ZeroMaxReminders,
}

impl ReminderSettings {
    pub fn new(organization_id: ID) -> Self {
        Self {
            organization_id,
            enabled: true,
            channel: DeliveryChannel::Push,
            timezone: Tz::UTC,
            triggers: Default::default(),
            follow_up: Default::default(),
            updated: 0,
        }
    }

    /// The trigger configuration of `kind`, `None` for follow-ups which are
    /// configured by `IntervalFollowUp`
    pub fn trigger(&self, kind: TriggerKind) -> Option<&TriggerTemplate> {
        match kind {
            TriggerKind::AfterCreation => Some(&self.triggers.after_creation),
            TriggerKind::BeforeDue => Some(&self.triggers.before_due),
            TriggerKind::OnDue => Some(&self.triggers.on_due),
            TriggerKind::FollowUp => None,
        }
    }

    pub fn is_trigger_enabled(&self, kind: TriggerKind) -> bool {
        if !self.enabled {
            return false;
        }
        match self.trigger(kind) {
            Some(trigger) => trigger.enabled,
            None => self.follow_up.enabled,
        }
    }

    pub fn template(&self, kind: TriggerKind) -> &MessageTemplate {
        match self.trigger(kind) {
            Some(trigger) => &trigger.template,
            None => &self.follow_up.template,
        }
    }

    pub fn disabled_triggers(&self) -> Vec<TriggerKind> {
        TriggerKind::ALL
            .iter()
            .copied()
            .filter(|k| !self.is_trigger_enabled(*k))
            .collect()
    }

    /// Ceiling on generated occurrences per trigger and resource
    pub fn occurrence_ceiling(&self) -> Option<u32> {
        self.follow_up
            .enabled
            .then_some(self.follow_up.max_reminders)
    }

    pub fn validate(&self) -> Result<(), InvalidSettingsError> {
        for kind in TriggerKind::ALL {
            if let Some(trigger) = self.trigger(kind) {
                trigger
                    .repeat
                    .validate()
                    .map_err(|source| InvalidSettingsError::InvalidRule {
                        trigger: kind,
                        source,
                    })?;
            }

            let template = self.template(kind);
            if template.title.trim().is_empty() {
                return Err(InvalidSettingsError::EmptyTitle(kind));
            }
            let tokens = template.unknown_tokens();
            if !tokens.is_empty() {
                return Err(InvalidSettingsError::UnknownTokens {
                    trigger: kind,
                    tokens,
                });
            }
        }

        if self.follow_up.interval_days == 0 {
            return Err(InvalidSettingsError::ZeroFollowUpInterval);
        }
        if self.follow_up.max_reminders == 0 {
            return Err(InvalidSettingsError::ZeroMaxReminders);
        }

        Ok(())
    }
}

impl Entity for ReminderSettings {
    fn id(&self) -> &ID {
        &self.organization_id
    }
}
