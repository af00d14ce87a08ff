use crate::{
    reminder_settings::{TriggerKind, TriggerTemplate},
    shared::entity::{Entity, ID},
    template::{TemplateContext, Token},
};
use chrono::prelude::*;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Event,
    Task,
    Announcement,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Task => "task",
            Self::Announcement => "announcement",
        }
    }

    /// Human readable label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Task => "Task",
            Self::Announcement => "Announcement",
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(Self::Event),
            "task" => Ok(Self::Task),
            "announcement" => Ok(Self::Announcement),
            _ => Err(anyhow::Error::msg(format!("Unknown resource type: {}", s))),
        }
    }
}

/// A user resolved by the resource layer as eligible to receive reminders
/// for a resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub user_id: ID,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// The state of an event, task or announcement as delivered by the resource
/// layer together with a lifecycle event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    pub id: ID,
    pub organization_id: ID,
    pub resource_type: ResourceType,
    pub title: String,
    pub created_at: i64,
    #[serde(default)]
    pub due_at: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    pub organization_name: String,
    #[serde(default)]
    pub ministry_name: Option<String>,
    #[serde(default)]
    pub assignee_name: Option<String>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

impl Entity for ResourceSnapshot {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceEventKind {
    Creation,
    DueSoon,
    Due,
    Updated,
    Deleted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEvent {
    pub kind: ResourceEventKind,
    pub resource: ResourceSnapshot,
    pub occurred_at: i64,
}

impl ResourceEvent {
    /// Trigger kinds this lifecycle event may generate reminders for
    pub fn trigger_kinds(&self) -> &'static [TriggerKind] {
        match self.kind {
            ResourceEventKind::Creation | ResourceEventKind::Updated => &[
                TriggerKind::AfterCreation,
                TriggerKind::BeforeDue,
                TriggerKind::OnDue,
            ],
            ResourceEventKind::DueSoon => &[TriggerKind::BeforeDue],
            ResourceEventKind::Due => &[TriggerKind::OnDue],
            ResourceEventKind::Deleted => &[],
        }
    }

    /// Instant after-creation reminders count from. A creation event counts
    /// from when it happened, any other event from the resource's creation.
    pub fn creation_anchor(&self) -> i64 {
        match self.kind {
            ResourceEventKind::Creation => self.occurred_at,
            _ => self.resource.created_at,
        }
    }
}

impl ResourceSnapshot {
    /// The instant the occurrences of `kind` are computed from, with the
    /// trigger's delay applied. After-creation triggers count from
    /// `creation_anchor`. `None` when the resource has nothing to anchor
    /// to, e.g. a due trigger of a resource without due date.
    pub fn trigger_anchor(
        &self,
        kind: TriggerKind,
        trigger: &TriggerTemplate,
        creation_anchor: i64,
    ) -> Option<i64> {
        let delay = trigger.delay.as_ref().map(|d| d.as_millis()).unwrap_or(0);
        match kind {
            TriggerKind::AfterCreation => Some(creation_anchor + delay),
            TriggerKind::BeforeDue => self.due_at.map(|due| due - delay),
            TriggerKind::OnDue => self.due_at.map(|due| due + delay),
            TriggerKind::FollowUp => None,
        }
    }

    pub fn template_context(&self, tz: &Tz) -> TemplateContext {
        let mut ctx = TemplateContext::new();
        ctx.insert(Token::Title, self.title.clone());
        ctx.insert(Token::OrganizationName, self.organization_name.clone());
        ctx.insert(Token::ResourceType, self.resource_type.label().to_string());
        if let Some(created) = tz.timestamp_millis_opt(self.created_at).single() {
            ctx.insert(Token::CreatedDate, format_date(&created));
            ctx.insert(Token::CreatedTime, format_time(&created));
        }
        if let Some(due) = self
            .due_at
            .and_then(|due| tz.timestamp_millis_opt(due).single())
        {
            ctx.insert(Token::DueDate, format_date(&due));
            ctx.insert(Token::DueTime, format_time(&due));
        }
        if let Some(ministry) = &self.ministry_name {
            ctx.insert(Token::MinistryName, ministry.clone());
        }
        if let Some(assignee) = &self.assignee_name {
            ctx.insert(Token::AssigneeName, assignee.clone());
        }
        ctx
    }
}

fn format_date(dt: &DateTime<Tz>) -> String {
    dt.format("%d/%m/%Y").to_string()
}

fn format_time(dt: &DateTime<Tz>) -> String {
    dt.format("%H:%M").to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder_settings::{Delay, DelayUnit, ReminderSettings};

    fn snapshot() -> ResourceSnapshot {
        ResourceSnapshot {
            id: ID::default(),
            organization_id: ID::default(),
            resource_type: ResourceType::Task,
            title: "Prepare chairs".into(),
            // 2024-01-01T09:00:00Z
            created_at: 1704099600000,
            // 2024-01-03T18:30:00Z
            due_at: Some(1704306600000),
            completed: false,
            organization_name: "Grace Church".into(),
            ministry_name: None,
            assignee_name: Some("Ana".into()),
            recipients: Vec::new(),
        }
    }

    #[test]
    fn anchors_after_creation_with_delay() {
        let settings = ReminderSettings::new(ID::default());
        let mut trigger = settings.triggers.after_creation.clone();
        trigger.delay = Some(Delay::new(30, DelayUnit::Minutes));
        let resource = snapshot();
        assert_eq!(
            resource.trigger_anchor(TriggerKind::AfterCreation, &trigger, resource.created_at),
            Some(resource.created_at + 30 * 60 * 1000)
        );
    }

    #[test]
    fn creation_events_anchor_on_their_own_time() {
        let resource = snapshot();
        let mut event = ResourceEvent {
            kind: ResourceEventKind::Creation,
            resource: resource.clone(),
            occurred_at: resource.created_at + 60 * 60 * 1000,
        };
        assert_eq!(event.creation_anchor(), resource.created_at + 60 * 60 * 1000);

        event.kind = ResourceEventKind::Updated;
        assert_eq!(event.creation_anchor(), resource.created_at);
    }

    #[test]
    fn anchors_due_triggers_on_due_date() {
        let settings = ReminderSettings::new(ID::default());
        let resource = snapshot();
        let due = resource.due_at.unwrap();
        assert_eq!(
            resource.trigger_anchor(
                TriggerKind::BeforeDue,
                &settings.triggers.before_due,
                resource.created_at
            ),
            Some(due - 24 * 60 * 60 * 1000)
        );
        assert_eq!(
            resource.trigger_anchor(TriggerKind::OnDue, &settings.triggers.on_due, resource.created_at),
            Some(due)
        );

        let resource = ResourceSnapshot {
            due_at: None,
            ..snapshot()
        };
        assert_eq!(
            resource.trigger_anchor(TriggerKind::OnDue, &settings.triggers.on_due, resource.created_at),
            None
        );
    }

    #[test]
    fn builds_template_context_in_timezone() {
        let ctx = snapshot().template_context(&chrono_tz::America::Sao_Paulo);
        assert_eq!(ctx[&Token::Title], "Prepare chairs");
        assert_eq!(ctx[&Token::CreatedDate], "01/01/2024");
        assert_eq!(ctx[&Token::CreatedTime], "06:00");
        assert_eq!(ctx[&Token::DueDate], "03/01/2024");
        assert_eq!(ctx[&Token::DueTime], "15:30");
        assert_eq!(ctx[&Token::ResourceType], "Task");
        assert_eq!(ctx[&Token::AssigneeName], "Ana");
        assert!(!ctx.contains_key(&Token::MinistryName));
    }

    #[test]
    fn event_kinds_map_to_triggers() {
        let mut event = ResourceEvent {
            kind: ResourceEventKind::DueSoon,
            resource: snapshot(),
            occurred_at: 0,
        };
        assert_eq!(event.trigger_kinds(), &[TriggerKind::BeforeDue]);
        event.kind = ResourceEventKind::Deleted;
        assert!(event.trigger_kinds().is_empty());
    }
}
