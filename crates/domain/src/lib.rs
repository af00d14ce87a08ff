mod channel_connection;
mod delivery;
mod notification_log;
mod push_subscription;
mod reminder;
mod reminder_settings;
mod resource;
mod shared;
mod template;

pub use channel_connection::{
    phone_from_owner, ChannelConnection, ConnectionState, InvalidTransitionError,
    PairingPayload, RemoteInstanceState, RemoteState,
};
pub use delivery::{DeliveryError, RetryPolicy};
pub use notification_log::{NotificationChannel, NotificationLogEntry, NotificationStatus};
pub use push_subscription::{InvalidSubscriptionError, PushPayload, PushSubscription};
pub use reminder::{DedupKey, ReminderExpansionJob, ReminderStatus, ScheduledReminder};
pub use reminder_settings::{
    Delay, DelayUnit, DeliveryChannel, IntervalFollowUp, InvalidSettingsError, ReminderSettings,
    TriggerKind, TriggerTemplate, TriggerTemplates,
};
pub use resource::{
    Recipient, ResourceEvent, ResourceEventKind, ResourceSnapshot, ResourceType,
};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use shared::recurrence::{
    localize, next_occurrences, InvalidRuleError, Occurrences, RepeatDuration, RepeatRule,
    RepeatType,
};
pub use template::{render, MessageTemplate, TemplateContext, Token};
