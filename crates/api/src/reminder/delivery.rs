use actix_web::rt::time::sleep;
use reminder_engine_domain::{
    DeliveryChannel, DeliveryError, MessageTemplate, NotificationChannel, NotificationLogEntry,
    NotificationStatus, PushPayload, Recipient, ResourceSnapshot, RetryPolicy, ScheduledReminder,
    ID,
};
use reminder_engine_infra::ReminderContext;
use serde_json::json;
use std::future::Future;
use tracing::{error, info, warn};

/// The outcome of delivering a reminder to one recipient over one channel
#[derive(Debug)]
pub struct LegOutcome {
    pub recipient_id: ID,
    pub channel: NotificationChannel,
    pub result: Result<(), DeliveryError>,
    pub attempts: u32,
}

impl LegOutcome {
    fn new(
        recipient: &Recipient,
        channel: NotificationChannel,
        result: Result<(), DeliveryError>,
        attempts: u32,
    ) -> Self {
        Self {
            recipient_id: recipient.user_id.clone(),
            channel,
            result,
            attempts,
        }
    }
}

/// Runs `send` until it succeeds, fails permanently or the policy runs out
/// of attempts. Returns the last result and the number of attempts made.
pub async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    mut send: F,
) -> (Result<(), DeliveryError>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), DeliveryError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match send().await {
            Ok(()) => return (Ok(()), attempt),
            Err(e) if e.is_retryable() => match policy.delay_after(attempt) {
                Some(delay) => {
                    warn!("Delivery attempt {} failed: {}. Retrying.", attempt, e);
                    sleep(delay).await;
                }
                None => return (Err(e), attempt),
            },
            Err(e) => return (Err(e), attempt),
        }
    }
}

/// A rendered reminder ready to be sent
pub struct Delivery<'a> {
    pub reminder: &'a ScheduledReminder,
    pub resource: &'a ResourceSnapshot,
    pub message: MessageTemplate,
    pub channel: DeliveryChannel,
}

impl<'a> Delivery<'a> {
    fn tag(&self) -> String {
        format!("{}-{}", self.resource.resource_type, self.resource.id)
    }

    fn data(&self) -> serde_json::Value {
        json!({
            "reminderId": self.reminder.id,
            "organizationId": self.reminder.organization_id,
            "resourceId": self.resource.id,
            "resourceType": self.resource.resource_type,
            "triggerKind": self.reminder.trigger_kind,
        })
    }

    /// Text sent through the messaging gateway, the title in bold
    fn text(&self) -> String {
        format!("*{}*\n{}", self.message.title, self.message.body)
    }

    /// Push first, then the gateway. Every recipient gets one outcome per
    /// channel.
    pub async fn send(&self, ctx: &ReminderContext) -> Vec<LegOutcome> {
        let mut outcomes = Vec::new();
        if self.channel.includes_push() {
            let payload = PushPayload {
                title: self.message.title.clone(),
                body: self.message.body.clone(),
                icon: ctx.config.push.icon.clone(),
                badge: ctx.config.push.badge.clone(),
                tag: self.tag(),
                data: self.data(),
            };
            for recipient in &self.resource.recipients {
                let (result, attempts) = push_to_recipient(recipient, &payload, ctx).await;
                outcomes.push(LegOutcome::new(
                    recipient,
                    NotificationChannel::Push,
                    result,
                    attempts,
                ));
            }
        }
        if self.channel.includes_gateway() {
            outcomes.extend(self.send_gateway(ctx).await);
        }
        outcomes
    }

    async fn send_gateway(&self, ctx: &ReminderContext) -> Vec<LegOutcome> {
        let recipients = &self.resource.recipients;
        let fail_all = |e: DeliveryError| {
            recipients
                .iter()
                .map(|r| LegOutcome::new(r, NotificationChannel::Gateway, Err(e.clone()), 0))
                .collect::<Vec<_>>()
        };

        if !ctx.gateway.is_configured() {
            return fail_all(DeliveryError::GatewayNotConfigured);
        }
        let instance_name = match ctx
            .repos
            .channel_connections
            .find(&self.reminder.organization_id)
            .await
        {
            Some(conn) if conn.is_connected() => match conn.instance_name {
                Some(name) => name,
                None => return fail_all(DeliveryError::GatewayNotConnected),
            },
            _ => return fail_all(DeliveryError::GatewayNotConnected),
        };

        let text = self.text();
        let mut outcomes = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let number = match &recipient.phone_number {
                Some(number) => number.as_str(),
                None => {
                    outcomes.push(LegOutcome::new(
                        recipient,
                        NotificationChannel::Gateway,
                        Err(DeliveryError::Permanent("no_phone_number".into())),
                        0,
                    ));
                    continue;
                }
            };
            let instance_name = instance_name.as_str();
            let text = text.as_str();
            let (result, attempts) = send_with_retry(&ctx.config.retry_policy, move || async move {
                ctx.gateway
                    .send_text(instance_name, number, text)
                    .await
                    .map_err(DeliveryError::from)
            })
            .await;
            outcomes.push(LegOutcome::new(
                recipient,
                NotificationChannel::Gateway,
                result,
                attempts,
            ));
        }
        outcomes
    }

    /// One log entry per outcome
    pub async fn log(&self, outcomes: &[LegOutcome], now: i64, ctx: &ReminderContext) {
        let tag = self.tag();
        let data = self.data();
        for outcome in outcomes {
            let (status, error_message, sent_at) = match &outcome.result {
                Ok(()) => (NotificationStatus::Sent, None, Some(now)),
                Err(e) => (NotificationStatus::Failed, Some(e.to_string()), None),
            };
            let entry = NotificationLogEntry {
                id: Default::default(),
                organization_id: self.reminder.organization_id.clone(),
                reminder_id: self.reminder.id.clone(),
                recipient_id: outcome.recipient_id.clone(),
                channel: outcome.channel,
                title: self.message.title.clone(),
                body: self.message.body.clone(),
                tag: tag.clone(),
                data: data.clone(),
                status,
                error_message,
                created_at: now,
                sent_at,
            };
            if let Err(e) = ctx.repos.notification_log.insert(&entry).await {
                error!(
                    "Unable to store notification log entry for reminder {}: {:?}",
                    self.reminder.id, e
                );
            }
        }
    }
}

/// Sends to every subscription of the recipient. Delivered when any
/// subscription accepted the notification.
async fn push_to_recipient(
    recipient: &Recipient,
    payload: &PushPayload,
    ctx: &ReminderContext,
) -> (Result<(), DeliveryError>, u32) {
    let subscriptions = ctx
        .repos
        .push_subscriptions
        .find_by_user(&recipient.user_id)
        .await;
    if subscriptions.is_empty() {
        return (
            Err(DeliveryError::Permanent("no_push_subscription".into())),
            0,
        );
    }

    let mut delivered = false;
    let mut last_error = None;
    let mut max_attempts = 0;
    for subscription in &subscriptions {
        let (result, attempts) = send_with_retry(&ctx.config.retry_policy, || {
            ctx.push.send(subscription, payload)
        })
        .await;
        max_attempts = max_attempts.max(attempts);
        match result {
            Ok(()) => delivered = true,
            Err(DeliveryError::SubscriptionGone) => {
                info!(
                    "Push subscription {} is gone, removing it",
                    subscription.id
                );
                ctx.repos.push_subscriptions.delete(&subscription.id).await;
                last_error = Some(DeliveryError::SubscriptionGone);
            }
            Err(e) => last_error = Some(e),
        }
    }

    match (delivered, last_error) {
        (true, _) => (Ok(()), max_attempts),
        (false, Some(e)) => (Err(e), max_attempts),
        (false, None) => (
            Err(DeliveryError::Permanent("no_push_subscription".into())),
            max_attempts,
        ),
    }
}
