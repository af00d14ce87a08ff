use super::{delivery::Delivery, follow_up::schedule_follow_up};
use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use futures::{stream, StreamExt};
use reminder_engine_api_structs::dispatch_due_reminders::*;
use reminder_engine_domain::{render, ReminderSettings, ReminderStatus, ScheduledReminder};
use reminder_engine_infra::ReminderContext;
use tracing::{error, info, warn};

pub async fn dispatch_due_reminders_controller(
    body: Option<web::Json<RequestBody>>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let body = body.map(|b| b.0).unwrap_or_default();
    let usecase = DispatchDueRemindersUseCase { now: body.now };

    execute(usecase, &ctx)
        .await
        .map(|report| {
            HttpResponse::Ok().json(APIResponse {
                claimed: report.claimed,
                sent: report.sent,
                failed: report.failed,
                cancelled: report.cancelled,
            })
        })
        .map_err(|_| ApiError::InternalError)
}

/// Delivers every reminder that is due. Safe to run concurrently with other
/// passes and with scheduling, a reminder is only delivered by the pass that
/// claimed it.
#[derive(Debug)]
pub struct DispatchDueRemindersUseCase {
    /// Defaults to the current time
    pub now: Option<i64>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Claimed by another pass in the meantime
    Skipped,
    Done(ReminderStatus),
}

#[async_trait::async_trait(?Send)]
impl UseCase for DispatchDueRemindersUseCase {
    type Response = DispatchReport;

    type Errors = ();

    const NAME: &'static str = "DispatchDueReminders";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let now = self.now.unwrap_or_else(|| ctx.sys.get_timestamp_millis());
        let due = ctx
            .repos
            .scheduled_reminders
            .find_due(now, ctx.config.claim_lease_millis, ctx.config.dispatch_batch_size)
            .await;

        let outcomes = stream::iter(due)
            .map(|reminder| dispatch_reminder(reminder, now, ctx))
            .buffer_unordered(ctx.config.dispatch_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut report = DispatchReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Skipped => continue,
                Outcome::Done(status) => {
                    report.claimed += 1;
                    match status {
                        ReminderStatus::Sent => report.sent += 1,
                        ReminderStatus::Cancelled => report.cancelled += 1,
                        _ => report.failed += 1,
                    }
                }
            }
        }
        if report.claimed > 0 {
            info!("Dispatch pass finished: {:?}", report);
        }

        Ok(report)
    }
}

async fn dispatch_reminder(reminder: ScheduledReminder, now: i64, ctx: &ReminderContext) -> Outcome {
    let mut reminder = match ctx
        .repos
        .scheduled_reminders
        .claim(&reminder.id, now, ctx.config.claim_lease_millis)
        .await
    {
        Ok(Some(reminder)) => reminder,
        Ok(None) => return Outcome::Skipped,
        Err(e) => {
            error!("Unable to claim reminder {}: {:?}", reminder.id, e);
            return Outcome::Skipped;
        }
    };

    let resource = match ctx.repos.resources.find(&reminder.resource_id).await {
        Some(resource) => resource,
        None => return cancel(reminder, "resource_not_found", ctx).await,
    };
    let settings = ctx
        .repos
        .reminder_settings
        .find(&reminder.organization_id)
        .await
        .unwrap_or_else(|| ReminderSettings::new(reminder.organization_id.clone()));
    if resource.completed {
        return cancel(reminder, "resource_completed", ctx).await;
    }
    if !settings.is_trigger_enabled(reminder.trigger_kind) {
        return cancel(reminder, "trigger_disabled", ctx).await;
    }

    let delivery = Delivery {
        reminder: &reminder,
        resource: &resource,
        message: render(
            settings.template(reminder.trigger_kind),
            &resource.template_context(&settings.timezone),
        ),
        channel: settings.channel,
    };
    let outcomes = delivery.send(ctx).await;
    delivery.log(&outcomes, now, ctx).await;

    let attempts = outcomes.iter().map(|o| o.attempts).max().unwrap_or(0);
    let delivered = outcomes.iter().any(|o| o.result.is_ok());
    let last_error = match outcomes.iter().find_map(|o| o.result.as_ref().err()) {
        Some(e) => Some(e.to_string()),
        None if outcomes.is_empty() => Some("no_recipients".to_string()),
        None => None,
    };

    reminder.attempts += attempts;
    if delivered {
        reminder.status = ReminderStatus::Sent;
        reminder.sent_at = Some(now);
        reminder.last_error = None;
    } else {
        reminder.status = ReminderStatus::Failed;
        reminder.last_error = last_error;
    }

    match ctx.repos.scheduled_reminders.complete(&reminder).await {
        Ok(true) => (),
        Ok(false) => {
            warn!(
                "Reminder {} was reclaimed before its outcome was stored",
                reminder.id
            );
            return Outcome::Skipped;
        }
        Err(e) => {
            error!("Unable to store outcome of reminder {}: {:?}", reminder.id, e);
            return Outcome::Skipped;
        }
    }

    if delivered {
        if let Err(e) = schedule_follow_up(&resource, &settings, now, ctx).await {
            error!(
                "Unable to schedule follow-up for resource {}: {:?}",
                resource.id, e
            );
        }
    }

    Outcome::Done(reminder.status)
}

async fn cancel(mut reminder: ScheduledReminder, reason: &str, ctx: &ReminderContext) -> Outcome {
    info!("Cancelling reminder {}: {}", reminder.id, reason);
    reminder.status = ReminderStatus::Cancelled;
    reminder.last_error = Some(reason.to_string());
    match ctx.repos.scheduled_reminders.complete(&reminder).await {
        Ok(true) => Outcome::Done(ReminderStatus::Cancelled),
        Ok(false) => Outcome::Skipped,
        Err(e) => {
            error!("Unable to cancel reminder {}: {:?}", reminder.id, e);
            Outcome::Skipped
        }
    }
}
