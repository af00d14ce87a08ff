use chrono::{Days, TimeZone};
use reminder_engine_domain::{
    localize, ReminderSettings, ReminderStatus, ResourceSnapshot, ScheduledReminder, TriggerKind,
};
use reminder_engine_infra::ReminderContext;

/// Schedules the next follow-up of `resource` `interval_days` after a
/// delivery at `sent_at`.
///
/// Nothing is scheduled while another follow-up is outstanding or when
/// `max_reminders` follow-ups were already generated for the resource.
pub async fn schedule_follow_up(
    resource: &ResourceSnapshot,
    settings: &ReminderSettings,
    sent_at: i64,
    ctx: &ReminderContext,
) -> anyhow::Result<Option<ScheduledReminder>> {
    if resource.completed || !settings.is_trigger_enabled(TriggerKind::FollowUp) {
        return Ok(None);
    }

    let follow_ups = ctx
        .repos
        .scheduled_reminders
        .find_by_resource(&resource.id)
        .await
        .into_iter()
        .filter(|r| r.trigger_kind == TriggerKind::FollowUp)
        .collect::<Vec<_>>();

    if follow_ups
        .iter()
        .any(|r| matches!(r.status, ReminderStatus::Pending | ReminderStatus::Processing))
    {
        return Ok(None);
    }
    let generated = follow_ups
        .iter()
        .filter(|r| r.status != ReminderStatus::Cancelled)
        .count();
    if generated >= settings.follow_up.max_reminders as usize {
        return Ok(None);
    }

    let reminder = ScheduledReminder::new(
        resource,
        TriggerKind::FollowUp,
        follow_ups.len() as u32,
        add_days(settings, sent_at, settings.follow_up.interval_days),
        settings.channel,
        sent_at,
    );
    let inserted = ctx
        .repos
        .scheduled_reminders
        .insert_many(std::slice::from_ref(&reminder))
        .await?;

    Ok((inserted > 0).then_some(reminder))
}

/// Calendar days in the organization's timezone
fn add_days(settings: &ReminderSettings, ts: i64, days: u32) -> i64 {
    settings
        .timezone
        .timestamp_millis_opt(ts)
        .single()
        .and_then(|dt| dt.naive_local().checked_add_days(Days::new(u64::from(days))))
        .and_then(|naive| localize(&settings.timezone, naive))
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(ts + i64::from(days) * 24 * 60 * 60 * 1000)
}
