use chrono::TimeZone;
use reminder_engine_domain::{
    next_occurrences, InvalidRuleError, ReminderExpansionJob, ReminderSettings, ResourceSnapshot,
    ScheduledReminder, TriggerKind,
};
use reminder_engine_infra::Config;

/// Upper bound on occurrences looked at by one planning run. Long stale
/// stretches of an old rule are continued by an expansion job.
const MAX_SCANNED_OCCURRENCES: u32 = 10_000;

#[derive(Debug, Default)]
pub struct TriggerPlan {
    pub reminders: Vec<ScheduledReminder>,
    /// Set when the rule has occurrences beyond this batch
    pub expansion: Option<ReminderExpansionJob>,
}

/// Plans the next batch of reminders of one trigger for a resource, starting
/// at occurrence `start_index`. After-creation occurrences count from
/// `creation_anchor`.
///
/// Occurrences older than the stale grace are skipped but keep their index,
/// and the `max_reminders` ceiling of the follow-up configuration caps the
/// index when follow-ups are enabled.
pub fn plan_trigger(
    resource: &ResourceSnapshot,
    settings: &ReminderSettings,
    kind: TriggerKind,
    creation_anchor: i64,
    start_index: u32,
    now: i64,
    config: &Config,
) -> Result<TriggerPlan, InvalidRuleError> {
    let mut plan = TriggerPlan::default();

    let trigger = match settings.trigger(kind) {
        Some(trigger) if settings.is_trigger_enabled(kind) => trigger,
        _ => return Ok(plan),
    };
    let anchor = match resource
        .trigger_anchor(kind, trigger, creation_anchor)
        .and_then(|ts| settings.timezone.timestamp_millis_opt(ts).single())
    {
        Some(anchor) => anchor,
        None => return Ok(plan),
    };

    let ceiling = settings.occurrence_ceiling().unwrap_or(u32::MAX);
    let batch_size = config.expansion_batch_size.max(1);
    let stale_before = now - config.stale_occurrence_grace_millis;

    let mut occurrences = next_occurrences(anchor, &trigger.repeat, start_index)?;
    let mut scanned = 0;
    loop {
        let index = occurrences.next_index();
        if index >= ceiling {
            break;
        }
        if plan.reminders.len() >= batch_size || scanned >= MAX_SCANNED_OCCURRENCES {
            if occurrences.clone().next().is_some() {
                plan.expansion = Some(ReminderExpansionJob {
                    organization_id: resource.organization_id.clone(),
                    resource_id: resource.id.clone(),
                    trigger_kind: kind,
                    next_index: index,
                    creation_anchor,
                    run_at: plan
                        .reminders
                        .first()
                        .map(|r| r.scheduled_at)
                        .unwrap_or(now),
                });
            }
            break;
        }

        let occurrence = match occurrences.next() {
            Some(occurrence) => occurrence,
            None => break,
        };
        scanned += 1;

        let scheduled_at = occurrence.timestamp_millis();
        if scheduled_at < stale_before {
            continue;
        }
        plan.reminders.push(ScheduledReminder::new(
            resource,
            kind,
            index,
            scheduled_at,
            settings.channel,
            now,
        ));
    }

    Ok(plan)
}
