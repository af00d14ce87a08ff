use super::planner::plan_trigger;
use crate::shared::usecase::UseCase;
use reminder_engine_domain::{ReminderExpansionJob, ReminderSettings};
use reminder_engine_infra::ReminderContext;
use tracing::error;

/// Continues generation of the long running recurrences whose expansion job
/// is due. A job that fails stays queued.
#[derive(Debug)]
pub struct ExpandRemindersUseCase;

#[async_trait::async_trait(?Send)]
impl UseCase for ExpandRemindersUseCase {
    /// Number of reminders scheduled
    type Response = u64;

    type Errors = ();

    const NAME: &'static str = "ExpandReminders";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let jobs = ctx.repos.reminder_expansion_jobs.delete_all_before(now).await;

        let mut scheduled = 0;
        for job in jobs {
            match expand(&job, now, ctx).await {
                Ok(count) => scheduled += count,
                Err(e) => {
                    error!(
                        "Unable to expand {} reminders of resource {}: {:?}",
                        job.trigger_kind, job.resource_id, e
                    );
                    // Retried on the next run
                    if let Err(e) = ctx.repos.reminder_expansion_jobs.upsert(&job).await {
                        error!(
                            "Unable to requeue the {} expansion job of resource {}: {:?}",
                            job.trigger_kind, job.resource_id, e
                        );
                    }
                }
            }
        }

        Ok(scheduled)
    }
}

async fn expand(job: &ReminderExpansionJob, now: i64, ctx: &ReminderContext) -> anyhow::Result<u64> {
    let resource = match ctx.repos.resources.find(&job.resource_id).await {
        Some(resource) if !resource.completed => resource,
        _ => return Ok(0),
    };
    let settings = ctx
        .repos
        .reminder_settings
        .find(&job.organization_id)
        .await
        .unwrap_or_else(|| ReminderSettings::new(job.organization_id.clone()));

    let plan = plan_trigger(
        &resource,
        &settings,
        job.trigger_kind,
        job.creation_anchor,
        job.next_index,
        now,
        &ctx.config,
    )?;
    let scheduled = ctx
        .repos
        .scheduled_reminders
        .insert_many(&plan.reminders)
        .await?;
    if let Some(next) = plan.expansion {
        ctx.repos.reminder_expansion_jobs.upsert(&next).await?;
    }

    Ok(scheduled)
}
