use crate::error::ApiError;
use crate::reminder::planner::plan_trigger;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use reminder_engine_api_structs::submit_resource_event::*;
use reminder_engine_domain::{
    InvalidRuleError, ReminderSettings, ResourceEvent, ResourceEventKind, ResourceSnapshot,
    TriggerKind,
};
use reminder_engine_infra::ReminderContext;
use tracing::error;
use tracing_futures::Instrument;

/// Accepts a lifecycle event of a resource and schedules its reminders in
/// the background. Scheduling failures are only logged.
pub async fn submit_resource_event_controller(
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let body = body.0;
    if body.resource.organization_id != path.org_id {
        return Err(ApiError::BadClientData(format!(
            "The resource belongs to organization: {}, not: {}",
            body.resource.organization_id, path.org_id
        )));
    }

    let usecase = OnResourceEventUseCase {
        event: ResourceEvent {
            kind: body.kind,
            occurred_at: body
                .occurred_at
                .unwrap_or_else(|| ctx.sys.get_timestamp_millis()),
            resource: body.resource,
        },
    };
    let ctx = ctx.get_ref().clone();
    actix_web::rt::spawn(
        async move {
            if let Err(e) = execute(usecase, &ctx).await {
                error!("Unable to schedule the reminders of a resource event: {}", e);
            }
        }
        .instrument(tracing::Span::current()),
    );

    Ok(HttpResponse::Accepted().json(APIResponse { accepted: true }))
}

#[derive(Debug)]
pub struct OnResourceEventUseCase {
    pub event: ResourceEvent,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UseCaseResponse {
    pub scheduled: u64,
    pub cancelled: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum UseCaseError {
    #[error("Storage error: {0}")]
    StorageError(anyhow::Error),
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(InvalidRuleError),
}

impl From<anyhow::Error> for UseCaseError {
    fn from(e: anyhow::Error) -> Self {
        UseCaseError::StorageError(e)
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for OnResourceEventUseCase {
    type Response = UseCaseResponse;

    type Errors = UseCaseError;

    const NAME: &'static str = "OnResourceEvent";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Errors> {
        let resource = &self.event.resource;
        let mut res = UseCaseResponse::default();

        if self.event.kind == ResourceEventKind::Deleted {
            res.cancelled = cancel_everything(resource, ctx).await?;
            ctx.repos.resources.delete(&resource.id).await;
            return Ok(res);
        }

        let previous = ctx.repos.resources.find(&resource.id).await;
        ctx.repos.resources.upsert(resource).await?;

        let settings = ctx
            .repos
            .reminder_settings
            .find(&resource.organization_id)
            .await
            .unwrap_or_else(|| ReminderSettings::new(resource.organization_id.clone()));
        if resource.completed || !settings.enabled {
            res.cancelled = cancel_everything(resource, ctx).await?;
            return Ok(res);
        }

        if self.event.kind == ResourceEventKind::Updated {
            let invalid = invalidated_triggers(previous.as_ref(), resource, &settings);
            if !invalid.is_empty() {
                res.cancelled = ctx
                    .repos
                    .scheduled_reminders
                    .cancel_pending(&resource.id, Some(&invalid))
                    .await?;
            }
        }

        let now = ctx.sys.get_timestamp_millis();
        let creation_anchor = self.event.creation_anchor();
        for kind in self.event.trigger_kinds() {
            let plan = plan_trigger(
                resource,
                &settings,
                *kind,
                creation_anchor,
                0,
                now,
                &ctx.config,
            )
            .map_err(UseCaseError::InvalidRule)?;
            res.scheduled += ctx
                .repos
                .scheduled_reminders
                .insert_many(&plan.reminders)
                .await?;
            if let Some(job) = plan.expansion {
                ctx.repos.reminder_expansion_jobs.upsert(&job).await?;
            }
        }

        Ok(res)
    }
}

async fn cancel_everything(
    resource: &ResourceSnapshot,
    ctx: &ReminderContext,
) -> Result<u64, UseCaseError> {
    let cancelled = ctx
        .repos
        .scheduled_reminders
        .cancel_pending(&resource.id, None)
        .await?;
    ctx.repos
        .reminder_expansion_jobs
        .delete_by_resource(&resource.id)
        .await?;
    Ok(cancelled)
}

/// Triggers whose pending reminders no longer hold after an update: the
/// disabled ones and those anchored to a moved timestamp
fn invalidated_triggers(
    previous: Option<&ResourceSnapshot>,
    resource: &ResourceSnapshot,
    settings: &ReminderSettings,
) -> Vec<TriggerKind> {
    let mut invalid = settings.disabled_triggers();
    if let Some(previous) = previous {
        if previous.created_at != resource.created_at {
            invalid.push(TriggerKind::AfterCreation);
        }
        if previous.due_at != resource.due_at {
            invalid.push(TriggerKind::BeforeDue);
            invalid.push(TriggerKind::OnDue);
        }
    }
    invalid.sort();
    invalid.dedup();
    invalid
}
