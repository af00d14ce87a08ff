use super::refresh_gateway_connection::RefreshGatewayConnectionUseCase;
use crate::shared::usecase::execute;
use actix_web::rt::time::{interval, timeout};
use reminder_engine_domain::{ConnectionState, ID};
use reminder_engine_infra::ReminderContext;
use tracing::info;

fn poll_key(organization_id: &ID) -> String {
    format!("gateway-poll:{}", organization_id)
}

/// Polls the connection of the organization until it leaves `pairing` or the
/// pairing window elapses. At most one poller runs per organization, returns
/// whether a new one was started.
pub fn start_polling(ctx: &ReminderContext, organization_id: &ID) -> bool {
    let task_ctx = ctx.clone();
    let organization_id = organization_id.clone();
    ctx.tasks.spawn_unique(&poll_key(&organization_id), async move {
        let window = task_ctx.config.gateway_pairing_window;
        if timeout(window, poll_while_pairing(&task_ctx, &organization_id))
            .await
            .is_err()
        {
            info!(
                "Pairing window of organization {} elapsed, stopped polling",
                organization_id
            );
        }
    })
}

/// Returns whether a poller was running
pub fn stop_polling(ctx: &ReminderContext, organization_id: &ID) -> bool {
    ctx.tasks.cancel(&poll_key(organization_id))
}

pub fn is_polling(ctx: &ReminderContext, organization_id: &ID) -> bool {
    ctx.tasks.is_running(&poll_key(organization_id))
}

async fn poll_while_pairing(ctx: &ReminderContext, organization_id: &ID) {
    let mut ticker = interval(ctx.config.gateway_poll_interval);
    loop {
        ticker.tick().await;
        let usecase = RefreshGatewayConnectionUseCase {
            organization_id: organization_id.clone(),
        };
        if let Ok(connection) = execute(usecase, ctx).await {
            if connection.state != ConnectionState::Pairing {
                info!(
                    "Gateway connection of organization {} is {}, stopped polling",
                    organization_id, connection.state
                );
                return;
            }
        }
    }
}
