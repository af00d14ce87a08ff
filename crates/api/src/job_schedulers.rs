use crate::{
    reminder::{expand_reminders::ExpandRemindersUseCase, DispatchDueRemindersUseCase},
    shared::usecase::execute,
};
use actix_web::rt::time::{interval, sleep_until, Instant};
use reminder_engine_infra::ReminderContext;
use std::time::Duration;
use tracing::info;

pub fn get_start_delay(now_ts: usize, secs_before_min: usize) -> usize {
    let secs_to_next_minute = 60 - (now_ts / 1000) % 60;
    if secs_to_next_minute > secs_before_min {
        secs_to_next_minute - secs_before_min
    } else {
        secs_to_next_minute + (60 - secs_before_min)
    }
}

/// Extends the reminders of unbounded recurrence rules before the already
/// planned ones run out
pub fn start_reminders_expansion_job(ctx: ReminderContext) {
    actix_web::rt::spawn(async move {
        let mut interval = interval(ctx.config.expansion_interval);
        loop {
            interval.tick().await;

            if let Ok(jobs) = execute(ExpandRemindersUseCase, &ctx).await {
                if jobs > 0 {
                    info!("Ran {} reminder expansion jobs", jobs);
                }
            }
        }
    });
}

pub fn start_dispatch_reminders_job(ctx: ReminderContext) {
    actix_web::rt::spawn(async move {
        let now = ctx.sys.get_timestamp_millis();
        let secs_to_next_run = get_start_delay(now as usize, 0);
        let start = Instant::now() + Duration::from_secs(secs_to_next_run as u64);

        sleep_until(start).await;
        let mut dispatch_interval = interval(ctx.config.dispatch_interval);
        loop {
            dispatch_interval.tick().await;
            let context = ctx.clone();
            actix_web::rt::spawn(dispatch_reminders(context));
        }
    });
}

async fn dispatch_reminders(ctx: ReminderContext) {
    let usecase = DispatchDueRemindersUseCase { now: None };
    if let Ok(report) = execute(usecase, &ctx).await {
        if report.claimed > 0 || report.cancelled > 0 {
            info!(
                "Dispatch pass done. Claimed: {}, sent: {}, failed: {}, cancelled: {}",
                report.claimed, report.sent, report.failed, report.cancelled
            );
        }
    }
}
