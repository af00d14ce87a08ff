mod delivery;
mod dispatch_due_reminders;
pub mod expand_reminders;
mod follow_up;
pub mod planner;

use actix_web::web;
use dispatch_due_reminders::dispatch_due_reminders_controller;
pub use dispatch_due_reminders::DispatchDueRemindersUseCase;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/reminders/dispatch",
        web::post().to(dispatch_due_reminders_controller),
    );
}
