mod get_reminder_settings;
mod update_reminder_settings;

use actix_web::web;
use get_reminder_settings::get_reminder_settings_controller;
use update_reminder_settings::update_reminder_settings_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/organizations/{org_id}/reminder-settings",
        web::get().to(get_reminder_settings_controller),
    );
    cfg.route(
        "/organizations/{org_id}/reminder-settings",
        web::put().to(update_reminder_settings_controller),
    );
}
