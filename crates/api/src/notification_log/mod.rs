mod get_notification_logs;

use actix_web::web;
use get_notification_logs::get_notification_logs_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/organizations/{org_id}/notification-logs",
        web::get().to(get_notification_logs_controller),
    );
}
