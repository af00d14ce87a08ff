mod on_resource_event;

use actix_web::web;
use on_resource_event::submit_resource_event_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/organizations/{org_id}/resource-events",
        web::post().to(submit_resource_event_controller),
    );
}
