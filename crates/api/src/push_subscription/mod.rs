mod register_push_subscription;
mod unregister_push_subscription;

use actix_web::web;
use register_push_subscription::register_push_subscription_controller;
use unregister_push_subscription::unregister_push_subscription_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/users/{user_id}/push-subscriptions",
        web::put().to(register_push_subscription_controller),
    );
    cfg.route(
        "/push-subscriptions/{subscription_id}",
        web::delete().to(unregister_push_subscription_controller),
    );
}
