mod helpers;

use helpers::setup::spawn_app;
use helpers::utils::{now_millis, task_snapshot};
use reminder_engine_api_structs::dtos::ReminderSettingsDTO;
use reminder_engine_api_structs::{
    get_notification_logs, register_push_subscription, submit_resource_event,
    update_reminder_settings,
};
use reminder_engine_domain::{
    DeliveryChannel, IntervalFollowUp, ResourceEventKind, TriggerTemplates, ID,
};
use serde_json::Value;
use std::time::Duration;

#[actix_web::test]
async fn test_status_ok() {
    let app = spawn_app().await;
    let res = app.client.get(app.url("/")).send().await.unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Yo! We are up!\r\n");
}

#[actix_web::test]
async fn test_reminder_settings() {
    let app = spawn_app().await;
    let organization_id = ID::default();
    let path = format!("/organizations/{}/reminder-settings", organization_id);

    let res = app.client.get(app.url(&path)).send().await.unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    let defaults: ReminderSettingsDTO = serde_json::from_value(body["settings"].clone()).unwrap();
    assert!(defaults.enabled);
    assert_eq!(defaults.timezone, "UTC");

    let mut update = update_reminder_settings::RequestBody {
        enabled: true,
        channel: DeliveryChannel::Both,
        timezone: "America/Sao_Paulo".into(),
        triggers: TriggerTemplates::default(),
        follow_up: IntervalFollowUp::default(),
    };
    let res = app
        .client
        .put(app.url(&path))
        .json(&update)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let res = app.client.get(app.url(&path)).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    let stored: ReminderSettingsDTO = serde_json::from_value(body["settings"].clone()).unwrap();
    assert_eq!(stored.channel, DeliveryChannel::Both);
    assert_eq!(stored.timezone, "America/Sao_Paulo");

    update.timezone = "Mars/Olympus_Mons".into();
    let res = app
        .client
        .put(app.url(&path))
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_resource_event_is_dispatched_and_logged() {
    let app = spawn_app().await;
    let organization_id = ID::default();
    let now = now_millis();

    let event = submit_resource_event::RequestBody {
        kind: ResourceEventKind::Creation,
        resource: task_snapshot(&organization_id, now),
        occurred_at: Some(now),
    };
    let res = app
        .client
        .post(app.url(&format!(
            "/organizations/{}/resource-events",
            organization_id
        )))
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 202);

    // Scheduling runs in the background after the event was accepted
    let logs_path = format!("/organizations/{}/notification-logs", organization_id);
    let mut entries = Vec::new();
    for _ in 0..50 {
        let res = app
            .client
            .post(app.url("/reminders/dispatch"))
            .json(&serde_json::json!({ "now": now_millis() + 1000 }))
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());

        let res = app.client.get(app.url(&logs_path)).send().await.unwrap();
        let body: get_notification_logs::APIResponse = res.json().await.unwrap();
        if !body.entries.is_empty() {
            entries = body.entries;
            break;
        }
        actix_web::rt::time::sleep(Duration::from_millis(50)).await;
    }

    // The recipient never registered a push subscription
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].organization_id, organization_id);
    assert_eq!(entries[0].status.as_str(), "failed");
    assert_eq!(entries[0].channel.as_str(), "push");
    assert_eq!(entries[0].title, "New Task: Prepare chairs");
}

#[actix_web::test]
async fn test_resource_event_of_other_organization_is_rejected() {
    let app = spawn_app().await;
    let event = submit_resource_event::RequestBody {
        kind: ResourceEventKind::Creation,
        resource: task_snapshot(&ID::default(), now_millis()),
        occurred_at: None,
    };
    let res = app
        .client
        .post(app.url(&format!(
            "/organizations/{}/resource-events",
            ID::default()
        )))
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_push_subscriptions() {
    let app = spawn_app().await;
    let user_id = ID::default();
    let path = format!("/users/{}/push-subscriptions", user_id);

    let body = register_push_subscription::RequestBody {
        endpoint: "https://push.example.com/send/abc".into(),
        keys: register_push_subscription::SubscriptionKeys {
            p256dh: "p256dh-key".into(),
            auth: "auth-key".into(),
        },
    };
    let res = app
        .client
        .put(app.url(&path))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let res: register_push_subscription::APIResponse = res.json().await.unwrap();
    assert_eq!(res.subscription.user_id, user_id);

    let delete_path = format!("/push-subscriptions/{}", res.subscription.id);
    let res = app
        .client
        .delete(app.url(&delete_path))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let res = app
        .client
        .delete(app.url(&delete_path))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    let invalid = register_push_subscription::RequestBody {
        endpoint: "not a url".into(),
        keys: register_push_subscription::SubscriptionKeys {
            p256dh: "p256dh-key".into(),
            auth: "auth-key".into(),
        },
    };
    let res = app
        .client
        .put(app.url(&path))
        .json(&invalid)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_gateway_without_configuration() {
    let app = spawn_app().await;
    assert!(app.config.gateway.is_none());
    let path = format!("/organizations/{}/gateway", ID::default());

    let res = app.client.get(app.url(&path)).send().await.unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["connection"]["state"], "absent");
    assert_eq!(body["connection"]["polling"], false);

    let res = app.client.post(app.url(&path)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 503);
}
