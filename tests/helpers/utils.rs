use reminder_engine_domain::{Recipient, ResourceSnapshot, ResourceType, ID};

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn task_snapshot(organization_id: &ID, created_at: i64) -> ResourceSnapshot {
    ResourceSnapshot {
        id: ID::default(),
        organization_id: organization_id.clone(),
        resource_type: ResourceType::Task,
        title: "Prepare chairs".into(),
        created_at,
        due_at: Some(created_at + 2 * 24 * 60 * 60 * 1000),
        completed: false,
        organization_name: "Grace Church".into(),
        ministry_name: None,
        assignee_name: Some("Ana".into()),
        recipients: vec![Recipient {
            user_id: ID::default(),
            phone_number: None,
        }],
    }
}
