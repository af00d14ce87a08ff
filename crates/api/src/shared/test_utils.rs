//! Scriptable fakes of the external services and an in-memory context
//! wired up with them.

use reminder_engine_domain::{
    ChannelConnection, ConnectionState, DeliveryError, PairingPayload, PushPayload,
    PushSubscription, Recipient, RemoteInstanceState, RemoteState, ResourceSnapshot, ResourceType,
    RetryPolicy, ScheduledReminder, TriggerKind, ID,
};
use reminder_engine_infra::{
    ConnectOutcome, CreatedInstance, GatewayError, IGatewayClient, IPushSender,
    IScheduledReminderRepo, ReminderContext, StaticTimeSys,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

// 2024-01-01T09:00:00Z
pub const START_TS: i64 = 1704099600000;
pub const MINUTE: i64 = 60 * 1000;
pub const DAY: i64 = 24 * 60 * MINUTE;

pub struct FakeGateway {
    pub configured: bool,
    pub remote_state: Mutex<Result<RemoteState, GatewayError>>,
    /// How long `connection_state` takes to answer
    pub state_delay: Mutex<Duration>,
    pub connect_outcome: Mutex<Result<ConnectOutcome, GatewayError>>,
    pub create_result: Mutex<Result<(), GatewayError>>,
    pub delete_result: Mutex<Result<(), GatewayError>>,
    /// Popped per `send_text`, success once empty
    pub send_results: Mutex<VecDeque<Result<(), GatewayError>>>,
    pub texts: Mutex<Vec<(String, String, String)>>,
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub polls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            configured: true,
            remote_state: Mutex::new(Ok(remote(RemoteInstanceState::Connecting))),
            state_delay: Mutex::new(Duration::ZERO),
            connect_outcome: Mutex::new(Ok(ConnectOutcome::Pairing(pairing_payload()))),
            create_result: Mutex::new(Ok(())),
            delete_result: Mutex::new(Ok(())),
            send_results: Mutex::new(VecDeque::new()),
            texts: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn set_remote_state(&self, state: Result<RemoteState, GatewayError>) {
        *self.remote_state.lock().unwrap() = state;
    }

    fn guard(&self) -> Result<(), GatewayError> {
        if self.configured {
            Ok(())
        } else {
            Err(GatewayError::NotConfigured)
        }
    }
}

#[async_trait::async_trait]
impl IGatewayClient for FakeGateway {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn create_instance(&self, instance_name: &str) -> Result<CreatedInstance, GatewayError> {
        self.guard()?;
        self.create_result.lock().unwrap().clone()?;
        self.created.lock().unwrap().push(instance_name.to_string());
        Ok(CreatedInstance {
            instance_name: instance_name.to_string(),
            token: Some("instance-token".into()),
        })
    }

    async fn connect(&self, _instance_name: &str) -> Result<ConnectOutcome, GatewayError> {
        self.guard()?;
        self.connect_outcome.lock().unwrap().clone()
    }

    async fn connection_state(&self, _instance_name: &str) -> Result<RemoteState, GatewayError> {
        self.guard()?;
        self.polls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state_delay.lock().unwrap();
        if !delay.is_zero() {
            actix_web::rt::time::sleep(delay).await;
        }
        self.remote_state.lock().unwrap().clone()
    }

    async fn logout(&self, _instance_name: &str) -> Result<(), GatewayError> {
        self.guard()
    }

    async fn delete_instance(&self, instance_name: &str) -> Result<(), GatewayError> {
        self.guard()?;
        self.delete_result.lock().unwrap().clone()?;
        self.deleted.lock().unwrap().push(instance_name.to_string());
        Ok(())
    }

    async fn send_text(
        &self,
        instance_name: &str,
        number: &str,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.guard()?;
        if let Some(result) = self.send_results.lock().unwrap().pop_front() {
            result?;
        }
        self.texts.lock().unwrap().push((
            instance_name.to_string(),
            number.to_string(),
            text.to_string(),
        ));
        Ok(())
    }
}

pub struct FakePush {
    /// Popped per send to an endpoint, success once empty
    pub results: Mutex<HashMap<String, VecDeque<Result<(), DeliveryError>>>>,
    pub sent: Mutex<Vec<(String, PushPayload)>>,
    pub calls: AtomicUsize,
}

impl FakePush {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, endpoint: &str, results: Vec<Result<(), DeliveryError>>) {
        self.results
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), results.into());
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl IPushSender for FakePush {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so that concurrent dispatch passes interleave
        actix_web::rt::time::sleep(Duration::from_millis(5)).await;
        let scripted = self
            .results
            .lock()
            .unwrap()
            .get_mut(&subscription.endpoint)
            .and_then(|results| results.pop_front());
        if let Some(result) = scripted {
            result?;
        }
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), payload.clone()));
        Ok(())
    }
}

/// Scheduled reminder repo whose next `failures` inserts fail
pub struct FlakyReminderRepo {
    inner: Arc<dyn IScheduledReminderRepo>,
    failures: Mutex<u32>,
}

impl FlakyReminderRepo {
    pub fn install(ctx: &mut ReminderContext, failures: u32) {
        ctx.repos.scheduled_reminders = Arc::new(Self {
            inner: ctx.repos.scheduled_reminders.clone(),
            failures: Mutex::new(failures),
        });
    }
}

#[async_trait::async_trait]
impl IScheduledReminderRepo for FlakyReminderRepo {
    async fn insert_many(&self, reminders: &[ScheduledReminder]) -> anyhow::Result<u64> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(anyhow::anyhow!("connection reset"));
            }
        }
        self.inner.insert_many(reminders).await
    }

    async fn find(&self, reminder_id: &ID) -> Option<ScheduledReminder> {
        self.inner.find(reminder_id).await
    }

    async fn find_by_resource(&self, resource_id: &ID) -> Vec<ScheduledReminder> {
        self.inner.find_by_resource(resource_id).await
    }

    async fn find_due(
        &self,
        now: i64,
        lease_millis: i64,
        limit: usize,
    ) -> Vec<ScheduledReminder> {
        self.inner.find_due(now, lease_millis, limit).await
    }

    async fn claim(
        &self,
        reminder_id: &ID,
        now: i64,
        lease_millis: i64,
    ) -> anyhow::Result<Option<ScheduledReminder>> {
        self.inner.claim(reminder_id, now, lease_millis).await
    }

    async fn complete(&self, reminder: &ScheduledReminder) -> anyhow::Result<bool> {
        self.inner.complete(reminder).await
    }

    async fn cancel_pending(
        &self,
        resource_id: &ID,
        trigger_kinds: Option<&[TriggerKind]>,
    ) -> anyhow::Result<u64> {
        self.inner.cancel_pending(resource_id, trigger_kinds).await
    }

    async fn cancel_pending_by_organization(
        &self,
        organization_id: &ID,
        trigger_kinds: Option<&[TriggerKind]>,
    ) -> anyhow::Result<u64> {
        self.inner
            .cancel_pending_by_organization(organization_id, trigger_kinds)
            .await
    }
}

pub struct TestContext {
    pub ctx: ReminderContext,
    pub gateway: Arc<FakeGateway>,
    pub push: Arc<FakePush>,
    pub sys: Arc<StaticTimeSys>,
}

pub fn setup() -> TestContext {
    setup_with_gateway(FakeGateway::new())
}

pub fn setup_with_gateway(gateway: FakeGateway) -> TestContext {
    let mut ctx = ReminderContext::create_inmemory();
    let gateway = Arc::new(gateway);
    let push = Arc::new(FakePush::new());
    let sys = Arc::new(StaticTimeSys::new(START_TS));
    ctx.gateway = gateway.clone();
    ctx.push = push.clone();
    ctx.sys = sys.clone();
    ctx.config.retry_policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        factor: 2,
        max_delay: Duration::from_millis(4),
    };
    ctx.config.gateway_poll_interval = Duration::from_millis(10);
    ctx.config.gateway_pairing_window = Duration::from_millis(500);
    ctx.config.expansion_batch_size = 20;
    ctx.config.stale_occurrence_grace_millis = 5 * MINUTE;
    ctx.config.claim_lease_millis = 5 * MINUTE;

    TestContext {
        ctx,
        gateway,
        push,
        sys,
    }
}

pub fn remote(state: RemoteInstanceState) -> RemoteState {
    RemoteState {
        state,
        owner: Some("5511999990000@s.whatsapp.net".into()),
        profile_name: Some("Grace Church".into()),
        profile_picture_url: None,
    }
}

pub fn pairing_payload() -> PairingPayload {
    PairingPayload {
        qr_image: Some("data:image/png;base64,iVBORw0KGgo=".into()),
        code: Some("2@abcdef".into()),
        pairing_code: None,
    }
}

/// A task of `organization_id` due two days after `START_TS` with one
/// recipient that has a phone number
pub fn task(organization_id: &ID) -> ResourceSnapshot {
    ResourceSnapshot {
        id: ID::default(),
        organization_id: organization_id.clone(),
        resource_type: ResourceType::Task,
        title: "Prepare chairs".into(),
        created_at: START_TS,
        due_at: Some(START_TS + 2 * DAY),
        completed: false,
        organization_name: "Grace Church".into(),
        ministry_name: Some("Hospitality".into()),
        assignee_name: Some("Ana".into()),
        recipients: vec![Recipient {
            user_id: ID::default(),
            phone_number: Some("5511988887777".into()),
        }],
    }
}

pub async fn subscribe(ctx: &ReminderContext, user_id: &ID, endpoint: &str) -> PushSubscription {
    let subscription = PushSubscription::new(
        user_id.clone(),
        endpoint.to_string(),
        "p256dh-key".into(),
        "auth-key".into(),
        START_TS,
    )
    .unwrap();
    ctx.repos
        .push_subscriptions
        .upsert(&subscription)
        .await
        .unwrap()
}

/// Stores a connected gateway connection for the organization
pub async fn connect_gateway(ctx: &ReminderContext, organization_id: &ID) -> ChannelConnection {
    let mut connection = ChannelConnection::absent(organization_id.clone(), START_TS);
    connection
        .begin_pairing("org-test".into(), Some("instance-token".into()), START_TS)
        .unwrap();
    connection.observe(&remote(RemoteInstanceState::Open), START_TS);
    assert_eq!(connection.state, ConnectionState::Connected);
    ctx.repos
        .channel_connections
        .save(&connection)
        .await
        .unwrap();
    connection
}
