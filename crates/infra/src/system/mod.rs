use chrono::Utc;

// Mocking out time so that it is possible to run tests that depend on time.
pub trait ISys: Send + Sync {
    /// The current timestamp in millis
    fn get_timestamp_millis(&self) -> i64;
}

/// System that gets the real time and is used when not testing
pub struct RealSys {}
impl ISys for RealSys {
    fn get_timestamp_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock frozen at a given timestamp which can be moved by tests
pub struct StaticTimeSys {
    millis: std::sync::atomic::AtomicI64,
}

impl StaticTimeSys {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis
            .store(millis, std::sync::atomic::Ordering::SeqCst);
    }
}

impl ISys for StaticTimeSys {
    fn get_timestamp_millis(&self) -> i64 {
        self.millis.load(std::sync::atomic::Ordering::SeqCst)
    }
}
