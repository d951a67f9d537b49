use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOperation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl StoreOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Artificial per-operation delay standing in for network round trips, so
/// callers exercise the same async contract a remote store would impose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimulatedLatency {
    pub list: Duration,
    pub get: Duration,
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl SimulatedLatency {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn network_like() -> Self {
        Self {
            list: Duration::from_millis(200),
            get: Duration::from_millis(100),
            create: Duration::from_millis(300),
            update: Duration::from_millis(300),
            delete: Duration::from_millis(200),
        }
    }

    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::network_like()
        } else {
            Self::none()
        }
    }

    pub fn delay_for(&self, operation: StoreOperation) -> Duration {
        match operation {
            StoreOperation::List => self.list,
            StoreOperation::Get => self.get,
            StoreOperation::Create => self.create,
            StoreOperation::Update => self.update,
            StoreOperation::Delete => self.delete,
        }
    }

    pub async fn wait(&self, operation: StoreOperation) {
        let delay = self.delay_for(operation);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{SimulatedLatency, StoreOperation};

    #[test]
    fn network_profile_matches_per_operation_delays() {
        let latency = SimulatedLatency::from_flag(true);
        assert_eq!(latency.delay_for(StoreOperation::List), Duration::from_millis(200));
        assert_eq!(latency.delay_for(StoreOperation::Get), Duration::from_millis(100));
        assert_eq!(latency.delay_for(StoreOperation::Create), Duration::from_millis(300));
        assert_eq!(latency.delay_for(StoreOperation::Update), Duration::from_millis(300));
        assert_eq!(latency.delay_for(StoreOperation::Delete), Duration::from_millis(200));
    }

    #[test]
    fn disabled_profile_never_waits() {
        assert_eq!(SimulatedLatency::from_flag(false), SimulatedLatency::none());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_sleeps_for_the_configured_delay() {
        let started = tokio::time::Instant::now();
        SimulatedLatency::network_like().wait(StoreOperation::Create).await;
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
