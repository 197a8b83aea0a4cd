use beatwatch_core::sla::SlaPolicy;
use beatwatch_core::EngineConfig;
use chrono::{DateTime, Utc};

/// Configuration and clock shared by every engine operation
#[derive(Debug, Clone, Default)]
pub struct EngineContext {
    pub config: EngineConfig,
    fixed_now: Option<DateTime<Utc>>,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            fixed_now: None,
        }
    }

    /// Pin the clock; every `now()` returns `at`
    pub fn with_fixed_time(mut self, at: DateTime<Utc>) -> Self {
        self.fixed_now = Some(at);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    pub fn sla_policy(&self) -> SlaPolicy {
        SlaPolicy::from(&self.config.sla)
    }

    pub fn default_duration(&self) -> u32 {
        self.config.scheduling.default_visit_duration_minutes
    }
}
