//! Quality of service profiles
//!
//! Profiles are handed to the transport unchanged when an endpoint is created.
//! The loopback transport only honours `history` and `depth`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    SystemDefault,
    KeepLast,
    KeepAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityPolicy {
    SystemDefault,
    Reliable,
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityPolicy {
    SystemDefault,
    TransientLocal,
    Volatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivelinessPolicy {
    SystemDefault,
    Automatic,
    ManualByTopic,
}

/// Endpoint quality of service.
///
/// Durations of zero mean "unspecified", as in the native profile structs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QosProfile {
    pub history: HistoryPolicy,
    pub depth: usize,
    pub reliability: ReliabilityPolicy,
    pub durability: DurabilityPolicy,
    #[serde(with = "duration_millis")]
    pub deadline: Duration,
    #[serde(with = "duration_millis")]
    pub lifespan: Duration,
    pub liveliness: LivelinessPolicy,
    #[serde(with = "duration_millis")]
    pub liveliness_lease_duration: Duration,
    pub avoid_ros_namespace_conventions: bool,
}

impl QosProfile {
    /// Reliable, volatile, keep last 10.
    pub fn default_profile() -> Self {
        Self {
            history: HistoryPolicy::KeepLast,
            depth: 10,
            reliability: ReliabilityPolicy::Reliable,
            durability: DurabilityPolicy::Volatile,
            deadline: Duration::ZERO,
            lifespan: Duration::ZERO,
            liveliness: LivelinessPolicy::SystemDefault,
            liveliness_lease_duration: Duration::ZERO,
            avoid_ros_namespace_conventions: false,
        }
    }

    /// Best effort, keep last 5.
    pub fn sensor_data() -> Self {
        Self {
            depth: 5,
            reliability: ReliabilityPolicy::BestEffort,
            ..Self::default_profile()
        }
    }

    pub fn services_default() -> Self {
        Self::default_profile()
    }

    /// Keep last 1000.
    pub fn parameters() -> Self {
        Self {
            depth: 1000,
            ..Self::default_profile()
        }
    }

    /// Everything deferred to the middleware.
    pub fn system_default() -> Self {
        Self {
            history: HistoryPolicy::SystemDefault,
            depth: 0,
            reliability: ReliabilityPolicy::SystemDefault,
            durability: DurabilityPolicy::SystemDefault,
            ..Self::default_profile()
        }
    }

    pub fn keep_last(mut self, depth: usize) -> Self {
        self.history = HistoryPolicy::KeepLast;
        self.depth = depth;
        self
    }

    pub fn keep_all(mut self) -> Self {
        self.history = HistoryPolicy::KeepAll;
        self
    }

    /// Queue bound implied by the history policy, `None` when unbounded.
    pub fn queue_bound(&self) -> Option<usize> {
        match self.history {
            HistoryPolicy::KeepLast if self.depth > 0 => Some(self.depth),
            HistoryPolicy::KeepLast | HistoryPolicy::KeepAll => None,
            HistoryPolicy::SystemDefault => Some(Self::default_profile().depth),
        }
    }
}

impl Default for QosProfile {
    fn default() -> Self {
        Self::default_profile()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
