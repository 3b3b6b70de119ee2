//! Scheduling attributes shared by every task kind.

use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Whether a task is enabled. Also used for the cache flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskFlag {
    #[default]
    Yes,
    No,
}

impl From<bool> for TaskFlag {
    fn from(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Highest,
    High,
    #[default]
    Medium,
    Low,
    Lowest,
}

/// Derived from whether a timeout is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeoutFlag {
    Open,
    Close,
}

/// What the server does when a task times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeoutNotifyStrategy {
    Warn,
    Failed,
    WarnFailed,
}

/// Branch targets of a condition task.
///
/// Unset targets serialize as `[""]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionResult {
    #[serde(serialize_with = "serialize_nodes")]
    pub success_node: Vec<i64>,
    #[serde(serialize_with = "serialize_nodes")]
    pub failed_node: Vec<i64>,
}

fn serialize_nodes<S>(nodes: &[i64], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if nodes.is_empty() {
        [""].serialize(serializer)
    } else {
        nodes.serialize(serializer)
    }
}

/// Converts a duration into whole minutes, rounding any remainder up.
pub fn timeout_minutes(timeout: Duration) -> u64 {
    let minutes = timeout.as_secs() / 60;
    if timeout.as_secs() % 60 != 0 || timeout.subsec_nanos() != 0 {
        minutes + 1
    } else {
        minutes
    }
}

/// Scheduling attributes of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOptions {
    pub description: Option<String>,
    pub flag: TaskFlag,
    pub priority: TaskPriority,
    /// Falls back to the workflow's worker group when unset.
    pub worker_group: Option<String>,
    /// Environment name, resolved to a code on serialization.
    pub environment_name: Option<String>,
    pub delay_time: u32,
    pub fail_retry_times: u32,
    pub fail_retry_interval: u32,
    pub timeout: Option<Duration>,
    pub timeout_notify_strategy: Option<TimeoutNotifyStrategy>,
    pub task_group_id: i64,
    pub task_group_priority: i32,
    pub is_cache: bool,
    pub cpu_quota: Option<i64>,
    pub memory_max: Option<i64>,
    pub condition_result: ConditionResult,
    pub dependence: Map<String, Value>,
    pub wait_start_timeout: Map<String, Value>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            description: None,
            flag: TaskFlag::Yes,
            priority: TaskPriority::Medium,
            worker_group: None,
            environment_name: None,
            delay_time: 0,
            fail_retry_times: 0,
            fail_retry_interval: 1,
            timeout: None,
            timeout_notify_strategy: None,
            task_group_id: 0,
            task_group_priority: 0,
            is_cache: false,
            cpu_quota: None,
            memory_max: None,
            condition_result: ConditionResult::default(),
            dependence: Map::new(),
            wait_start_timeout: Map::new(),
        }
    }
}

impl TaskOptions {
    /// `OPEN` iff a non-zero timeout is configured.
    pub fn timeout_flag(&self) -> TimeoutFlag {
        match self.timeout {
            Some(timeout) if !timeout.is_zero() => TimeoutFlag::Open,
            _ => TimeoutFlag::Close,
        }
    }

    /// Timeout in whole minutes, `0` when unset.
    pub fn timeout_minutes(&self) -> u64 {
        self.timeout.map(timeout_minutes).unwrap_or(0)
    }
}
