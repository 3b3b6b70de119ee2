use serde::Serialize;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// Who gets notified when a workflow instance finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum WarningType {
    Failure,
    Success,
    All,
    None,
}

/// How concurrent instances of one workflow are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    Parallel,
    SerialWait,
    SerialDiscard,
    SerialPriority,
}

/// Whether a submitted workflow can be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    Online,
    Offline,
}

impl ReleaseState {
    /// Integer sent to the server.
    pub fn code(self) -> i32 {
        match self {
            Self::Online => 1,
            Self::Offline => 0,
        }
    }
}

impl WarningType {
    /// Parses after trimming and uppercasing.
    pub fn parse(value: &str) -> Result<Self> {
        value.trim().to_ascii_uppercase().parse().map_err(|_| {
            Error::parameter(format!(
                "parameter warning_type with unexpected value {value:?}, expected one of FAILURE, SUCCESS, ALL, NONE"
            ))
        })
    }
}

impl ExecutionType {
    /// Parses after trimming and uppercasing.
    pub fn parse(value: &str) -> Result<Self> {
        value.trim().to_ascii_uppercase().parse().map_err(|_| {
            Error::parameter(format!(
                "parameter execution_type with unexpected value {value:?}, expected one of PARALLEL, SERIAL_WAIT, SERIAL_DISCARD, SERIAL_PRIORITY"
            ))
        })
    }
}

impl ReleaseState {
    /// Case-insensitive `online` or `offline`.
    pub fn parse(value: &str) -> Result<Self> {
        value.to_ascii_lowercase().parse().map_err(|_| {
            Error::parameter(format!(
                "parameter release_state only supports online or offline but got {value:?}"
            ))
        })
    }
}
