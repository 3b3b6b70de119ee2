//! Response envelope of the HTTP bridge.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Status reported by the bridge when a call succeeded.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Response body of every bridge call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `SUCCESS` or a failure status.
    pub status: String,
    /// Human-readable message.
    #[serde(default)]
    pub msg: Option<String>,
    /// Call result, `null` for acknowledgements.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Returns `true` when the bridge reported success.
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_SUCCESS)
    }

    /// Extracts the typed result of `method`, failing on a non-success status.
    pub fn into_result<T>(self, method: &'static str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if !self.is_success() {
            let message = self
                .msg
                .unwrap_or_else(|| format!("gateway returned status {}", self.status));
            return Err(Error::remote_call(method, message));
        }

        serde_json::from_value(self.data)
            .map_err(|error| Error::from(error).with_context(method))
    }
}
