//! Structured error handling for gateway calls.

use hipstr::HipStr;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Boxed source error, sendable across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a gateway call.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur while talking to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Arguments rejected before the call was made.
    InvalidInput,
    /// The remote entity does not exist.
    NotFound,
    /// The gateway answered with a non-success status.
    RemoteCall,
    /// The gateway could not be reached.
    NetworkError,
    /// The call did not finish in time.
    Timeout,
    /// Arguments or response could not be (de)serialized.
    Serialization,
    /// Client configuration is invalid.
    Configuration,
    /// Anything else.
    #[default]
    Unknown,
}

impl ErrorKind {
    /// Whether a later attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::Timeout)
    }
}

/// Gateway failure with its kind, message and the method involved.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// Failure family.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: Option<HipStr<'static>>,
    /// Underlying cause.
    #[source]
    pub source: Option<BoxedError>,
    /// Name of the remote method involved, if any.
    pub context: Option<HipStr<'static>>,
}

impl Error {
    /// Creates an error of `kind` without message.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            context: None,
        }
    }

    /// Wraps `source` as an error of `kind`.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self {
            kind,
            message: None,
            source: Some(source.into()),
            context: None,
        }
    }

    /// Creates a remote-call error for a failed gateway method.
    pub fn remote_call(method: &'static str, message: impl Into<HipStr<'static>>) -> Self {
        Self::new(ErrorKind::RemoteCall)
            .with_message(message)
            .with_context(method)
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<HipStr<'static>>) -> Self {
        Self::new(ErrorKind::NotFound).with_message(message)
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<HipStr<'static>>) -> Self {
        Self::new(ErrorKind::InvalidInput).with_message(message)
    }

    /// Creates an error for an invalid client configuration.
    pub fn invalid_config(message: impl Into<HipStr<'static>>) -> Self {
        Self::new(ErrorKind::Configuration).with_message(message)
    }

    /// Replaces the message.
    pub fn with_message(mut self, message: impl Into<HipStr<'static>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Replaces the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Records the method involved.
    pub fn with_context(mut self, context: impl Into<HipStr<'static>>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// See [`ErrorKind::is_retryable`].
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::from_source(ErrorKind::Serialization, error)
            .with_message("Invalid gateway payload")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_default_kind_is_unknown() {
        let error = Error::new(ErrorKind::default());
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert!(error.message.is_none() && error.context.is_none());
        assert_eq!(error.to_string(), "[unknown]");
    }

    #[test]
    fn test_remote_call_carries_method() {
        let error = Error::remote_call("create_or_update_workflow", "project not granted");

        assert_eq!(error.kind, ErrorKind::RemoteCall);
        assert_eq!(error.context.as_deref(), Some("create_or_update_workflow"));

        let display = error.to_string();
        assert!(display.contains("remote_call"));
        assert!(display.contains("project not granted"));
    }

    #[test]
    fn test_error_from_serde() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let error = Error::from(source);

        assert_eq!(error.kind, ErrorKind::Serialization);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::new(ErrorKind::NetworkError).is_retryable());
        assert!(Error::new(ErrorKind::Timeout).is_retryable());
        assert!(!Error::new(ErrorKind::RemoteCall).is_retryable());
        assert!(!Error::not_found("missing").is_retryable());
    }

    #[test]
    fn test_error_kind_from_str() {
        assert_eq!(ErrorKind::from_str("remote_call"), Ok(ErrorKind::RemoteCall));
        assert_eq!(ErrorKind::NotFound.as_ref(), "not_found");
    }
}
