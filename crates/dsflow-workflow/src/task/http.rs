//! HTTP request task.

use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::parameter::{Direction, ParamMap};
use crate::{Error, Result};

/// Default connect and socket timeout, in milliseconds.
pub const DEFAULT_HTTP_TIMEOUT_MS: u32 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Head,
    Put,
    Delete,
}

/// How the response decides whether the task succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum HttpCheckCondition {
    #[default]
    StatusCodeDefault,
    StatusCodeCustom,
    BodyContains,
    BodyNotContains,
}

/// Sends an HTTP request and checks the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Http {
    pub url: String,
    pub method: HttpMethod,
    pub params: ParamMap,
    pub check_condition: HttpCheckCondition,
    /// Expected status code or body fragment, required unless the check is
    /// [`HttpCheckCondition::StatusCodeDefault`].
    pub condition: Option<String>,
    pub connect_timeout: u32,
    pub socket_timeout: u32,
}

impl Http {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::default(),
            params: ParamMap::new(),
            check_condition: HttpCheckCondition::default(),
            condition: None,
            connect_timeout: DEFAULT_HTTP_TIMEOUT_MS,
            socket_timeout: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Adds a request parameter, typed like a task input.
    #[must_use]
    pub fn with_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<crate::parameter::ParamValue>,
    ) -> Self {
        self.params.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_check_condition(
        mut self,
        check_condition: HttpCheckCondition,
        condition: Option<String>,
    ) -> Self {
        self.check_condition = check_condition;
        self.condition = condition;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: u32, socket_timeout: u32) -> Self {
        self.connect_timeout = connect_timeout;
        self.socket_timeout = socket_timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.check_condition != HttpCheckCondition::StatusCodeDefault
            && self.condition.as_deref().is_none_or(str::is_empty)
        {
            return Err(Error::parameter(format!(
                "parameter condition is required when http_check_condition is {}",
                self.check_condition
            )));
        }
        Ok(())
    }

    pub(crate) fn custom_params(&self) -> Result<Vec<(&'static str, Value)>> {
        let http_params = self.params.to_parameters(Direction::In)?;

        Ok(vec![
            ("url", json!(self.url)),
            ("httpMethod", json!(self.method.as_ref())),
            ("httpParams", serde_json::to_value(http_params)?),
            ("httpCheckCondition", json!(self.check_condition.as_ref())),
            ("condition", json!(self.condition)),
            ("connectTimeout", json!(self.connect_timeout)),
            ("socketTimeout", json!(self.socket_timeout)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_defaults() {
        let http = Http::new("https://example.com");
        let params = http.custom_params().expect("params");

        assert_eq!(params[1], ("httpMethod", json!("GET")));
        assert_eq!(params[2], ("httpParams", json!([])));
        assert_eq!(params[3], ("httpCheckCondition", json!("STATUS_CODE_DEFAULT")));
        assert_eq!(params[4], ("condition", Value::Null));
        assert_eq!(params[5], ("connectTimeout", json!(60000)));
    }

    #[test]
    fn test_params_are_typed_inputs() {
        let http = Http::new("https://example.com")
            .with_method(HttpMethod::Post)
            .with_param("page", 2);
        let params = http.custom_params().expect("params");

        assert_eq!(
            params[2].1,
            json!([{"prop": "page", "direct": "IN", "type": "INTEGER", "value": 2}])
        );
    }

    #[test]
    fn test_custom_check_requires_condition() {
        let http = Http::new("https://example.com")
            .with_check_condition(HttpCheckCondition::BodyContains, None);
        let error = http.validate().expect_err("condition required");
        assert_eq!(error.kind(), ErrorKind::Parameter);

        let http = Http::new("https://example.com").with_check_condition(
            HttpCheckCondition::StatusCodeCustom,
            Some("201".to_owned()),
        );
        http.validate().expect("condition present");
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("post".parse::<HttpMethod>().expect("parse"), HttpMethod::Post);
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }
}
