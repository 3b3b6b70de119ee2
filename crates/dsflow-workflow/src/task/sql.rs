//! SQL statement task.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use super::TRACING_TARGET;
use crate::Result;
use crate::workflow::Workflow;

/// Default number of result rows shown by the server.
pub const DEFAULT_DISPLAY_ROWS: u32 = 10;

static NOT_SELECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[^\n]* )?(?:insert|delete|drop|update|truncate|alter|create) ")
        .expect("statement pattern is valid")
});

/// Whether the statement returns rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Select,
    NotSelect,
}

impl SqlType {
    /// Detects the statement type from the first line of `sql`.
    pub fn detect(sql: &str) -> Self {
        if NOT_SELECT.is_match(sql.trim_start()) {
            Self::NotSelect
        } else {
            Self::Select
        }
    }

    /// Wire code of this type.
    pub fn code(self) -> &'static str {
        match self {
            Self::Select => "0",
            Self::NotSelect => "1",
        }
    }
}

/// Runs SQL against a named datasource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sql {
    pub datasource_name: String,
    /// Narrows the datasource lookup when names collide across types.
    pub datasource_type: Option<String>,
    /// Statement body, or the name of a `.sql` file.
    pub sql: String,
    /// Overrides the detected statement type.
    pub sql_type: Option<SqlType>,
    pub delimiter: Option<String>,
    pub pre_statements: Vec<String>,
    pub post_statements: Vec<String>,
    pub display_rows: u32,
}

impl Sql {
    pub fn new(datasource_name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            datasource_name: datasource_name.into(),
            datasource_type: None,
            sql: sql.into(),
            sql_type: None,
            delimiter: None,
            pre_statements: Vec::new(),
            post_statements: Vec::new(),
            display_rows: DEFAULT_DISPLAY_ROWS,
        }
    }

    #[must_use]
    pub fn with_datasource_type(mut self, datasource_type: impl Into<String>) -> Self {
        self.datasource_type = Some(datasource_type.into());
        self
    }

    #[must_use]
    pub fn with_sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    #[must_use]
    pub fn with_statements(mut self, pre: Vec<String>, post: Vec<String>) -> Self {
        self.pre_statements = pre;
        self.post_statements = post;
        self
    }

    #[must_use]
    pub fn with_display_rows(mut self, display_rows: u32) -> Self {
        self.display_rows = display_rows;
        self
    }

    /// Explicit statement type, or the one detected from the body.
    pub fn effective_sql_type(&self) -> SqlType {
        self.sql_type.unwrap_or_else(|| SqlType::detect(&self.sql))
    }

    pub(crate) async fn custom_params(
        &self,
        workflow: &Workflow,
    ) -> Result<Vec<(&'static str, Value)>> {
        let sql_type = self.effective_sql_type();
        if sql_type == SqlType::Select && self.delimiter.is_some() {
            tracing::warn!(
                target: TRACING_TARGET,
                datasource = %self.datasource_name,
                "Statement delimiter has no effect on select statements"
            );
        }

        let datasource = workflow
            .gateway()
            .get_datasource(&self.datasource_name, self.datasource_type.as_deref())
            .await?;

        Ok(vec![
            ("sql", json!(self.sql)),
            ("sqlType", json!(sql_type.code())),
            ("segmentSeparator", json!(self.delimiter.as_deref().unwrap_or(""))),
            ("preStatements", json!(self.pre_statements)),
            ("postStatements", json!(self.post_statements)),
            ("displayRows", json!(self.display_rows)),
            ("type", json!(datasource.kind)),
            ("datasource", json!(datasource.id)),
        ])
    }
}
