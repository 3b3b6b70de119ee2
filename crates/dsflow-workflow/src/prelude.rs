//! Prelude module for convenient imports.
//!
//! ```rust
//! use dsflow_workflow::prelude::*;
//! ```

pub use crate::config::WorkflowDefaults;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::parameter::{DataType, Direction, ParamValue, Parameter, convert_params};
pub use crate::resource::{LocalPlugin, Resource, ResourcePlugin, SharedPlugin};
pub use crate::task::{
    Custom, Http, HttpCheckCondition, HttpMethod, Python, Shell, Sql, SqlType, SubWorkflow,
    Switch, SwitchBranch, SwitchCondition, Task, TaskBuilder, TaskKind,
};
pub use crate::workflow::{ExecutionType, ReleaseState, WarningType, Workflow, WorkflowBuilder};
