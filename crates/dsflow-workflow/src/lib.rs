#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod config;
mod error;
mod operator;
pub mod parameter;
pub mod relation;
pub mod resource;
pub mod task;
pub mod workflow;

#[doc(hidden)]
pub mod prelude;

pub use error::{Error, ErrorKind, Result};
pub use task::{Task, TaskBuilder, TaskKind};
pub use workflow::{Workflow, WorkflowBuilder};
