//! Directed edges between task identities.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::{Map, Value};

/// Predecessor code used by synthesized root relations.
pub const ROOT_TASK_CODE: i64 = 0;

/// A directed edge `pre -> post` between two task codes.
///
/// Equality, ordering and hashing only consider `(pre, post)`: the same
/// dependency declared twice is the same relation regardless of its name.
#[derive(Debug, Clone)]
pub struct TaskRelation {
    pre_task_code: i64,
    post_task_code: i64,
    name: String,
}

impl TaskRelation {
    /// Creates a relation between two task codes.
    pub fn new(pre_task_code: i64, post_task_code: i64) -> Self {
        Self {
            pre_task_code,
            post_task_code,
            name: String::new(),
        }
    }

    /// Creates the synthetic root relation of a task.
    pub fn root(post_task_code: i64) -> Self {
        Self::new(ROOT_TASK_CODE, post_task_code)
    }

    /// Sets a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn pre_task_code(&self) -> i64 {
        self.pre_task_code
    }

    pub fn post_task_code(&self) -> i64 {
        self.post_task_code
    }

    /// Display name; never sent to the server.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` for a synthesized root relation.
    pub fn is_root(&self) -> bool {
        self.pre_task_code == ROOT_TASK_CODE
    }

    fn key(&self) -> (i64, i64) {
        (self.pre_task_code, self.post_task_code)
    }

    /// Serializes this relation into its wire record.
    pub fn to_definition(&self) -> RelationDefinition {
        RelationDefinition {
            name: String::new(),
            pre_task_code: self.pre_task_code,
            post_task_code: self.post_task_code,
            pre_task_version: 1,
            post_task_version: 1,
            condition_type: 0,
            condition_params: Map::new(),
        }
    }
}

impl PartialEq for TaskRelation {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TaskRelation {}

impl Hash for TaskRelation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for TaskRelation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskRelation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Wire record of a relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDefinition {
    pub name: String,
    pub pre_task_code: i64,
    pub post_task_code: i64,
    pub pre_task_version: i32,
    pub post_task_version: i32,
    pub condition_type: i32,
    pub condition_params: Map<String, Value>,
}
