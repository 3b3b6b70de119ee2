//! Request and response records exchanged with the gateway.
//!
//! Field names are the RPC-level argument names. Every record serializes in
//! camelCase, which is what the HTTP bridge expects on the wire.

use serde::{Deserialize, Serialize};

/// Durable identity assigned to a task by the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskIdentity {
    /// Task code, unique per server.
    pub code: i64,
    /// Task definition version.
    pub version: i32,
}

impl TaskIdentity {
    /// Creates a new identity.
    pub const fn new(code: i64, version: i32) -> Self {
        Self { code, version }
    }
}

/// Resource file metadata returned by `query_resources_file_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Fully-qualified resource name on the server storage.
    pub full_name: String,
    /// Optional description stored with the resource.
    #[serde(default)]
    pub description: Option<String>,
}

/// Datasource usage returned by `get_datasource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceInfo {
    /// Datasource id.
    pub id: i64,
    /// Datasource type, e.g. `MYSQL`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Workflow metadata returned by `get_workflow_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    /// Workflow code.
    pub code: i64,
    /// Workflow name.
    pub name: String,
}

/// User to create on the server when it does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDefinition {
    pub name: String,
    pub password: String,
    pub email: String,
    pub phone: String,
    pub tenant_code: String,
    pub queue: String,
    /// `1` active, `0` inactive.
    pub state: i32,
}

/// Arguments of `create_or_update_workflow`.
///
/// The `*_json` fields carry already-serialized JSON documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub user: String,
    pub project: String,
    pub name: String,
    pub description: String,
    pub global_params: String,
    pub warning_type: String,
    pub warning_group_id: i64,
    pub execution_type: String,
    pub timeout: u64,
    pub worker_group: String,
    /// `1` online, `0` offline.
    pub release_state: i32,
    pub task_relation_json: String,
    pub task_definition_json: String,
    pub schedule_json: Option<String>,
    pub online_schedule: bool,
    /// Reserved by the server, always `None` for now.
    pub other_params_json: Option<String>,
}

/// Arguments of `exec_workflow_instance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStart {
    pub user: String,
    pub project: String,
    pub workflow_name: String,
    pub worker_group: String,
    pub warning_type: String,
    pub warning_group_id: i64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_datasource_info_uses_type_key() {
        let info: DatasourceInfo =
            serde_json::from_value(json!({"id": 7, "type": "MYSQL"})).expect("decode");
        assert_eq!(info.id, 7);
        assert_eq!(info.kind, "MYSQL");
    }

    #[test]
    fn test_workflow_start_is_camel_case() {
        let start = WorkflowStart {
            user: "admin".into(),
            project: "demo".into(),
            workflow_name: "etl".into(),
            worker_group: "default".into(),
            warning_type: "NONE".into(),
            warning_group_id: 0,
        };

        let value = serde_json::to_value(&start).expect("encode");
        assert_eq!(value["workflowName"], "etl");
        assert_eq!(value["warningGroupId"], 0);
    }

    #[test]
    fn test_resource_info_description_is_optional() {
        let info: ResourceInfo =
            serde_json::from_value(json!({"fullName": "/dolphin/a.sh"})).expect("decode");
        assert_eq!(info.full_name, "/dolphin/a.sh");
        assert!(info.description.is_none());
    }
}
