//! DTOs for the project CI/CD variables endpoints.
//!
//! # Design
//! These mirror the GitLab v4 schema but are defined independently from the
//! mock-server crate; the integration tests catch drift between the two.
//! Unknown response fields (`description`, `raw`, ...) are ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    #[default]
    EnvVar,
    File,
}

/// A project variable as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectVariable {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub variable_type: VariableType,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub masked: bool,
    #[serde(default = "default_scope")]
    pub environment_scope: String,
}

fn default_scope() -> String {
    "*".to_string()
}

/// Request payload for creating a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariable {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub variable_type: VariableType,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub masked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_scope: Option<String>,
}

impl NewVariable {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            variable_type: VariableType::EnvVar,
            protected: false,
            masked: false,
            environment_scope: None,
        }
    }
}

/// Request payload for updating a variable. Only the fields present in the
/// JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<VariableType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn project_variable_defaults() {
        let var: ProjectVariable = serde_json::from_value(json!({"key": "X", "value": "1"})).unwrap();
        assert_eq!(var.variable_type, VariableType::EnvVar);
        assert!(!var.protected);
        assert!(!var.masked);
        assert_eq!(var.environment_scope, "*");
    }

    #[test]
    fn project_variable_ignores_unknown_fields() {
        let var: ProjectVariable = serde_json::from_value(json!({
            "key": "CERT",
            "value": "---",
            "variable_type": "file",
            "raw": false,
            "description": null
        }))
        .unwrap();
        assert_eq!(var.variable_type, VariableType::File);
    }

    #[test]
    fn new_variable_omits_unset_scope() {
        let body = serde_json::to_value(NewVariable::new("X", "1")).unwrap();
        assert_eq!(body["variable_type"], "env_var");
        assert!(body.get("environment_scope").is_none());
    }

    #[test]
    fn variable_update_sends_only_set_fields() {
        let update = VariableUpdate {
            value: Some("2".to_string()),
            protected: Some(true),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(update).unwrap(), json!({"value": "2", "protected": true}));
    }
}
