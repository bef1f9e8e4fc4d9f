//! Deployment manifest wrapping the compiled definition.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::CompileOptions;
use crate::defaults::CompilerDefaults;
use crate::error::CompilerError;

pub const STATE_MACHINE_RESOURCE_TYPE: &str = "AWS::StepFunctions::StateMachine";

// =============================================================================
// MANIFEST
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentManifest {
    pub resources: IndexMap<String, StateMachineResource>,
    pub outputs: IndexMap<String, OutputEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachineResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: StateMachineProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachineProperties {
    pub role_arn: String,
    pub state_machine_name: String,
    pub definition_string: DefinitionString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_configuration: Option<LoggingConfiguration>,
}

/// Definition text, substituted by the deployment tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionString {
    #[serde(rename = "Fn::Sub")]
    pub sub: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingConfiguration {
    pub destinations: Vec<LogDestination>,
    pub include_execution_data: bool,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogDestination {
    pub cloud_watch_logs_log_group: LogGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogGroup {
    pub log_group_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputEntry {
    pub description: String,
    pub value: OutputRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRef {
    #[serde(rename = "Ref")]
    pub reference: String,
}

// =============================================================================
// CONSTRUCTION / OUTPUT
// =============================================================================

impl DeploymentManifest {
    /// One state-machine resource and one output, both keyed by playbook name.
    pub fn new(
        name: &str,
        comment: &str,
        definition: String,
        options: &CompileOptions,
        defaults: &CompilerDefaults,
    ) -> Self {
        let logging_configuration = options.logging.then(|| LoggingConfiguration {
            destinations: vec![LogDestination {
                cloud_watch_logs_log_group: LogGroup {
                    log_group_arn: defaults.playbooks_log_group_arn.clone(),
                },
            }],
            include_execution_data: false,
            level: "ALL".into(),
        });

        let mut resources = IndexMap::new();
        resources.insert(
            name.to_string(),
            StateMachineResource {
                resource_type: STATE_MACHINE_RESOURCE_TYPE.into(),
                properties: StateMachineProperties {
                    role_arn: defaults.states_execution_role_arn.clone(),
                    state_machine_name: name.to_string(),
                    definition_string: DefinitionString { sub: definition },
                    logging_configuration,
                },
            },
        );

        let mut outputs = IndexMap::new();
        outputs.insert(
            name.to_string(),
            OutputEntry {
                description: comment.to_string(),
                value: OutputRef {
                    reference: name.to_string(),
                },
            },
        );

        DeploymentManifest { resources, outputs }
    }

    /// The definition text of the (single) state-machine resource.
    pub fn definition(&self) -> Option<&str> {
        self.resources
            .values()
            .next()
            .map(|r| r.properties.definition_string.sub.as_str())
    }

    pub fn to_json(&self) -> Result<String, CompilerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String, CompilerError> {
        serde_yaml::to_string(self).map_err(|e| CompilerError::Serialize(e.to_string()))
    }
}
