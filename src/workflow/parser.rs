//! Workflow Parser
//!
//! Handles loading and saving workflow definitions as YAML files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::model::{EngineDescriptor, NodeSpecification, Workflow};
use super::validator::collect_errors;
use crate::error::{Result, SessionError};

/// On-disk layout of a workflow file.
#[derive(Serialize, Deserialize, Debug, Default)]
struct WorkflowFile {
    #[serde(default)]
    nodes: BTreeMap<String, EngineDescriptor>,
}

/// Parses a workflow from YAML text.
///
/// Every node is validated before the workflow is built; all problems are
/// reported in one error.
pub fn parse_workflow(yaml_content: &str) -> Result<Workflow> {
    let file: WorkflowFile = serde_yaml::from_str(yaml_content)?;

    let errors = collect_errors(file.nodes.iter().map(|(key, d)| (key.as_str(), d)));
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(SessionError::InvalidWorkflow(messages.join("\n")));
    }

    let nodes = file
        .nodes
        .into_iter()
        .map(|(key, descriptor)| NodeSpecification::new(key, descriptor))
        .collect::<Result<Vec<_>>>()?;

    let workflow = Workflow::from_nodes(nodes);
    debug!(
        "Parsed workflow nodes: {:?}",
        workflow.keys().collect::<Vec<_>>()
    );
    Ok(workflow)
}

/// Loads a workflow from a YAML file.
///
/// # Example
///
/// ```rust,no_run
/// use simsession::workflow::load_workflow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = load_workflow("simulation.yaml")?;
///     println!("Loaded {} nodes", workflow.len());
///     Ok(())
/// }
/// ```
pub fn load_workflow(path: impl AsRef<Path>) -> Result<Workflow> {
    let path = path.as_ref();
    info!("Loading workflow from: {}", path.display());

    let yaml_content = fs::read_to_string(path).map_err(|e| {
        SessionError::InvalidWorkflow(format!(
            "Failed to read workflow file '{}': {}. Check that the file exists and is readable.",
            path.display(),
            e
        ))
    })?;

    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    let workflow = parse_workflow(&yaml_content)?;

    info!("Parsed {} nodes", workflow.len());
    Ok(workflow)
}

/// Saves a workflow to a YAML file.
pub fn save_workflow(workflow: &Workflow, path: impl AsRef<Path>) -> Result<()> {
    let file = WorkflowFile {
        nodes: workflow
            .iter()
            .map(|node| (node.key().to_string(), node.descriptor().clone()))
            .collect(),
    };

    let yaml_content = serde_yaml::to_string(&file)?;
    fs::write(path.as_ref(), yaml_content)?;
    info!("Workflow saved to: {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::MD_NODE_KEY;
    use tempfile::tempdir;

    #[test]
    fn test_parse_minimal() {
        let workflow = parse_workflow("nodes:\n  MD:\n    input: topol.tpr\n").unwrap();
        let node = workflow.get_node(MD_NODE_KEY).unwrap();
        assert_eq!(node.params(), "topol.tpr");
    }

    #[test]
    fn test_parse_full_descriptor() {
        let yaml = r#"
nodes:
  MD:
    input: topol.tpr
    steps: 250
    timestep: 0.004
    threads: 2
    options:
      particles: "4"
"#;
        let workflow = parse_workflow(yaml).unwrap();
        let descriptor = workflow.get_node(MD_NODE_KEY).unwrap().descriptor().clone();

        assert_eq!(descriptor.steps, 250);
        assert_eq!(descriptor.timestep, 0.004);
        assert_eq!(descriptor.threads, Some(2));
        assert_eq!(descriptor.option("particles"), Some("4"));
    }

    #[test]
    fn test_parse_rejects_invalid_node() {
        let result = parse_workflow("nodes:\n  MD:\n    input: \"\"\n");
        assert!(matches!(result, Err(SessionError::InvalidWorkflow(_))));
    }

    #[test]
    fn test_parse_rejects_empty_file() {
        let result = parse_workflow("nodes: {}\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_workflow_file_not_found() {
        let result = load_workflow("/nonexistent/path/workflow.yaml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_workflow_invalid_yaml() {
        let temp_dir = tempdir().unwrap();
        let workflow_path = temp_dir.path().join("bad.yaml");
        fs::write(&workflow_path, "this is not valid yaml: [[[").unwrap();

        let result = load_workflow(&workflow_path);
        assert!(matches!(result, Err(SessionError::Yaml(_))));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = tempdir().unwrap();
        let workflow_path = temp_dir.path().join("simulation.yaml");

        let workflow = Workflow::create_from(
            EngineDescriptor::new("topol.tpr")
                .with_steps(42)
                .with_option("particles", "3"),
        );
        save_workflow(&workflow, &workflow_path).unwrap();
        assert!(workflow_path.exists());

        let loaded = load_workflow(&workflow_path).unwrap();
        assert_eq!(loaded, workflow);
    }

    #[test]
    fn test_parse_rejects_keys_equal_after_trimming() {
        let yaml = "nodes:\n  MD:\n    input: a.tpr\n  \" MD\":\n    input: b.tpr\n";
        let err = parse_workflow(yaml).unwrap_err();

        assert!(matches!(err, SessionError::InvalidWorkflow(_)));
        assert!(err.to_string().contains("Node key 'MD' appears more than once"));
    }

    #[test]
    fn test_load_reports_each_problem_once() {
        let temp_dir = tempdir().unwrap();
        let workflow_path = temp_dir.path().join("invalid.yaml");
        fs::write(&workflow_path, "nodes:\n  MD:\n    input: topol.tpr\n    threads: 0\n").unwrap();

        let err = load_workflow(&workflow_path).unwrap_err().to_string();
        assert_eq!(err.matches("requests zero threads").count(), 1);
    }
}
