//! Workflow Validation
//!
//! Checks node keys and engine descriptors before a workflow is accepted:
//! - Workflow is not empty
//! - Node keys are non-empty and stay distinct once trimmed
//! - Every descriptor names an input and has runnable settings

use std::collections::BTreeSet;

use log::{debug, info, warn};

use super::model::{EngineDescriptor, Workflow, MD_NODE_KEY};
use crate::error::{Result, SessionError};

/// Validation error types for user-friendly error messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyWorkflow,
    EmptyNodeKey,
    DuplicateKey(String),
    EmptyInput(String),
    InvalidTimestep { node: String, timestep: f64 },
    ZeroThreads(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyWorkflow => write!(f, "Workflow has no nodes"),
            Self::EmptyNodeKey => write!(f, "Node has empty or whitespace-only key"),
            Self::DuplicateKey(key) => write!(f, "Node key '{}' appears more than once", key),
            Self::EmptyInput(node) => write!(f, "Node '{}' has no input specified", node),
            Self::InvalidTimestep { node, timestep } => {
                write!(f, "Node '{}' has invalid timestep {}", node, timestep)
            }
            Self::ZeroThreads(node) => write!(f, "Node '{}' requests zero threads", node),
        }
    }
}

/// Validates a single node's key and descriptor.
pub fn validate_node(key: &str, descriptor: &EngineDescriptor) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if key.trim().is_empty() {
        errors.push(ValidationError::EmptyNodeKey);
        return errors;
    }

    if descriptor.input.trim().is_empty() {
        errors.push(ValidationError::EmptyInput(key.to_string()));
    }

    if !descriptor.timestep.is_finite() || descriptor.timestep <= 0.0 {
        errors.push(ValidationError::InvalidTimestep {
            node: key.to_string(),
            timestep: descriptor.timestep,
        });
    }

    if descriptor.threads == Some(0) {
        errors.push(ValidationError::ZeroThreads(key.to_string()));
    }

    if descriptor.steps == 0 {
        warn!("Node '{}' requests zero steps; the engine will not advance", key);
    }

    errors
}

/// Collects every validation problem for a set of nodes.
pub fn collect_errors<'a>(
    nodes: impl IntoIterator<Item = (&'a str, &'a EngineDescriptor)>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    let mut count = 0;

    for (key, descriptor) in nodes {
        count += 1;
        let trimmed = key.trim();
        if !trimmed.is_empty() && !seen.insert(trimmed) {
            errors.push(ValidationError::DuplicateKey(trimmed.to_string()));
        }
        errors.extend(validate_node(key, descriptor));
    }

    if count == 0 {
        errors.push(ValidationError::EmptyWorkflow);
    }

    errors
}

/// Validates the entire workflow.
///
/// All problems are reported together in one error.
pub fn validate_workflow(workflow: &Workflow) -> Result<()> {
    info!("Validating workflow with {} nodes", workflow.len());

    let errors = collect_errors(workflow.iter().map(|node| (node.key(), node.descriptor())));
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(SessionError::InvalidWorkflow(messages.join("\n")));
    }

    if !workflow.contains(MD_NODE_KEY) {
        debug!("Workflow has no '{}' node; only analysis contexts can run it", MD_NODE_KEY);
    }

    info!("Workflow validated: {} nodes", workflow.len());
    Ok(())
}

/// Quick validation that returns a list of error messages.
pub fn quick_validate(workflow: &Workflow) -> Vec<String> {
    collect_errors(workflow.iter().map(|node| (node.key(), node.descriptor())))
        .iter()
        .map(|e| e.to_string())
        .collect()
}
