//! Workflow Data Model
//!
//! Core data structures describing work to be executed: a [`Workflow`] maps
//! unique node keys to immutable [`NodeSpecification`]s, each carrying the
//! [`EngineDescriptor`] needed to start one engine instance.
//!
//! # Example YAML Format
//!
//! ```yaml
//! nodes:
//!   MD:
//!     input: topol.tpr
//!     steps: 5000
//!     timestep: 0.002
//!     threads: 4
//!     options:
//!       particles: "8"
//! ```

use std::collections::btree_map;
use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::status::Status;

/// Key of the molecular dynamics node that launches an engine.
pub const MD_NODE_KEY: &str = "MD";

/// Default number of integration steps when a descriptor does not say.
pub const DEFAULT_STEPS: u64 = 1000;

/// Default integration timestep.
pub const DEFAULT_TIMESTEP: f64 = 0.002;

/// Engine-specific startup parameters for one computation node.
///
/// The session layer treats this as opaque: only the engine builder
/// interprets `input` and `options`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EngineDescriptor {
    /// Input file the engine is started from (e.g. a run input file)
    pub input: String,

    /// Number of integration steps to run
    #[serde(default = "default_steps")]
    pub steps: u64,

    /// Integration timestep
    #[serde(default = "default_timestep")]
    pub timestep: f64,

    /// Worker threads for force evaluation (engine default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Additional engine-specific settings
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

fn default_steps() -> u64 {
    DEFAULT_STEPS
}

fn default_timestep() -> f64 {
    DEFAULT_TIMESTEP
}

impl EngineDescriptor {
    /// Creates a descriptor for the given input file with default settings.
    ///
    /// # Example
    ///
    /// ```
    /// use simsession::workflow::EngineDescriptor;
    ///
    /// let descriptor = EngineDescriptor::new("topol.tpr")
    ///     .with_steps(500)
    ///     .with_threads(2)
    ///     .with_option("particles", "4");
    /// assert_eq!(descriptor.steps, 500);
    /// ```
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into().trim().to_string(),
            steps: DEFAULT_STEPS,
            timestep: DEFAULT_TIMESTEP,
            threads: None,
            options: BTreeMap::new(),
        }
    }

    /// Sets the number of integration steps.
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the integration timestep.
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Sets the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Adds an engine-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Looks up an engine-specific option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Immutable description of one computation node.
///
/// Cloning produces an independent deep copy that may be launched in a
/// different execution context.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpecification {
    key: String,
    descriptor: EngineDescriptor,
}

impl NodeSpecification {
    /// Creates a node specification.
    ///
    /// Fails if the key is empty or whitespace-only.
    pub fn new(key: impl Into<String>, descriptor: EngineDescriptor) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(SessionError::InvalidWorkflow(
                "node key must not be empty".to_string(),
            ));
        }
        Ok(Self { key, descriptor })
    }

    /// Creates the molecular dynamics node for an input file.
    pub fn md(input: impl Into<String>) -> Self {
        Self {
            key: MD_NODE_KEY.to_string(),
            descriptor: EngineDescriptor::new(input),
        }
    }

    /// The node key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The engine startup parameters.
    pub fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    /// The engine parameters this node passes along, here the input file.
    pub fn params(&self) -> &str {
        &self.descriptor.input
    }
}

/// A run plan: a mapping from unique node keys to node specifications.
///
/// Lookups on absent keys return `None`; absence is a normal outcome when
/// assembling work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    graph: BTreeMap<String, NodeSpecification>,
}

impl Workflow {
    /// Creates an empty workflow.
    pub fn new() -> Self {
        Self {
            graph: BTreeMap::new(),
        }
    }

    /// Builds the single-node workflow that runs an engine from `input`.
    pub fn create(input: impl Into<String>) -> Self {
        Self::create_from(EngineDescriptor::new(input))
    }

    /// Builds the single-node workflow for an engine descriptor.
    pub fn create_from(descriptor: EngineDescriptor) -> Self {
        let node = NodeSpecification {
            key: MD_NODE_KEY.to_string(),
            descriptor,
        };
        let mut graph = BTreeMap::new();
        graph.insert(node.key.clone(), node);
        Self { graph }
    }

    /// Builds a workflow from already-validated nodes.
    ///
    /// Later nodes with a duplicate key replace earlier ones.
    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeSpecification>) -> Self {
        let graph = nodes
            .into_iter()
            .map(|node| (node.key.clone(), node))
            .collect();
        Self { graph }
    }

    /// Adds a node to the graph.
    ///
    /// Dependency validation for multi-node graphs does not exist yet, so
    /// this always reports failure and leaves the graph unchanged.
    pub fn add_node(&mut self, spec: NodeSpecification) -> Status {
        debug!(
            "Refusing to add node '{}': graph editing is not supported",
            spec.key()
        );
        Status::failure()
    }

    /// Returns a copy of the node stored under `key`, if any.
    pub fn get_node(&self, key: &str) -> Option<NodeSpecification> {
        self.graph.get(key).cloned()
    }

    /// Returns true if a node is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.graph.contains_key(key)
    }

    /// Iterates over the node keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.graph.keys().map(String::as_str)
    }

    /// Iterates over the nodes in key order.
    pub fn iter(&self) -> btree_map::Values<'_, String, NodeSpecification> {
        self.graph.values()
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Returns true if the workflow has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

impl<'a> IntoIterator for &'a Workflow {
    type Item = &'a NodeSpecification;
    type IntoIter = btree_map::Values<'a, String, NodeSpecification>;

    fn into_iter(self) -> Self::IntoIter {
        self.graph.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = EngineDescriptor::new(" topol.tpr ");
        assert_eq!(descriptor.input, "topol.tpr");
        assert_eq!(descriptor.steps, DEFAULT_STEPS);
        assert_eq!(descriptor.timestep, DEFAULT_TIMESTEP);
        assert!(descriptor.threads.is_none());
        assert!(descriptor.options.is_empty());
    }

    #[test]
    fn test_descriptor_builders() {
        let descriptor = EngineDescriptor::new("topol.tpr")
            .with_steps(10)
            .with_timestep(0.01)
            .with_threads(3)
            .with_option("particles", "6");

        assert_eq!(descriptor.steps, 10);
        assert_eq!(descriptor.timestep, 0.01);
        assert_eq!(descriptor.threads, Some(3));
        assert_eq!(descriptor.option("particles"), Some("6"));
        assert_eq!(descriptor.option("missing"), None);
    }

    #[test]
    fn test_node_rejects_empty_key() {
        let result = NodeSpecification::new("   ", EngineDescriptor::new("topol.tpr"));
        assert!(matches!(result, Err(SessionError::InvalidWorkflow(_))));
    }

    #[test]
    fn test_node_clone_is_independent() {
        let node = NodeSpecification::md("topol.tpr");
        let copy = node.clone();
        drop(node);
        assert_eq!(copy.key(), MD_NODE_KEY);
        assert_eq!(copy.params(), "topol.tpr");
    }

    #[test]
    fn test_create_single_node() {
        let workflow = Workflow::create("topol.tpr");
        assert_eq!(workflow.len(), 1);
        assert!(workflow.contains(MD_NODE_KEY));

        let node = workflow.get_node(MD_NODE_KEY).unwrap();
        assert_eq!(node.descriptor().input, "topol.tpr");
    }

    #[test]
    fn test_get_missing_node_is_none() {
        let workflow = Workflow::create("topol.tpr");
        assert!(workflow.get_node("nonexistent").is_none());
        assert!(Workflow::new().get_node(MD_NODE_KEY).is_none());
    }

    #[test]
    fn test_add_node_is_unsupported() {
        let mut workflow = Workflow::create("topol.tpr");
        let extra = NodeSpecification::new("analysis", EngineDescriptor::new("traj.trr")).unwrap();

        let status = workflow.add_node(extra);
        assert!(!status.is_success());
        assert_eq!(workflow.len(), 1);
        assert!(workflow.get_node("analysis").is_none());
    }

    #[test]
    fn test_from_nodes_and_iteration() {
        let workflow = Workflow::from_nodes(vec![
            NodeSpecification::new("b", EngineDescriptor::new("b.tpr")).unwrap(),
            NodeSpecification::new("a", EngineDescriptor::new("a.tpr")).unwrap(),
        ]);

        let keys: Vec<&str> = workflow.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);

        let inputs: Vec<&str> = workflow.iter().map(|n| n.params()).collect();
        assert_eq!(inputs, vec!["a.tpr", "b.tpr"]);

        let count = (&workflow).into_iter().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_workflow_default_is_empty() {
        let workflow = Workflow::default();
        assert!(workflow.is_empty());
        assert_eq!(workflow.len(), 0);
    }

    #[test]
    fn test_descriptor_yaml_defaults() {
        let descriptor: EngineDescriptor = serde_yaml::from_str("input: topol.tpr").unwrap();
        assert_eq!(descriptor.steps, DEFAULT_STEPS);
        assert_eq!(descriptor.timestep, DEFAULT_TIMESTEP);
    }
}
