//! Workflow Definition Module
//!
//! Provides data structures and utilities for describing, parsing, and
//! validating the work a session executes.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (EngineDescriptor, NodeSpecification, Workflow)
//! - [`parser`]: YAML parsing and loading
//! - [`validator`]: Validation rules

pub mod model;
pub mod parser;
pub mod validator;

pub use model::{EngineDescriptor, NodeSpecification, Workflow, MD_NODE_KEY};
pub use parser::{load_workflow, parse_workflow, save_workflow};
pub use validator::{validate_workflow, ValidationError};
