//! Session Monitoring Module
//!
//! Provides the lifecycle timeline each session keeps for run reports.
//!
//! # Components
//!
//! - [`SessionTimeline`]: timestamped lifecycle events with JSON export

pub mod timeline;

pub use timeline::{LifecycleEvent, SessionTimeline, TimelineEvent};
