//! Session Timeline
//!
//! Records lifecycle events of a session with wall-clock timestamps for
//! run reports.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifecycle events of a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Session launched with a live engine
    Opened,
    /// Work module bound into the engine
    ModuleBound { module: String },
    /// External participant registered for stop voting
    ParticipantAdded { participant: String },
    /// Engine run started
    RunStarted,
    /// Engine run returned
    RunFinished { success: bool, steps: u64 },
    /// Session dropped while still open
    ImplicitClose,
    /// Engine released
    Closed { success: bool },
}

/// A single event in the timeline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}

/// Tracks the lifecycle of one session.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionTimeline {
    session: String,
    started_at: DateTime<Utc>,
    events: Vec<TimelineEvent>,
}

impl SessionTimeline {
    /// Creates an empty timeline starting now.
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    /// Records an event.
    pub fn add_event(&mut self, event: LifecycleEvent) {
        self.events.push(TimelineEvent {
            timestamp: Utc::now(),
            event,
        });
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since the timeline was created.
    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.started_at
    }

    /// Wall-clock duration of each completed run, in milliseconds.
    pub fn run_durations(&self) -> Vec<i64> {
        let mut durations = Vec::new();
        let mut started: Option<DateTime<Utc>> = None;

        for entry in &self.events {
            match entry.event {
                LifecycleEvent::RunStarted => started = Some(entry.timestamp),
                LifecycleEvent::RunFinished { .. } => {
                    if let Some(start) = started.take() {
                        durations.push((entry.timestamp - start).num_milliseconds());
                    }
                }
                _ => {}
            }
        }

        durations
    }

    /// Human-readable event listing.
    pub fn summary(&self) -> String {
        let mut output = format!("\nTimeline for {}:\n\n", self.session);

        for entry in &self.events {
            let offset = (entry.timestamp - self.started_at).num_milliseconds();
            output.push_str(&format!("{:>8} ms  {}\n", offset, describe(&entry.event)));
        }

        output.push_str(&format!(
            "\nTotal: {} ms\n",
            self.elapsed().num_milliseconds()
        ));
        output
    }

    /// Serializes the timeline as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the JSON report to `path`.
    pub fn write_report(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn describe(event: &LifecycleEvent) -> String {
    match event {
        LifecycleEvent::Opened => "opened".to_string(),
        LifecycleEvent::ModuleBound { module } => format!("bound module '{}'", module),
        LifecycleEvent::ParticipantAdded { participant } => {
            format!("added participant '{}'", participant)
        }
        LifecycleEvent::RunStarted => "run started".to_string(),
        LifecycleEvent::RunFinished { success, steps } => format!(
            "run finished after {} step(s): {}",
            steps,
            if *success { "success" } else { "failure" }
        ),
        LifecycleEvent::ImplicitClose => "dropped while open".to_string(),
        LifecycleEvent::Closed { success } => {
            format!("closed: {}", if *success { "success" } else { "failure" })
        }
    }
}
