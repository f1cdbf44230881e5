use crate::join::JoinOutcome;
use serde::Serialize;
use std::cell::RefCell;
use std::path::PathBuf;
use tracing::{info, warn};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LoadOrders,
    LoadUsers,
    ExtractRestaurants,
    JoinUsers,
    JoinRestaurants,
    Statistics,
    Write,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::LoadOrders => "loading orders",
            Stage::LoadUsers => "loading users",
            Stage::ExtractRestaurants => "extracting restaurants",
            Stage::JoinUsers => "joining users on user_id",
            Stage::JoinRestaurants => "joining restaurants on restaurant_id",
            Stage::Statistics => "computing statistics",
            Stage::Write => "writing merged dataset",
        }
    }
}

/// Progress notifications emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: Stage,
    },
    TableLoaded {
        stage: Stage,
        path: PathBuf,
        rows: usize,
        columns: Vec<String>,
    },
    StatementsSkipped {
        count: usize,
    },
    Joined {
        stage: Stage,
        outcome: JoinOutcome,
        columns: usize,
    },
    OutputWritten {
        path: PathBuf,
        rows: usize,
        bytes: u64,
    },
}

/// Receives pipeline progress. Implementations decide where it goes.
pub trait PipelineObserver {
    fn on_event(&self, event: &PipelineEvent);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => info!("Started {}", stage.label()),
            PipelineEvent::TableLoaded {
                stage,
                path,
                rows,
                columns,
            } => info!(
                "Finished {} from {}: {} rows x {} columns {:?}",
                stage.label(),
                path.display(),
                rows,
                columns.len(),
                columns
            ),
            PipelineEvent::StatementsSkipped { count } => {
                warn!("{} INSERT statements did not match and were skipped", count)
            }
            PipelineEvent::Joined {
                stage,
                outcome,
                columns,
            } => info!(
                "Finished {}: {} rows x {} columns ({} matched, {} unmatched, {} fan-out)",
                stage.label(),
                outcome.output_rows,
                columns,
                outcome.matched,
                outcome.unmatched,
                outcome.fan_out
            ),
            PipelineEvent::OutputWritten { path, rows, bytes } => info!(
                "Saved {} rows to {} ({:.2} MB)",
                rows,
                path.display(),
                *bytes as f64 / (1024.0 * 1024.0)
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.borrow().clone()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.on_event(&PipelineEvent::StageStarted {
            stage: Stage::LoadOrders,
        });
        observer.on_event(&PipelineEvent::StatementsSkipped { count: 2 });

        assert_eq!(
            observer.events(),
            vec![
                PipelineEvent::StageStarted {
                    stage: Stage::LoadOrders
                },
                PipelineEvent::StatementsSkipped { count: 2 },
            ]
        );
    }

    #[test]
    fn test_events_serialize_with_tag() {
        let json = serde_json::to_value(PipelineEvent::StatementsSkipped { count: 1 }).unwrap();
        assert_eq!(json["event"], "statements_skipped");
        assert_eq!(json["count"], 1);
    }
}
