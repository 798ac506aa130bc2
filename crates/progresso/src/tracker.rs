//! The owner of the progress state and the only place it is mutated.
//!
//! Every mutation runs to completion before returning: change the state,
//! save it, recompute the metrics. If the save fails the change is undone,
//! so the in-memory state never drifts from what is stored.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::{self, Metrics};
use crate::store::{KeyValueStore, ProgressStore, StoreError};
use crate::time::Clock;
use crate::types::ProgressState;

/// Question asked before wiping all progress
pub const RESET_PROMPT: &str = "Resetar todo o progresso?";

/// Suggested file name for the exported summary
pub const EXPORT_FILENAME: &str = "progresso_photoshop.json";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("week {week} does not exist (there are {count} weeks)")]
    WeekOutOfRange { week: usize, count: usize },

    #[error("task {task} does not exist in week {week} (it has {count} tasks)")]
    TaskOutOfRange {
        week: usize,
        task: usize,
        count: usize,
    },

    #[error("failed to save progress: {0}")]
    Store(#[from] StoreError),
}

/// Result of a reset request
#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutcome {
    Reset(Metrics),
    Declined,
}

/// Per-week line of the exported summary
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeekSummary {
    /// 1-based week number
    pub week: usize,
    pub title: String,
    pub completed: usize,
    pub total: usize,
}

/// Read-only snapshot offered as a download
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportSummary {
    pub date: String,
    pub weeks: Vec<WeekSummary>,
}

impl ExportSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub struct Tracker<S> {
    state: ProgressState,
    store: ProgressStore<S>,
    clock: Clock,
}

impl<S: KeyValueStore> Tracker<S> {
    /// Load the saved state (or seed a fresh one) and take ownership of it
    pub fn open(mut store: ProgressStore<S>, clock: Clock) -> Result<Self, StoreError> {
        let state = store.load()?;
        Ok(Self {
            state,
            store,
            clock,
        })
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn metrics(&self) -> Metrics {
        metrics::compute(&self.state)
    }

    #[cfg(test)]
    pub fn store(&self) -> &ProgressStore<S> {
        &self.store
    }

    /// Set a single task's completion flag
    pub fn toggle_task(
        &mut self,
        week: usize,
        task: usize,
        done: bool,
    ) -> Result<Metrics, TrackerError> {
        self.check_task(week, task)?;

        let previous = self.state.clone();
        self.state.weeks[week].tasks[task].done = done;
        let metrics = self.commit(previous)?;

        debug!(
            week = week,
            task = task,
            done = done,
            percent = metrics.weeks[week].percent,
            "Task toggled"
        );
        Ok(metrics)
    }

    /// Complete every task of the week, or clear them all if it was already complete
    pub fn toggle_week(&mut self, week: usize) -> Result<Metrics, TrackerError> {
        self.check_week(week)?;

        let previous = self.state.clone();
        let target = !self.state.weeks[week].is_complete();
        for task in &mut self.state.weeks[week].tasks {
            task.done = target;
        }
        let metrics = self.commit(previous)?;

        info!(week = week, done = target, "Week toggled");
        Ok(metrics)
    }

    /// Replace all progress with a fresh curriculum copy, if `confirm` agrees.
    ///
    /// Declining leaves both the state and the store untouched.
    pub fn reset_all(
        &mut self,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<ResetOutcome, TrackerError> {
        if !confirm(RESET_PROMPT) {
            debug!("Reset declined");
            return Ok(ResetOutcome::Declined);
        }

        let fresh = self.store.curriculum().seed();
        let previous = std::mem::replace(&mut self.state, fresh);
        let metrics = self.commit(previous)?;

        info!("Progress reset");
        Ok(ResetOutcome::Reset(metrics))
    }

    /// Summarize progress per week. Does not touch the state or the store.
    pub fn export_summary(&self) -> ExportSummary {
        ExportSummary {
            date: self.clock.timestamp(),
            weeks: self
                .state
                .weeks
                .iter()
                .enumerate()
                .map(|(i, w)| WeekSummary {
                    week: i + 1,
                    title: w.title.clone(),
                    completed: w.completed_count(),
                    total: w.total_count(),
                })
                .collect(),
        }
    }

    fn check_week(&self, week: usize) -> Result<(), TrackerError> {
        let count = self.state.weeks.len();
        if week >= count {
            return Err(TrackerError::WeekOutOfRange { week, count });
        }
        Ok(())
    }

    fn check_task(&self, week: usize, task: usize) -> Result<(), TrackerError> {
        self.check_week(week)?;
        let count = self.state.weeks[week].tasks.len();
        if task >= count {
            return Err(TrackerError::TaskOutOfRange { week, task, count });
        }
        Ok(())
    }

    /// Persist the current state, restoring `previous` if the write fails
    fn commit(&mut self, previous: ProgressState) -> Result<Metrics, TrackerError> {
        if let Err(e) = self.store.save(&self.state) {
            warn!(error = %e, "Save failed, rolling back");
            self.state = previous;
            return Err(e.into());
        }
        Ok(self.metrics())
    }
}
