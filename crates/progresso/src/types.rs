use serde::{Deserialize, Serialize};

/// A single checklist item inside a week
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Task {
    /// Label shown in the UI
    pub title: String,

    /// Whether the task has been completed
    pub done: bool,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            done: false,
        }
    }

    /// Projects are flagged with a sparkle in their label
    pub fn is_project(&self) -> bool {
        self.title.contains('✨')
    }
}

/// One week of the curriculum with its ordered tasks
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Week {
    pub title: String,
    pub tasks: Vec<Task>,
}

impl Week {
    /// Number of tasks marked as done
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.done).count()
    }

    pub fn total_count(&self) -> usize {
        self.tasks.len()
    }

    /// True when every task in the week is done
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(|t| t.done)
    }
}

/// The persisted root aggregate: every week and its completion flags.
///
/// Serialized as `{ "weeks": [ { "title", "tasks": [ { "title", "done" } ] } ] }`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct ProgressState {
    pub weeks: Vec<Week>,
}

impl ProgressState {
    pub fn total_tasks(&self) -> usize {
        self.weeks.iter().map(Week::total_count).sum()
    }

    pub fn done_tasks(&self) -> usize {
        self.weeks.iter().map(Week::completed_count).sum()
    }
}

/// Short label shown under a task: weekday for the first five, project otherwise
pub fn task_label(task_index: usize) -> &'static str {
    const WEEKDAYS: [&str; 5] = ["Seg", "Ter", "Qua", "Qui", "Sex"];
    WEEKDAYS.get(task_index).copied().unwrap_or("Projeto ✨")
}
