//! Progress figures derived from a [`ProgressState`].
//!
//! Everything here is recomputed from scratch on every change; nothing is
//! cached or stored alongside the state.

use serde::Serialize;

use crate::types::{ProgressState, Week};

/// Visual status of a week, driven by its percentage
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeekStatus {
    Neutral,
    Active,
    Completed,
}

impl WeekStatus {
    pub fn from_percent(percent: u32) -> Self {
        match percent {
            100 => Self::Completed,
            0 => Self::Neutral,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeekMetrics {
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
    pub status: WeekStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metrics {
    pub weeks: Vec<WeekMetrics>,
    pub done_tasks: usize,
    pub total_tasks: usize,
    pub overall_percent: u32,
    pub completed_weeks: usize,
    /// Share of fully finished weeks, not rounded
    pub step_fill_percent: f64,
}

/// `round(100 * part / whole)` with halves rounded up, in integer arithmetic
pub fn percent(part: usize, whole: usize) -> u32 {
    assert!(whole > 0, "percentage of an empty set");
    let rounded = (200 * part + whole) / (2 * whole);
    rounded as u32
}

pub fn week_metrics(week: &Week) -> WeekMetrics {
    let completed = week.completed_count();
    let total = week.total_count();
    let percent = percent(completed, total);
    WeekMetrics {
        completed,
        total,
        percent,
        status: WeekStatus::from_percent(percent),
    }
}

/// Compute all derived figures for the state
pub fn compute(state: &ProgressState) -> Metrics {
    let weeks: Vec<WeekMetrics> = state.weeks.iter().map(week_metrics).collect();

    let total_tasks = state.total_tasks();
    let done_tasks = state.done_tasks();
    let completed_weeks = state.weeks.iter().filter(|w| w.is_complete()).count();
    let overall_percent = percent(done_tasks, total_tasks);
    let step_fill_percent = 100.0 * completed_weeks as f64 / weeks.len() as f64;

    Metrics {
        overall_percent,
        weeks,
        done_tasks,
        total_tasks,
        completed_weeks,
        step_fill_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::DEFAULT;
    use crate::types::Task;

    fn week_with(flags: &[bool]) -> Week {
        Week {
            title: "W".to_string(),
            tasks: flags
                .iter()
                .map(|&done| Task {
                    title: "t".to_string(),
                    done,
                })
                .collect(),
        }
    }

    // ========== percent tests ==========

    #[test]
    fn test_percent_exact() {
        assert_eq!(percent(0, 4), 0);
        assert_eq!(percent(1, 4), 25);
        assert_eq!(percent(4, 4), 100);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        // 1/8 = 12.5%
        assert_eq!(percent(1, 8), 13);
        // 3/8 = 37.5%
        assert_eq!(percent(3, 8), 38);
    }

    #[test]
    fn test_percent_rounds_to_nearest() {
        // 1/7 = 14.28%, 2/7 = 28.57%, 6/7 = 85.71%
        assert_eq!(percent(1, 7), 14);
        assert_eq!(percent(2, 7), 29);
        assert_eq!(percent(6, 7), 86);
        // 1/3 = 33.33%, 2/3 = 66.67%
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
    }

    #[test]
    fn test_percent_matches_float_rounding() {
        for whole in 1..=40usize {
            for part in 0..=whole {
                let expected = (100.0 * part as f64 / whole as f64 + 0.5).floor() as u32;
                assert_eq!(percent(part, whole), expected, "{}/{}", part, whole);
            }
        }
    }

    #[test]
    #[should_panic(expected = "percentage of an empty set")]
    fn test_percent_empty_panics() {
        percent(0, 0);
    }

    // ========== status tests ==========

    #[test]
    fn test_status_from_percent() {
        assert_eq!(WeekStatus::from_percent(0), WeekStatus::Neutral);
        assert_eq!(WeekStatus::from_percent(1), WeekStatus::Active);
        assert_eq!(WeekStatus::from_percent(99), WeekStatus::Active);
        assert_eq!(WeekStatus::from_percent(100), WeekStatus::Completed);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WeekStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    // ========== compute tests ==========

    #[test]
    fn test_compute_fresh_default() {
        let metrics = compute(&DEFAULT.seed());

        assert_eq!(metrics.weeks.len(), 4);
        assert_eq!(metrics.total_tasks, 29);
        assert_eq!(metrics.done_tasks, 0);
        assert_eq!(metrics.overall_percent, 0);
        assert_eq!(metrics.completed_weeks, 0);
        assert_eq!(metrics.step_fill_percent, 0.0);
        assert!(metrics.weeks.iter().all(|w| w.status == WeekStatus::Neutral));
    }

    #[test]
    fn test_compute_mixed_weeks() {
        let state = ProgressState {
            weeks: vec![
                week_with(&[true, true]),
                week_with(&[true, false, false]),
                week_with(&[false]),
                week_with(&[true, true, true, true]),
            ],
        };

        let metrics = compute(&state);

        assert_eq!(metrics.weeks[0].percent, 100);
        assert_eq!(metrics.weeks[0].status, WeekStatus::Completed);
        assert_eq!(metrics.weeks[1].percent, 33);
        assert_eq!(metrics.weeks[1].status, WeekStatus::Active);
        assert_eq!(metrics.weeks[2].percent, 0);
        assert_eq!(metrics.weeks[2].status, WeekStatus::Neutral);
        assert_eq!(metrics.done_tasks, 7);
        assert_eq!(metrics.total_tasks, 10);
        assert_eq!(metrics.overall_percent, 70);
        assert_eq!(metrics.completed_weeks, 2);
        assert_eq!(metrics.step_fill_percent, 50.0);
    }

    #[test]
    fn test_compute_totals_agree_with_state() {
        let mut state = DEFAULT.seed();
        state.weeks[3].tasks[7].done = true;
        state.weeks[0].tasks[2].done = true;

        let metrics = compute(&state);

        assert_eq!(metrics.total_tasks, state.total_tasks());
        assert_eq!(metrics.done_tasks, state.done_tasks());
        assert_eq!(
            metrics.total_tasks,
            metrics.weeks.iter().map(|w| w.total).sum::<usize>()
        );
    }

    #[test]
    fn test_step_fill_is_not_rounded() {
        let state = ProgressState {
            weeks: vec![week_with(&[true]), week_with(&[false]), week_with(&[false])],
        };
        let metrics = compute(&state);
        assert!((metrics.step_fill_percent - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_step_fill_differs_from_overall() {
        // Lots of tasks done, but no week finished
        let state = ProgressState {
            weeks: vec![week_with(&[true, true, false]), week_with(&[true, true, false])],
        };
        let metrics = compute(&state);
        assert_eq!(metrics.overall_percent, 67);
        assert_eq!(metrics.completed_weeks, 0);
        assert_eq!(metrics.step_fill_percent, 0.0);
    }
}
