use anyhow::Result;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::metrics::{Metrics, WeekMetrics, WeekStatus};
use crate::types::{task_label, ProgressState, Week};

/// Whether the page talks to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Served over HTTP: controls post to the JSON API
    Live,
    /// Written to disk: a read-only snapshot with no script and no controls
    Snapshot,
}

/// Write a read-only snapshot of the current state to `path`
pub fn generate_html(state: &ProgressState, metrics: &Metrics, path: &Path) -> Result<()> {
    let html = render_document(state, metrics, Mode::Snapshot);
    fs::write(path, html.into_string())?;
    Ok(())
}

/// Full page: stepper, totals, and one section per week.
///
/// Pure projection of the state; the same state always yields the same markup.
pub fn render_page(state: &ProgressState, metrics: &Metrics) -> Markup {
    render_document(state, metrics, Mode::Live)
}

fn render_document(state: &ProgressState, metrics: &Metrics, mode: Mode) -> Markup {
    let live = mode == Mode::Live;
    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Progresso" }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { "Progresso" }
                    (render_stepper(metrics))
                    div.summary {
                        div.progress-big {
                            div.bar #"totalBar" style={"width:" (metrics.overall_percent) "%"} {}
                        }
                        div.stats {
                            span #"doneCount" { (metrics.overall_percent) "%" }
                            " · "
                            span #"taskCount" { (metrics.done_tasks) " / " (metrics.total_tasks) }
                        }
                        @if live {
                            div.actions {
                                button.ghost #"exportBtn" type="button" { "Exportar" }
                                button.danger #"resetBtn" type="button" { "Resetar" }
                            }
                        }
                    }
                    div.weeks #"weeksContainer" {
                        @for (idx, (week, wm)) in state.weeks.iter().zip(&metrics.weeks).enumerate() {
                            (render_week(idx, week, wm, live))
                        }
                    }
                }
                @if live {
                    script { (PreEscaped(JAVASCRIPT)) }
                }
            }
        }
    }
}

fn render_stepper(metrics: &Metrics) -> Markup {
    html! {
        div.stepper {
            div.step-track {
                div.step-fill #"stepFill" style={"width:" (metrics.step_fill_percent) "%"} {}
            }
            @for (idx, wm) in metrics.weeks.iter().enumerate() {
                div.step.active[wm.status == WeekStatus::Active].completed[wm.status == WeekStatus::Completed] data-week=(idx + 1) {
                    (idx + 1)
                }
            }
        }
    }
}

fn render_week(idx: usize, week: &Week, wm: &WeekMetrics, live: bool) -> Markup {
    html! {
        section.week data-week=(idx) {
            h3 {
                span { (week.title) }
                span.week-number { "Semana " (idx + 1) }
            }
            div.tasks id={"tasks-" (idx)} {
                @for (t_idx, task) in week.tasks.iter().enumerate() {
                    div.task.project[task.is_project()] {
                        label {
                            input type="checkbox" data-week=(idx) data-task=(t_idx) checked[task.done] disabled[!live];
                            div.task-text {
                                strong { (task.title) }
                                small { (task_label(t_idx)) }
                            }
                        }
                    }
                }
            }
            div.week-footer {
                div.progress-small {
                    div.bar id={"bar-" (idx)} style={"width:" (wm.percent) "%"} {}
                }
                @if live {
                    button.ghost type="button" data-action="mark-week" data-week=(idx) {
                        "Marcar Semana"
                    }
                }
            }
        }
    }
}

/// Plain-text rendering for the terminal
pub fn render_text(state: &ProgressState, metrics: &Metrics) -> String {
    let mut out = String::new();

    for (idx, (week, wm)) in state.weeks.iter().zip(&metrics.weeks).enumerate() {
        let _ = writeln!(
            out,
            "{} (Semana {}) {} {:>3}%",
            week.title,
            idx + 1,
            text_bar(wm.percent),
            wm.percent
        );
        for (t_idx, task) in week.tasks.iter().enumerate() {
            let mark = if task.done { 'x' } else { ' ' };
            let _ = writeln!(
                out,
                "  [{}] {}.{} {} ({})",
                mark,
                idx + 1,
                t_idx + 1,
                task.title,
                task_label(t_idx)
            );
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "Total: {}% ({} / {}), semanas concluídas: {} / {}",
        metrics.overall_percent,
        metrics.done_tasks,
        metrics.total_tasks,
        metrics.completed_weeks,
        metrics.weeks.len()
    );
    out
}

fn text_bar(percent: u32) -> String {
    const WIDTH: usize = 20;
    let filled = (percent as usize * WIDTH) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
}

const CSS: &str = r#"
:root {
    --bg: #0f1020;
    --card: #1a1b33;
    --text: #f2f2ff;
    --muted: #9a9bc4;
    --accent: #ff8fd8;
    --accent-2: #8fd3ff;
}

* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: var(--bg);
    color: var(--text);
    min-height: 100vh;
    line-height: 1.4;
}

.container {
    max-width: 1000px;
    margin: 0 auto;
    padding: 40px 24px 60px;
}

h1 {
    font-size: 2.4em;
    font-weight: 900;
    margin-bottom: 24px;
    background: linear-gradient(90deg, var(--accent), var(--accent-2));
    -webkit-background-clip: text;
    color: transparent;
}

.stepper {
    position: relative;
    display: flex;
    justify-content: space-between;
    margin-bottom: 32px;
}

.step-track {
    position: absolute;
    top: 50%;
    left: 0;
    right: 0;
    height: 4px;
    background: var(--card);
    transform: translateY(-50%);
}

.step-fill {
    height: 100%;
    background: linear-gradient(90deg, var(--accent), var(--accent-2));
    transition: width 0.3s;
}

.step {
    position: relative;
    width: 36px;
    height: 36px;
    border-radius: 50%;
    background: var(--card);
    color: var(--muted);
    display: flex;
    align-items: center;
    justify-content: center;
    font-weight: 700;
}

.step.active {
    color: var(--text);
    border: 2px solid var(--accent-2);
}

.step.completed {
    color: #000;
    background: var(--accent);
}

.summary {
    margin-bottom: 32px;
}

.progress-big, .progress-small {
    background: var(--card);
    border-radius: 8px;
    overflow: hidden;
}

.progress-big { height: 14px; }
.progress-small { height: 8px; flex: 1; }

.bar {
    height: 100%;
    background: linear-gradient(90deg, var(--accent), var(--accent-2));
    transition: width 0.3s;
}

.stats {
    color: var(--muted);
    margin: 10px 0;
    font-weight: 700;
}

.actions {
    display: flex;
    gap: 12px;
}

button {
    cursor: pointer;
    border: none;
    border-radius: 8px;
    padding: 8px 14px;
    font-weight: 700;
}

button.ghost {
    background: transparent;
    color: var(--text);
    border: 1px solid var(--muted);
}

button.danger {
    background: #ff5f7a;
    color: #000;
}

.weeks {
    display: grid;
    gap: 24px;
}

.week {
    background: var(--card);
    border-radius: 12px;
    padding: 20px;
}

.week h3 {
    display: flex;
    justify-content: space-between;
    margin-bottom: 14px;
}

.week-number {
    font-size: 13px;
    color: var(--muted);
}

.tasks {
    display: grid;
    gap: 8px;
    margin-bottom: 14px;
}

.task {
    padding: 8px 10px;
    border-radius: 8px;
    background: rgba(255,255,255,0.03);
}

.task.project {
    border-left: 3px solid var(--accent);
}

.task label {
    display: flex;
    gap: 10px;
    align-items: center;
    cursor: pointer;
}

.task-text {
    display: flex;
    flex-direction: column;
}

.task-text strong { font-size: 13px; }
.task-text small { color: var(--muted); }

.week-footer {
    display: flex;
    align-items: center;
    gap: 12px;
}
"#;

const JAVASCRIPT: &str = r#"
// Reflect freshly computed metrics into the bars and counters
function applyMetrics(m) {
    m.weeks.forEach((w, idx) => {
        const bar = document.getElementById(`bar-${idx}`);
        if (bar) bar.style.width = w.percent + '%';

        const step = document.querySelector(`.step[data-week="${idx + 1}"]`);
        if (step) {
            step.classList.remove('completed', 'active');
            if (w.status !== 'neutral') step.classList.add(w.status);
        }
    });

    document.getElementById('totalBar').style.width = m.overall_percent + '%';
    document.getElementById('doneCount').innerText = m.overall_percent + '%';
    document.getElementById('taskCount').innerText = `${m.done_tasks} / ${m.total_tasks}`;
    document.getElementById('stepFill').style.width = m.step_fill_percent + '%';
}

async function post(url, body) {
    const res = await fetch(url, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(body || {}),
    });
    if (!res.ok) throw new Error(await res.text());
    return res.json();
}

// Every mutation goes through one chain so the server sees them in click order
let queue = Promise.resolve();
function enqueue(job) {
    const run = queue.then(job);
    queue = run.catch(() => {});
    return run;
}

document.querySelectorAll('input[type="checkbox"][data-task]').forEach(cb => {
    cb.addEventListener('change', e => {
        const box = e.target;
        const w = box.dataset.week;
        const t = box.dataset.task;
        const done = box.checked;
        box.disabled = true;
        enqueue(() => post(`/api/weeks/${w}/tasks/${t}`, { done }))
            .then(applyMetrics)
            .catch(err => {
                box.checked = !done;
                alert('Falha ao salvar: ' + err.message);
            })
            .finally(() => { box.disabled = false; });
    });
});

document.querySelectorAll('button[data-action="mark-week"]').forEach(btn => {
    btn.addEventListener('click', e => {
        const w = e.currentTarget.dataset.week;
        enqueue(() => post(`/api/weeks/${w}/toggle`))
            .then(() => location.reload())
            .catch(err => alert('Falha ao salvar: ' + err.message));
    });
});

document.getElementById('resetBtn').addEventListener('click', () => {
    if (!confirm('Resetar todo o progresso?')) return;
    enqueue(() => post('/api/reset?confirm=true'))
        .then(() => location.reload())
        .catch(err => alert('Falha ao resetar: ' + err.message));
});

document.getElementById('exportBtn').addEventListener('click', () => {
    window.location.href = '/api/export';
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::DEFAULT;
    use crate::metrics;
    use tempfile::TempDir;

    fn render(state: &ProgressState) -> String {
        render_page(state, &metrics::compute(state)).into_string()
    }

    #[test]
    fn test_render_page_lists_every_task() {
        let html = render(&DEFAULT.seed());

        assert_eq!(html.matches("<input type=\"checkbox\"").count(), 29);
        assert_eq!(
            html.matches("data-action=\"mark-week\" data-week=").count(),
            4
        );
        assert!(html.contains("Semana 1 — Fundamentos"));
        assert!(html.contains("id=\"resetBtn\""));
        assert!(html.contains("id=\"exportBtn\""));
    }

    #[test]
    fn test_render_page_is_deterministic() {
        let mut state = DEFAULT.seed();
        state.weeks[1].tasks[2].done = true;

        assert_eq!(render(&state), render(&state));
    }

    #[test]
    fn test_render_page_checked_state() {
        let mut state = DEFAULT.seed();
        state.weeks[0].tasks[0].done = true;
        state.weeks[2].tasks[6].done = true;

        let html = render(&state);
        assert_eq!(html.matches(" checked").count(), 2);
        assert!(html.contains("data-week=\"0\" data-task=\"0\" checked"));
    }

    #[test]
    fn test_render_page_progress_widths() {
        let mut state = DEFAULT.seed();
        for task in &mut state.weeks[0].tasks {
            task.done = true;
        }

        let html = render(&state);
        assert!(html.contains("id=\"bar-0\" style=\"width:100%\""));
        assert!(html.contains("id=\"bar-1\" style=\"width:0%\""));
        // 7 of 29 tasks
        assert!(html.contains("id=\"totalBar\" style=\"width:24%\""));
        assert!(html.contains("7 / 29"));
        assert!(html.contains("id=\"stepFill\" style=\"width:25%\""));
    }

    #[test]
    fn test_render_page_step_classes() {
        let mut state = DEFAULT.seed();
        for task in &mut state.weeks[0].tasks {
            task.done = true;
        }
        state.weeks[1].tasks[0].done = true;

        let html = render(&state);
        assert!(html.contains("class=\"step completed\" data-week=\"1\""));
        assert!(html.contains("class=\"step active\" data-week=\"2\""));
        assert!(html.contains("class=\"step\" data-week=\"3\""));
    }

    #[test]
    fn test_render_page_marks_projects() {
        let html = render(&DEFAULT.seed());
        // Two projects in weeks 1-3, three in week 4
        assert_eq!(html.matches("class=\"task project\"").count(), 9);
        assert!(html.contains("Projeto ✨"));
        assert!(html.contains("<small>Seg</small>"));
    }

    #[test]
    fn test_render_page_escapes_titles() {
        let mut state = DEFAULT.seed();
        state.weeks[0].tasks[0].title = "<script>alert(1)</script>".to_string();

        let html = render(&state);
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_render_text() {
        let mut state = DEFAULT.seed();
        state.weeks[0].tasks[1].done = true;

        let text = render_text(&state, &metrics::compute(&state));
        assert!(text.contains("Semana 1 — Fundamentos (Semana 1)"));
        assert!(text.contains("  [x] 1.2 Camadas: criar/organizar (Ter)"));
        assert!(text.contains("  [ ] 1.1 Tour pela interface & workspace (Seg)"));
        assert!(text.contains("Total: 3% (1 / 29), semanas concluídas: 0 / 4"));
    }

    #[test]
    fn test_text_bar() {
        assert_eq!(text_bar(0), format!("[{}]", "-".repeat(20)));
        assert_eq!(text_bar(50), format!("[{}{}]", "#".repeat(10), "-".repeat(10)));
        assert_eq!(text_bar(100), format!("[{}]", "#".repeat(20)));
    }

    #[test]
    fn test_generate_html_writes_read_only_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.html");
        let mut state = DEFAULT.seed();
        state.weeks[0].tasks[0].done = true;

        generate_html(&state, &metrics::compute(&state), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("<!DOCTYPE html>"));
        assert!(!content.contains("/api/"));
        assert!(!content.contains("<script"));
        assert!(!content.contains("resetBtn"));
        assert!(!content.contains("exportBtn"));
        assert!(!content.contains("data-action=\"mark-week\""));
        assert_eq!(content.matches("<input type=\"checkbox\"").count(), 29);
        assert_eq!(content.matches(" disabled").count(), 29);
        assert!(content.contains("data-week=\"0\" data-task=\"0\" checked disabled"));
        assert!(content.contains("1 / 29"));
    }

    #[test]
    fn test_live_page_checkboxes_are_enabled() {
        let html = render(&DEFAULT.seed());
        assert!(!html.contains(" disabled"));
        assert!(html.contains("<script>"));
    }

    #[test]
    fn test_script_serializes_mutations() {
        // Each mutating control posts through the shared queue, never directly
        assert!(JAVASCRIPT.contains("let queue = Promise.resolve();"));
        assert_eq!(JAVASCRIPT.matches("enqueue(() => post(").count(), 3);
        assert_eq!(JAVASCRIPT.matches("post(`").count(), 2);
        assert!(JAVASCRIPT.contains("box.disabled = true;"));
    }
}
