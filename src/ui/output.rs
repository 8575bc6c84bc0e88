use crate::model::{CreateState, PendingPipeline, PipelineRun};
use crate::ui::{theme, Icons, Tone};
use owo_colors::OwoColorize;

pub fn header(icon: &str, text: &str) {
    println!("{} {}", icon, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().good.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().active.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().neutral.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

/// One line per run: id, status colored by outcome, start and finish time
pub fn run_line(run: &PipelineRun) {
    let status = run.status.as_str();
    let finished = run
        .finished
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  #{:<5} {:<10} {} {} {}",
        run.id,
        status.style(theme().tone(Tone::from(run.status)).clone()),
        run.started.format("%Y-%m-%d %H:%M:%S"),
        muted("→"),
        finished
    );
}

/// Count of pending pipelines per compile state, e.g. "2 running, 1 failed"
pub fn state_counts(pending: &[PendingPipeline]) -> Vec<(CreateState, usize)> {
    let order = [
        CreateState::Running,
        CreateState::Success,
        CreateState::Failed,
        CreateState::Unknown,
    ];
    order
        .into_iter()
        .map(|state| (state, pending.iter().filter(|p| p.state == state).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

pub fn state_summary(pending: &[PendingPipeline]) {
    let parts: Vec<String> = state_counts(pending)
        .into_iter()
        .map(|(state, n)| {
            format!("{} {}", n, state.as_str())
                .style(theme().tone(Tone::from(state)).clone())
                .to_string()
        })
        .collect();
    if !parts.is_empty() {
        println!("  {}", parts.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pipeline, PipelineKind};

    #[test]
    fn test_state_counts_skips_empty_states() {
        let mut failed = PendingPipeline::new("b", Pipeline::new("b", PipelineKind::Go));
        failed.state = CreateState::Failed;
        let pending = vec![
            PendingPipeline::new("a", Pipeline::new("a", PipelineKind::Go)),
            failed,
            PendingPipeline::new("c", Pipeline::new("c", PipelineKind::Go)),
        ];

        assert_eq!(
            state_counts(&pending),
            vec![(CreateState::Running, 2), (CreateState::Failed, 1)]
        );
    }
}
