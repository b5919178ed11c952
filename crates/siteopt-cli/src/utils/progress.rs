use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use siteopt::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

struct BarState {
    bar: ProgressBar,
    phase: Option<&'static str>,
    phases_seen: usize,
}

/// Renders workflow progress on stderr: a spinner per phase, a bar while a
/// phase reports a step count.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A handler that tracks state but draws nothing (used with `--quiet`).
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        bar.finish_and_clear();
        Self {
            state: Arc::new(Mutex::new(BarState {
                bar,
                phase: None,
                phases_seen: 0,
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = Arc::clone(&self.state);

        Box::new(move |event: Progress| {
            let Ok(mut state) = state.lock() else {
                warn!("Progress state mutex was poisoned; dropping a progress event.");
                return;
            };
            handle(&mut state, event);
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn handle(state: &mut BarState, event: Progress) {
    match event {
        Progress::PhaseStart { name } => {
            state.phases_seen += 1;
            state.phase = Some(name);
            state.bar.reset();
            state.bar.set_length(0);
            state.bar.set_style(spinner_style());
            state.bar.set_message(format!("[{}] {}", state.phases_seen, name));
            state
                .bar
                .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        }
        Progress::PhaseFinish => {
            state.bar.disable_steady_tick();
            let name = state.phase.take().unwrap_or("phase");
            state.bar.finish_with_message(format!("✓ {}", name));
        }
        Progress::TaskStart { total_steps, unit } => {
            state.bar.disable_steady_tick();
            state.bar.reset();
            state.bar.set_length(total_steps);
            state.bar.set_style(bar_style(unit));
        }
        Progress::TaskIncrement => state.bar.inc(1),
        Progress::TaskFinish => {
            if let Some(len) = state.bar.length() {
                state.bar.set_position(len);
            }
        }
        Progress::Message(text) => state.bar.println(format!("  {}", text)),
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style(unit: &str) -> ProgressStyle {
    let template = format!("{{msg:<18}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} ({{eta}})");
    ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}
