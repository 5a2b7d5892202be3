use std::time::{Duration, Instant};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use ytnotes_core::{ProgressEvent, ProgressSink, Severity};

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let whole = secs.round() as u64;
        format!("{}m {}s", whole / 60, whole % 60)
    }
}

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(spinner_style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// One spinner line per step; the previous step is ticked off when the next begins.
#[derive(Default)]
pub struct SpinnerSink {
    step: Option<(ProgressBar, String, Instant)>,
}

impl SpinnerSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn finish_step(&mut self) {
        if let Some((pb, message, started)) = self.step.take() {
            pb.finish_with_message(format!(
                "{} {} {}",
                style("✓").green().bold(),
                message.trim_end_matches("..."),
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            ));
        }
    }
}

impl ProgressSink for SpinnerSink {
    fn notify(&mut self, event: &ProgressEvent) {
        match event.severity {
            Severity::Neutral => {
                self.finish_step();
                self.step = Some((
                    create_spinner(&event.message),
                    event.message.clone(),
                    Instant::now(),
                ));
            }
            Severity::Success => {
                self.finish_step();
                println!("{} {}", style("✓").green().bold(), style(&event.message).bold());
            }
            Severity::Error => {
                if let Some((pb, message, _)) = self.step.take() {
                    pb.abandon_with_message(format!("{} {}", style("✗").red().bold(), message));
                }
                let detail = event.message.trim_start_matches("Error: ");
                eprintln!("{} {}", style("Error:").red().bold(), detail);
            }
        }
    }
}
