use std::fmt::Display;
use std::time::Duration;

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::plan::TaskKey;

#[derive(PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Pending,
    InProgress,
    Skipped,
    Failed,
}

pub struct StepContext {
    step_num: usize,
    steps: Vec<Step>,
}

pub struct Step {
    desc: &'static str,
    key: TaskKey,
    progress_bar: ProgressBar,
}

const STEPS: [(&str, TaskKey); 8] = [
    ("Generate plan", TaskKey::GeneratePlan),
    ("Place rings", TaskKey::PlaceRings),
    ("Place heaters", TaskKey::PlaceHeaters),
    ("Place phase line", TaskKey::PlacePhaseLine),
    ("Place pads", TaskKey::PlacePads),
    ("Route", TaskKey::Route),
    ("Center", TaskKey::Center),
    ("Write layout", TaskKey::WriteLayout),
];

impl StepContext {
    pub fn new() -> Self {
        println!("Tasks:");

        let mut steps = STEPS
            .into_iter()
            .map(|(desc, key)| Step {
                desc,
                key,
                progress_bar: ProgressBar::new_spinner(),
            })
            .collect::<Vec<_>>();
        let mp = MultiProgress::new();
        let num_steps = steps.len();
        let width = format!("{}", num_steps).len();
        for (i, step) in steps.iter_mut().enumerate() {
            mp.insert(i + 1, step.progress_bar.clone());
            let msg = format!("[{:width$}/{:width$}] {}", i + 1, num_steps, step.desc);
            step.set_status(StepStatus::Pending, Some(msg));
        }
        if let Some(first) = steps.first_mut() {
            first.set_status(StepStatus::InProgress, None);
        }
        StepContext { step_num: 0, steps }
    }

    #[inline]
    pub fn current_step(&mut self) -> Option<&mut Step> {
        self.steps.get_mut(self.step_num)
    }

    /// Marks the current step failed and every later step skipped if `res` is an error.
    pub fn check<T, E>(&mut self, res: std::result::Result<T, E>) -> std::result::Result<T, E> {
        if res.is_err() {
            if let Some(current_step) = self.current_step() {
                current_step.set_status(StepStatus::Failed, None);
                self.step_num += 1;
                while let Some(current_step) = self.current_step() {
                    current_step.set_status(StepStatus::Skipped, None);
                    self.step_num += 1;
                }
            }
            println!("\n");
        }

        res
    }

    pub fn finish(&mut self, key: TaskKey) {
        let Some(current_step) = self.current_step() else {
            log::warn!("step {key:?} finished after all steps completed");
            return;
        };
        if current_step.key != key {
            log::warn!(
                "step {key:?} finished while {:?} was in progress",
                current_step.key
            );
        }

        current_step.set_status(StepStatus::Done, None);
        self.step_num += 1;

        if let Some(current_step) = self.current_step() {
            current_step.set_status(StepStatus::InProgress, None);
        } else {
            self.done();
        }
    }

    pub fn done(&mut self) {
        println!("\n\nCompleted all tasks");
    }
}

impl Default for StepContext {
    fn default() -> Self {
        Self::new()
    }
}

fn format_template(spinner: bool, status: impl Display) -> String {
    if spinner {
        format!("{{spinner:.green}} {:16} {{msg}}", status)
    } else {
        format!("  {:16} {{msg}}", status)
    }
}

impl Step {
    fn set_status(&mut self, status: StepStatus, msg: Option<String>) {
        let status_template = match status {
            StepStatus::Done => format_template(false, "Done".green().bold()),
            StepStatus::Failed => format_template(false, "Failed".bright_white().on_red().bold()),
            StepStatus::InProgress => format_template(true, "In Progress".bright_white().bold()),
            StepStatus::Pending => format_template(true, "Pending".blue().bold()),
            StepStatus::Skipped => format_template(false, "Skipped".yellow().bold()),
        };
        match ProgressStyle::with_template(&status_template) {
            Ok(style) => self.progress_bar.set_style(style),
            Err(err) => log::warn!("invalid progress template: {err}"),
        }

        if let Some(msg) = msg {
            self.progress_bar.set_message(msg);
        }

        if status == StepStatus::InProgress {
            self.progress_bar
                .enable_steady_tick(Duration::from_millis(200));
        } else if status != StepStatus::Pending {
            self.progress_bar.finish();
        }
    }
}
