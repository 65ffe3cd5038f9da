use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

/// Error marker for a job that stopped because it was asked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canceled;

impl fmt::Display for Canceled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("task canceled") }
}

impl std::error::Error for Canceled {}

/// Shared cancel flag and progress counter of one running job.
#[derive(Debug, Clone, Default)]
pub struct TaskControl {
    canceled: Arc<AtomicBool>,
    progress: Arc<AtomicU64>, // f64 bits, percent
}

impl TaskControl {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn cancel(&self) { self.canceled.store(true, Ordering::SeqCst) }

    #[inline] pub fn is_canceled(&self) -> bool { self.canceled.load(Ordering::Relaxed) }

    /// `Err(Canceled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() { return Err(Canceled.into()) }
        Ok(())
    }

    pub fn set_progress(&self, percent: f64) {
        self.progress.store(percent.clamp(0.0, 100.0).to_bits(), Ordering::Relaxed);
    }

    #[inline] pub fn progress(&self) -> f64 { f64::from_bits(self.progress.load(Ordering::Relaxed)) }
}

/// A slow computation that can run off the interactive thread.
///
/// Inputs are gathered before the job is created, so `run` never touches
/// live layers. Results are applied by the caller afterwards.
pub trait BackgroundJob: Send + 'static {
    type Output: Send + 'static;

    fn description(&self) -> String;

    fn run(&mut self, control: &TaskControl) -> Result<Self::Output>;
}

/// How a job finished.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Completed(T),
    Canceled,
    Failed(anyhow::Error),
}

impl<T> TaskOutcome<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(output) => TaskOutcome::Completed(output),
            Err(err) if err.downcast_ref::<Canceled>().is_some() => TaskOutcome::Canceled,
            Err(err) => TaskOutcome::Failed(err),
        }
    }

    #[inline] pub fn is_completed(&self) -> bool { matches!(self, TaskOutcome::Completed(_)) }

    #[inline] pub fn is_canceled(&self) -> bool { matches!(self, TaskOutcome::Canceled) }

    /// Back to a `Result`, with cancellation as a [`Canceled`] error.
    pub fn into_result(self) -> Result<T> {
        match self {
            TaskOutcome::Completed(output) => Ok(output),
            TaskOutcome::Canceled => Err(Canceled.into()),
            TaskOutcome::Failed(err) => Err(err),
        }
    }
}

/// Run a job on the current thread.
pub fn run_job<J: BackgroundJob>(mut job: J, control: &TaskControl) -> TaskOutcome<J::Output> {
    let description = job.description();
    debug!(task = %description, "task started");
    let outcome = TaskOutcome::from_result(job.run(control));
    match &outcome {
        TaskOutcome::Completed(_) => info!(task = %description, "task completed"),
        TaskOutcome::Canceled => info!(task = %description, "task canceled"),
        TaskOutcome::Failed(err) => warn!(task = %description, error = %err, "task failed"),
    }
    outcome
}

/// Handle to a job running on a worker thread.
#[derive(Debug)]
pub struct TaskHandle<T> {
    control: TaskControl,
    thread: JoinHandle<TaskOutcome<T>>,
}

impl<T> TaskHandle<T> {
    #[inline] pub fn control(&self) -> &TaskControl { &self.control }

    #[inline] pub fn cancel(&self) { self.control.cancel() }

    #[inline] pub fn progress(&self) -> f64 { self.control.progress() }

    #[inline] pub fn is_finished(&self) -> bool { self.thread.is_finished() }

    /// Wait for the worker. A panicking job is reported as failed.
    pub fn join(self) -> TaskOutcome<T> {
        self.thread.join()
            .unwrap_or_else(|_| TaskOutcome::Failed(anyhow!("task worker panicked")))
    }
}

/// Start `job` on a worker thread. `on_complete` runs on the worker once the
/// job has finished, before [`TaskHandle::join`] returns.
pub fn spawn<J, F>(job: J, on_complete: F) -> TaskHandle<J::Output>
where
    J: BackgroundJob,
    F: FnOnce(&TaskOutcome<J::Output>) + Send + 'static,
{
    let control = TaskControl::new();
    let worker_control = control.clone();
    let thread = thread::spawn(move || {
        let outcome = run_job(job, &worker_control);
        on_complete(&outcome);
        outcome
    });
    TaskHandle { control, thread }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    struct Countdown(u32);

    impl BackgroundJob for Countdown {
        type Output = u32;

        fn description(&self) -> String { "countdown".to_string() }

        fn run(&mut self, control: &TaskControl) -> Result<u32> {
            let mut steps = 0;
            while self.0 > 0 {
                control.check()?;
                self.0 -= 1;
                steps += 1;
            }
            control.set_progress(100.0);
            Ok(steps)
        }
    }

    #[test]
    fn completion_callback_sees_the_outcome() {
        let (sender, receiver) = mpsc::channel();
        let handle = spawn(Countdown(3), move |outcome| {
            let _ = sender.send(outcome.is_completed());
        });
        let outcome = handle.join();
        assert!(receiver.recv().unwrap());
        assert_eq!(outcome.into_result().unwrap(), 3);
    }

    #[test]
    fn cancellation_is_distinct_from_failure() {
        let control = TaskControl::new();
        control.cancel();
        assert!(run_job(Countdown(3), &control).is_canceled());

        let failed: TaskOutcome<()> = TaskOutcome::from_result(Err(anyhow!("disk full")));
        assert!(matches!(failed, TaskOutcome::Failed(_)));
    }

    #[test]
    fn progress_is_clamped() {
        let control = TaskControl::new();
        control.set_progress(250.0);
        assert_eq!(control.progress(), 100.0);
    }
}
