//! Bounded polling with mandatory timeout diagnostics.
//!
//! Transient remote UI failures are unreproducible unless state is captured
//! at the moment of timeout, so `wait_until` always writes a screenshot and
//! a serialized document dump before reporting `TimedOut`.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::driver::Driver;

/// Floor on the sleep between predicate checks; polling must not busy-loop
/// even when the predicate itself is fast.
const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Parameters for one bounded wait.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between predicate checks (clamped to a minimum floor).
    pub interval: Duration,
    /// Hard deadline measured from the first check.
    pub deadline: Duration,
    /// Where timeout diagnostics are written.
    pub diagnostics_dir: PathBuf,
    /// Short name for this wait, used in diagnostic file names and logs.
    pub label: String,
}

impl PollConfig {
    pub fn new(label: impl Into<String>, interval: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            deadline,
            diagnostics_dir: PathBuf::from("diagnostics"),
            label: label.into(),
        }
    }

    pub fn diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = dir.into();
        self
    }
}

/// Artifacts captured when a wait times out.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub screenshot: PathBuf,
    pub dom: PathBuf,
}

/// Terminal state of a bounded wait.
#[derive(Debug)]
pub enum PollOutcome {
    Satisfied,
    TimedOut(Diagnostics),
    Cancelled,
}

impl PollOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, PollOutcome::Satisfied)
    }
}

/// Run `predicate` at a fixed interval until it returns true, `deadline`
/// elapses, or `cancel` fires.
///
/// Cancellation is cooperative and produces a distinct [`PollOutcome::Cancelled`],
/// never `TimedOut`. On timeout, diagnostics are captured before returning.
/// The predicate is responsible for swallowing its own transient errors and
/// returning false.
pub async fn wait_until<D, F, Fut>(
    driver: &D,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut predicate: F,
) -> PollOutcome
where
    D: Driver,
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let interval = config.interval.max(MIN_INTERVAL);
    let started = Instant::now();

    loop {
        if cancel.is_cancelled() {
            info!(target: "engine.poll", label = %config.label, "wait cancelled");
            return PollOutcome::Cancelled;
        }

        if predicate().await {
            return PollOutcome::Satisfied;
        }

        if started.elapsed() >= config.deadline {
            warn!(
                target: "engine.poll",
                label = %config.label,
                deadline = ?config.deadline,
                "wait deadline elapsed; capturing diagnostics"
            );
            let diagnostics = capture_diagnostics(driver, config).await;
            return PollOutcome::TimedOut(diagnostics);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(target: "engine.poll", label = %config.label, "wait cancelled");
                return PollOutcome::Cancelled;
            }
            _ = sleep(interval) => {}
        }
    }
}

/// Best-effort capture of a screenshot and the serialized document to a
/// timestamped location. Individual capture failures are logged, never
/// propagated; the returned paths name whatever was attempted.
pub async fn capture_diagnostics<D: Driver>(driver: &D, config: &PollConfig) -> Diagnostics {
    let stamp = Local::now().format("%Y%m%d_%H%M%S%.3f");
    let stem = format!("{}_{stamp}", sanitize(&config.label));
    let screenshot = config.diagnostics_dir.join(format!("{stem}.png"));
    let dom = config.diagnostics_dir.join(format!("{stem}.html"));

    if let Err(e) = tokio::fs::create_dir_all(&config.diagnostics_dir).await {
        warn!(target: "engine.poll", error = %e, "could not create diagnostics directory");
        return Diagnostics { screenshot, dom };
    }

    if let Err(e) = driver.screenshot(&screenshot).await {
        warn!(target: "engine.poll", error = %e, "screenshot capture failed");
    }

    match driver.page_source().await {
        Ok(source) => {
            if let Err(e) = tokio::fs::write(&dom, source).await {
                warn!(target: "engine.poll", error = %e, "writing document dump failed");
            }
        }
        Err(e) => warn!(target: "engine.poll", error = %e, "document serialization failed"),
    }

    info!(
        target: "engine.poll",
        screenshot = %screenshot.display(),
        dom = %dom.display(),
        "diagnostics captured"
    );
    Diagnostics { screenshot, dom }
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
