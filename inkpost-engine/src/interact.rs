//! Escalating interaction strategy chains.
//!
//! Remote UIs frequently render elements that are technically present but
//! occluded by transient overlays (menus, toasts). Escalating from a
//! standard click through forced and script-dispatched variants recovers
//! from occlusion without needing to identify the occluding element. The
//! fallback ordering and exhaustion semantics are encoded as tagged
//! outcomes, not nested exception handling, so they stay visible and
//! testable.

use std::time::Duration;

use tracing::{debug, warn};

use crate::descriptor::ElementDescriptor;
use crate::driver::{ClickMode, Driver, TypingMode};
use crate::locate::{resolve_from, Resolution};

/// One interaction technique, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Scroll into view, then a standard input-simulated click.
    Standard,
    /// Forced click bypassing overlap/visibility checks.
    Forced,
    /// Synthetic event dispatched directly on the element handle.
    ScriptDispatch,
}

impl Strategy {
    /// Fixed escalation order applied to every candidate.
    pub const ORDER: [Strategy; 3] = [
        Strategy::Standard,
        Strategy::Forced,
        Strategy::ScriptDispatch,
    ];
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strategy::Standard => "standard",
            Strategy::Forced => "forced",
            Strategy::ScriptDispatch => "script-dispatch",
        };
        f.write_str(s)
    }
}

/// Result of one interaction attempt against a descriptor.
///
/// Immutable once produced. Used for logging and diagnostics; control flow
/// only ever consults [`InteractionOutcome::succeeded`].
#[derive(Debug, Clone)]
pub struct InteractionOutcome {
    pub succeeded: bool,
    /// Strategy that landed the interaction. `None` for fill operations,
    /// which have a single technique per typing mode.
    pub strategy: Option<Strategy>,
    /// Candidate index that was interacted with.
    pub candidate: Option<usize>,
    /// Last error observed before success or exhaustion.
    pub error: Option<String>,
}

impl InteractionOutcome {
    fn success(strategy: Option<Strategy>, candidate: usize) -> Self {
        Self {
            succeeded: true,
            strategy,
            candidate: Some(candidate),
            error: None,
        }
    }

    fn failure(error: Option<String>) -> Self {
        Self {
            succeeded: false,
            strategy: None,
            candidate: None,
            error,
        }
    }
}

/// Per-attempt time bounds.
#[derive(Debug, Clone)]
pub struct InteractionTimeouts {
    /// Budget for a single click strategy attempt.
    pub per_strategy: Duration,
    /// Budget for a whole fill (per-character typing of a long body can
    /// legitimately take minutes).
    pub fill: Duration,
}

impl Default for InteractionTimeouts {
    fn default() -> Self {
        Self {
            per_strategy: Duration::from_secs(3),
            fill: Duration::from_secs(180),
        }
    }
}

/// Applies strategy chains to descriptors over a [`Driver`].
///
/// Stateless with respect to the batch: operates purely on the live session
/// and the current step.
pub struct Interactor<'d, D: Driver> {
    driver: &'d D,
    timeouts: InteractionTimeouts,
}

impl<'d, D: Driver> Interactor<'d, D> {
    pub fn new(driver: &'d D) -> Self {
        Self {
            driver,
            timeouts: InteractionTimeouts::default(),
        }
    }

    pub fn with_timeouts(driver: &'d D, timeouts: InteractionTimeouts) -> Self {
        Self { driver, timeouts }
    }

    /// Click the element described by `descriptor`.
    ///
    /// For each candidate that resolves visible, strategies are attempted in
    /// [`Strategy::ORDER`]; a failure or timeout advances to the next
    /// strategy. When a candidate exhausts all strategies, the search
    /// re-resolves from the next candidate and the strategy sequence
    /// restarts. Exhausting all candidates yields a failed outcome retaining
    /// the last error.
    pub async fn click(&self, descriptor: &ElementDescriptor) -> InteractionOutcome {
        let mut last_error: Option<String> = None;
        let mut next_candidate = 0;

        loop {
            let (element, candidate) =
                match resolve_from(self.driver, descriptor, next_candidate).await {
                    Resolution::Found { element, candidate } => (element, candidate),
                    Resolution::NotFound => break,
                };

            for strategy in Strategy::ORDER {
                match self.try_click(&element, strategy).await {
                    Ok(()) => {
                        debug!(
                            target: "engine.interact",
                            label = descriptor.label(),
                            %strategy,
                            candidate,
                            "click landed"
                        );
                        return InteractionOutcome::success(Some(strategy), candidate);
                    }
                    Err(e) => {
                        debug!(
                            target: "engine.interact",
                            label = descriptor.label(),
                            %strategy,
                            candidate,
                            error = %e,
                            "click attempt failed; escalating"
                        );
                        last_error = Some(format!("{strategy} on candidate {candidate}: {e}"));
                    }
                }
            }

            next_candidate = candidate + 1;
        }

        warn!(
            target: "engine.interact",
            label = descriptor.label(),
            error = last_error.as_deref().unwrap_or("no candidate visible"),
            "click exhausted all candidates and strategies"
        );
        InteractionOutcome::failure(
            last_error.or_else(|| Some("no candidate resolved to a visible element".into())),
        )
    }

    /// Fill the element described by `descriptor` with `text`.
    ///
    /// Focuses the element, clears existing content, then injects the text
    /// either as one bulk send or as a per-character stream with randomized
    /// delays — the latter for targets known to reject programmatic bulk
    /// insert (rich-text editors backed by an internal model). A candidate
    /// that fails advances to the next candidate.
    pub async fn fill(
        &self,
        descriptor: &ElementDescriptor,
        text: &str,
        mode: TypingMode,
    ) -> InteractionOutcome {
        let mut last_error: Option<String> = None;
        let mut next_candidate = 0;

        loop {
            let (element, candidate) =
                match resolve_from(self.driver, descriptor, next_candidate).await {
                    Resolution::Found { element, candidate } => (element, candidate),
                    Resolution::NotFound => break,
                };

            match self.try_fill(&element, text, mode).await {
                Ok(()) => {
                    debug!(
                        target: "engine.interact",
                        label = descriptor.label(),
                        candidate,
                        ?mode,
                        chars = text.chars().count(),
                        "fill completed"
                    );
                    return InteractionOutcome::success(None, candidate);
                }
                Err(e) => {
                    debug!(
                        target: "engine.interact",
                        label = descriptor.label(),
                        candidate,
                        error = %e,
                        "fill failed; advancing candidate"
                    );
                    last_error = Some(format!("fill candidate {candidate}: {e}"));
                }
            }

            next_candidate = candidate + 1;
        }

        warn!(
            target: "engine.interact",
            label = descriptor.label(),
            error = last_error.as_deref().unwrap_or("no candidate visible"),
            "fill exhausted all candidates"
        );
        InteractionOutcome::failure(
            last_error.or_else(|| Some("no candidate resolved to a visible element".into())),
        )
    }

    async fn try_click(&self, element: &D::Element, strategy: Strategy) -> anyhow::Result<()> {
        let attempt = async {
            match strategy {
                Strategy::Standard => self.driver.click(element, ClickMode::Standard).await,
                Strategy::Forced => self.driver.click(element, ClickMode::Forced).await,
                Strategy::ScriptDispatch => self.driver.dispatch_script_click(element).await,
            }
        };
        match tokio::time::timeout(self.timeouts.per_strategy, attempt).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!(
                "timed out after {:?}",
                self.timeouts.per_strategy
            ),
        }
    }

    async fn try_fill(
        &self,
        element: &D::Element,
        text: &str,
        mode: TypingMode,
    ) -> anyhow::Result<()> {
        let attempt = async {
            self.driver.focus_and_clear(element).await?;
            self.driver.type_text(element, text, mode).await
        };
        match tokio::time::timeout(self.timeouts.fill, attempt).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("timed out after {:?}", self.timeouts.fill),
        }
    }
}
