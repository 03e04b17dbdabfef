//! The shared publish flow executing a [`PlatformSpec`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use inkpost_engine::interact::Interactor;
use inkpost_engine::locate::{resolve, Resolution};
use inkpost_engine::pipeline::{PublishFlow, PublishReceipt, WorkItem};
use inkpost_engine::poll::{wait_until, PollConfig, PollOutcome};
use inkpost_engine::session::{detect, SessionSignal};
use inkpost_engine::{Driver, TypingMode};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::platform::{CompletionCheck, PlatformSpec, TagStep};

const EDITOR_READY_DEADLINE: Duration = Duration::from_secs(30);
const DIALOG_DEADLINE: Duration = Duration::from_secs(10);
const COMPLETION_DEADLINE: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Run-level knobs that are not part of the platform table.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    /// Tags ensured in the confirmation dialog, where the platform has a
    /// tag step.
    pub tags: Vec<String>,
    pub credentials_dir: PathBuf,
    pub diagnostics_dir: PathBuf,
    pub login_timeout: Duration,
    /// Perform every step except the publish confirmation.
    pub dry_run: bool,
}

/// Executes the ordered publish steps for one platform.
///
/// Ordering per item: session → editor → title → body → publish → tags →
/// confirm → completion. Any failed step aborts only the current item.
pub struct PlatformFlow<D: Driver> {
    spec: PlatformSpec,
    signals: Vec<Box<dyn SessionSignal<D>>>,
    options: FlowOptions,
    /// Login survives across items within one run; detection runs once.
    session_ready: AtomicBool,
}

impl<D: Driver> PlatformFlow<D> {
    pub fn new(
        spec: PlatformSpec,
        signals: Vec<Box<dyn SessionSignal<D>>>,
        options: FlowOptions,
    ) -> Self {
        Self {
            spec,
            signals,
            options,
            session_ready: AtomicBool::new(false),
        }
    }

    fn poll_config(&self, step: &str, deadline: Duration) -> PollConfig {
        PollConfig::new(
            format!("{} {step}", self.spec.id),
            POLL_INTERVAL,
            deadline,
        )
        .diagnostics_dir(&self.options.diagnostics_dir)
    }

    /// Make sure the session is authenticated, restoring a credential
    /// artifact when one exists and otherwise waiting (bounded) for the
    /// user to log in interactively.
    async fn ensure_session(&self, driver: &D, cancel: &CancellationToken) -> Result<()> {
        if self.session_ready.load(Ordering::SeqCst) {
            return Ok(());
        }

        driver.navigate(self.spec.editor_url).await?;
        let artifact = self.options.credentials_dir.join(self.spec.credential_file);
        if driver.load_credential_state(&artifact).await? {
            info!(target: "platform.flow", platform = self.spec.id, "credential state restored");
            // Reload so the document picks up the restored cookies.
            driver.navigate(self.spec.editor_url).await?;
        }

        let state = detect(driver, &self.signals).await;
        if state.authenticated {
            self.session_ready.store(true, Ordering::SeqCst);
            return Ok(());
        }

        info!(
            target: "platform.flow",
            platform = self.spec.id,
            timeout_secs = self.options.login_timeout.as_secs(),
            "not logged in; waiting for interactive login in the browser"
        );
        let config = PollConfig::new(
            format!("{} login", self.spec.id),
            Duration::from_secs(2),
            self.options.login_timeout,
        )
        .diagnostics_dir(&self.options.diagnostics_dir);
        let outcome = wait_until(driver, &config, cancel, || async {
            detect(driver, &self.signals).await.authenticated
        })
        .await;

        match outcome {
            PollOutcome::Satisfied => {
                driver.save_credential_state(&artifact).await?;
                info!(
                    target: "platform.flow",
                    platform = self.spec.id,
                    artifact = %artifact.display(),
                    "login detected; credential state saved"
                );
                self.session_ready.store(true, Ordering::SeqCst);
                Ok(())
            }
            PollOutcome::TimedOut(diag) => bail!(
                "login was not completed within {:?} (diagnostics at {})",
                self.options.login_timeout,
                diag.screenshot.display()
            ),
            PollOutcome::Cancelled => bail!("cancelled while waiting for login"),
        }
    }

    async fn write_body(&self, driver: &D, interactor: &Interactor<'_, D>, body: &str) -> Result<()> {
        if let Some(script) = self.spec.body_script_write {
            match driver.evaluate(script, vec![json!(body)]).await {
                Ok(v) if v.as_bool() == Some(true) => {
                    debug!(target: "platform.flow", platform = self.spec.id, "body written via editor API");
                    return Ok(());
                }
                Ok(_) => debug!(
                    target: "platform.flow",
                    platform = self.spec.id,
                    "editor API write declined; falling back to typed input"
                ),
                Err(e) => debug!(
                    target: "platform.flow",
                    platform = self.spec.id,
                    error = %e,
                    "editor API write failed; falling back to typed input"
                ),
            }
        }

        let outcome = interactor
            .fill(&self.spec.body_input, body, self.spec.body_typing)
            .await;
        if !outcome.succeeded {
            bail!(
                "body fill failed: {}",
                outcome.error.unwrap_or_else(|| "unknown".into())
            );
        }
        Ok(())
    }

    /// Best-effort: the dialog publishes fine when tags already exist, and a
    /// tag that cannot be added should not sink the item before the confirm
    /// attempt.
    async fn ensure_tags(&self, driver: &D, interactor: &Interactor<'_, D>, step: &TagStep) {
        match driver.find(step.existing_tags).await {
            Ok(Some(_)) => {
                debug!(target: "platform.flow", platform = self.spec.id, "dialog already has tags");
                return;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(target: "platform.flow", error = %e, "tag inspection failed; attempting add anyway");
            }
        }

        let trigger = interactor.click(&step.trigger).await;
        if !trigger.succeeded {
            warn!(
                target: "platform.flow",
                platform = self.spec.id,
                error = trigger.error.as_deref().unwrap_or("unknown"),
                "tag input trigger failed; publishing without tags"
            );
            return;
        }

        for tag in &self.options.tags {
            let filled = interactor.fill(&step.input, tag, TypingMode::Bulk).await;
            if !filled.succeeded {
                warn!(target: "platform.flow", tag, "tag fill failed; skipping");
                continue;
            }
            if let Resolution::Found { element, .. } = resolve(driver, &step.input).await {
                if let Err(e) = driver.press_enter(&element).await {
                    warn!(target: "platform.flow", tag, error = %e, "tag confirm keystroke failed");
                    continue;
                }
            }
            info!(target: "platform.flow", platform = self.spec.id, tag, "tag added");
        }
    }

    async fn await_completion(
        &self,
        driver: &D,
        cancel: &CancellationToken,
    ) -> Result<PublishReceipt> {
        match &self.spec.completion {
            CompletionCheck::UrlMatches(pattern) => {
                let published_url = Mutex::new(None);
                let outcome = wait_until(
                    driver,
                    &self.poll_config("completion", COMPLETION_DEADLINE),
                    cancel,
                    || async {
                        match driver.current_url().await {
                            Ok(url) if pattern.is_match(&url) => {
                                if let Ok(mut slot) = published_url.lock() {
                                    *slot = Some(url);
                                }
                                true
                            }
                            _ => false,
                        }
                    },
                )
                .await;
                match outcome {
                    PollOutcome::Satisfied => Ok(PublishReceipt {
                        url: published_url.into_inner().unwrap_or(None),
                    }),
                    PollOutcome::TimedOut(diag) => bail!(
                        "publish confirmation never navigated to the article (diagnostics at {})",
                        diag.screenshot.display()
                    ),
                    PollOutcome::Cancelled => bail!("cancelled while awaiting completion"),
                }
            }
            CompletionCheck::ElementGone(selector) => {
                let outcome = wait_until(
                    driver,
                    &self.poll_config("completion", COMPLETION_DEADLINE),
                    cancel,
                    || async { matches!(driver.find(selector).await, Ok(None)) },
                )
                .await;
                match outcome {
                    PollOutcome::Satisfied => Ok(PublishReceipt::default()),
                    PollOutcome::TimedOut(diag) => bail!(
                        "confirmation dialog never closed (diagnostics at {})",
                        diag.screenshot.display()
                    ),
                    PollOutcome::Cancelled => bail!("cancelled while awaiting completion"),
                }
            }
        }
    }
}

#[async_trait]
impl<D: Driver> PublishFlow<D> for PlatformFlow<D> {
    async fn publish(
        &self,
        driver: &D,
        item: &WorkItem,
        cancel: &CancellationToken,
    ) -> Result<PublishReceipt> {
        self.ensure_session(driver, cancel).await?;

        driver.navigate(self.spec.editor_url).await?;
        let ready = wait_until(
            driver,
            &self.poll_config("editor ready", EDITOR_READY_DEADLINE),
            cancel,
            || async { resolve(driver, &self.spec.editor_ready).await.is_found() },
        )
        .await;
        match ready {
            PollOutcome::Satisfied => {}
            PollOutcome::TimedOut(diag) => bail!(
                "editor never became ready (diagnostics at {})",
                diag.screenshot.display()
            ),
            PollOutcome::Cancelled => bail!("cancelled while loading editor"),
        }

        let interactor = Interactor::new(driver);

        if let Some(title_input) = &self.spec.title_input {
            let outcome = interactor
                .fill(title_input, &item.title, self.spec.body_typing)
                .await;
            if !outcome.succeeded {
                bail!(
                    "title fill failed: {}",
                    outcome.error.unwrap_or_else(|| "unknown".into())
                );
            }
        }

        self.write_body(driver, &interactor, &item.body).await?;

        if self.options.dry_run {
            info!(
                target: "platform.flow",
                platform = self.spec.id,
                id = %item.id,
                "dry run: stopping before publish"
            );
            return Ok(PublishReceipt::default());
        }

        let publish = interactor.click(&self.spec.publish_button).await;
        if !publish.succeeded {
            bail!(
                "publish button: {}",
                publish.error.unwrap_or_else(|| "unknown".into())
            );
        }

        // Give the confirmation surface time to appear before touching it.
        let dialog = wait_until(
            driver,
            &self.poll_config("confirm dialog", DIALOG_DEADLINE),
            cancel,
            || async { resolve(driver, &self.spec.confirm_button).await.is_found() },
        )
        .await;
        match dialog {
            PollOutcome::Satisfied => {}
            PollOutcome::TimedOut(diag) => bail!(
                "confirmation dialog never appeared (diagnostics at {})",
                diag.screenshot.display()
            ),
            PollOutcome::Cancelled => bail!("cancelled while awaiting confirmation dialog"),
        }

        if let Some(step) = &self.spec.tag_step {
            self.ensure_tags(driver, &interactor, step).await;
        }

        let confirm = interactor.click(&self.spec.confirm_button).await;
        if !confirm.succeeded {
            bail!(
                "confirm button: {}",
                confirm.error.unwrap_or_else(|| "unknown".into())
            );
        }

        self.await_completion(driver, cancel).await
    }
}
