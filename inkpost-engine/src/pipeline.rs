//! Batch publishing with per-item isolation and durable progress.
//!
//! The pipeline owns the work-item lifecycle and the publish log. One
//! logical worker drives one browser session; items run sequentially and to
//! completion, a single item's failure never aborts the batch, and the log
//! is persisted after every item so a crash loses at most the in-flight
//! item's state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::driver::Driver;

/// One unit of content to publish. The id is stable across runs (for posts
/// discovered on disk it is the filename).
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// Lifecycle state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Published,
    Failed,
}

/// Durable record of one item's latest terminal state.
///
/// `InProgress` is never persisted: an interrupted run leaves no entry for
/// the in-flight item, so a later run simply retries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub published: bool,
    pub status: ItemStatus,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemRecord {
    pub fn published(title: impl Into<String>, url: Option<String>) -> Self {
        Self {
            published: true,
            status: ItemStatus::Published,
            title: title.into(),
            timestamp: Utc::now(),
            url,
            error: None,
        }
    }

    pub fn failed(title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            published: false,
            status: ItemStatus::Failed,
            title: title.into(),
            timestamp: Utc::now(),
            url: None,
            error: Some(error.into()),
        }
    }
}

/// The durable mapping from work-item id to its latest state — the single
/// source of truth for "already done" filtering on restart.
///
/// Every mutation persists immediately with atomic replace semantics (write
/// to a temp file, then rename), so a crash never corrupts prior records.
#[derive(Debug)]
pub struct PublishLog {
    path: PathBuf,
    entries: BTreeMap<String, ItemRecord>,
}

impl PublishLog {
    /// Open the log at `path`, creating an empty one if the file is absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt publish log: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Option<&ItemRecord> {
        self.entries.get(id)
    }

    pub fn is_published(&self, id: &str) -> bool {
        self.entries.get(id).map(|r| r.published).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `id`'s latest state and persist the whole log immediately.
    pub fn record(&mut self, id: impl Into<String>, record: ItemRecord) -> Result<()> {
        self.entries.insert(id.into(), record);
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&tmp, raw).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// Proof of a completed publish, as far as the platform exposes one.
#[derive(Debug, Clone, Default)]
pub struct PublishReceipt {
    /// URL of the published content, when the platform reveals it.
    pub url: Option<String>,
}

/// The per-platform sequence of UI steps that publishes one item.
///
/// Implementations perform their steps in a fixed order (authenticate →
/// navigate → fill → confirm → verify) and must observe `cancel` at their
/// own suspension points. Any error aborts only the current item.
#[async_trait]
pub trait PublishFlow<D: Driver>: Send + Sync {
    async fn publish(
        &self,
        driver: &D,
        item: &WorkItem,
        cancel: &CancellationToken,
    ) -> Result<PublishReceipt>;
}

/// Randomized inter-item delays, throttling the request rate to a human
/// pace. The post-failure range is distinct (and typically shorter).
#[derive(Debug, Clone)]
pub struct Pacing {
    pub after_success: (Duration, Duration),
    pub after_failure: (Duration, Duration),
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            after_success: (Duration::from_secs(300), Duration::from_secs(600)),
            after_failure: (Duration::from_secs(60), Duration::from_secs(120)),
        }
    }
}

impl Pacing {
    /// Zero delays, for tests and dry runs.
    pub fn none() -> Self {
        Self {
            after_success: (Duration::ZERO, Duration::ZERO),
            after_failure: (Duration::ZERO, Duration::ZERO),
        }
    }

    fn pick(range: (Duration, Duration)) -> Duration {
        let (min, max) = range;
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

/// End-of-run accounting. Per-item failures carry the item id and error
/// text so users can see exactly what went wrong without reading logs.
#[derive(Debug)]
pub struct Summary {
    pub run_id: Uuid,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<(String, String)>,
}

impl Summary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Drives a list of work items through a [`PublishFlow`], one at a time.
pub struct BatchPipeline<'a, D: Driver, F: PublishFlow<D>> {
    driver: &'a D,
    flow: &'a F,
    log: PublishLog,
    pacing: Pacing,
    cancel: CancellationToken,
    /// When set, flows stop before the final confirmation and nothing is
    /// recorded as published.
    dry_run: bool,
}

impl<'a, D: Driver, F: PublishFlow<D>> BatchPipeline<'a, D, F> {
    pub fn new(driver: &'a D, flow: &'a F, log: PublishLog) -> Self {
        Self {
            driver,
            flow,
            log,
            pacing: Pacing::default(),
            cancel: CancellationToken::new(),
            dry_run: false,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn log(&self) -> &PublishLog {
        &self.log
    }

    /// Publish every item not already marked published in the log.
    ///
    /// Each item is isolated: an error is recorded as `Failed` and the batch
    /// continues. The log is persisted after every item. On cancellation the
    /// in-flight item is left unrecorded, the session is closed, and the
    /// summary reflects work completed so far. An error that aborts the
    /// whole batch (the log becoming unwritable) also closes the session
    /// before propagating.
    pub async fn run(&mut self, items: &[WorkItem]) -> Result<Summary> {
        match self.execute(items).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!(target: "engine.pipeline", error = %e, "batch aborted; closing session");
                if let Err(close_err) = self.driver.close().await {
                    warn!(target: "engine.pipeline", error = %close_err, "session close failed");
                }
                Err(e)
            }
        }
    }

    async fn execute(&mut self, items: &[WorkItem]) -> Result<Summary> {
        let run_id = Uuid::new_v4();
        let mut summary = Summary::new(run_id);
        let pending: Vec<&WorkItem> = items
            .iter()
            .filter(|item| {
                if self.log.is_published(&item.id) {
                    info!(target: "engine.pipeline", id = %item.id, "already published; skipping");
                    summary.skipped += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        info!(
            target: "engine.pipeline",
            %run_id,
            total = items.len(),
            pending = pending.len(),
            skipped = summary.skipped,
            dry_run = self.dry_run,
            "batch starting"
        );

        let mut interrupted = false;
        for (position, item) in pending.iter().enumerate() {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            info!(
                target: "engine.pipeline",
                id = %item.id,
                position = position + 1,
                of = pending.len(),
                "item picked up"
            );
            let outcome = self.flow.publish(self.driver, item, &self.cancel).await;

            // A flow unwound by cancellation must not be recorded as a
            // failure; the in-flight item simply stays absent from the log.
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let status = match outcome {
                Ok(receipt) => {
                    summary.succeeded += 1;
                    if self.dry_run {
                        info!(
                            target: "engine.pipeline",
                            id = %item.id,
                            "dry run: steps verified, nothing recorded"
                        );
                    } else {
                        info!(
                            target: "engine.pipeline",
                            id = %item.id,
                            url = receipt.url.as_deref().unwrap_or("<unknown>"),
                            "published"
                        );
                        self.log
                            .record(&item.id, ItemRecord::published(&item.title, receipt.url))?;
                    }
                    ItemStatus::Published
                }
                Err(e) => {
                    let message = format!("{e:#}");
                    error!(target: "engine.pipeline", id = %item.id, error = %message, "item failed; continuing");
                    summary.failed += 1;
                    summary.failures.push((item.id.clone(), message.clone()));
                    if !self.dry_run {
                        self.log
                            .record(&item.id, ItemRecord::failed(&item.title, message))?;
                    }
                    ItemStatus::Failed
                }
            };

            if position + 1 < pending.len() {
                let range = match status {
                    ItemStatus::Failed => self.pacing.after_failure,
                    _ => self.pacing.after_success,
                };
                let pause = Pacing::pick(range);
                if !pause.is_zero() {
                    info!(
                        target: "engine.pipeline",
                        pause_secs = pause.as_secs(),
                        "throttling before next item"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            interrupted = true;
                            break;
                        }
                        _ = tokio::time::sleep(pause) => {}
                    }
                }
            }
        }

        if interrupted {
            warn!(target: "engine.pipeline", %run_id, "batch interrupted; closing session");
            if let Err(e) = self.driver.close().await {
                warn!(target: "engine.pipeline", error = %e, "session close failed");
            }
        }

        info!(
            target: "engine.pipeline",
            %run_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_roundtrips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("publish_log.json");

        let mut log = PublishLog::open(&path).unwrap();
        assert!(log.is_empty());
        log.record(
            "a.md",
            ItemRecord::published("a", Some("https://example.com/p/1".into())),
        )
        .unwrap();
        log.record("b.md", ItemRecord::failed("b", "editor never appeared"))
            .unwrap();

        let reopened = PublishLog::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.is_published("a.md"));
        assert!(!reopened.is_published("b.md"));
        let b = reopened.get("b.md").unwrap();
        assert_eq!(b.status, ItemStatus::Failed);
        assert_eq!(b.error.as_deref(), Some("editor never appeared"));
    }

    #[test]
    fn open_tolerates_missing_file_but_not_garbage() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(PublishLog::open(&missing).unwrap().is_empty());

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "not json").unwrap();
        let err = PublishLog::open(&garbage).unwrap_err();
        assert!(err.to_string().contains("corrupt publish log"));
    }

    #[test]
    fn persisted_shape_matches_the_on_disk_contract() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("publish_log.json");
        let mut log = PublishLog::open(&path).unwrap();
        log.record(
            "post.md",
            ItemRecord::published("post", Some("https://example.com/p/9".into())),
        )
        .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &raw["post.md"];
        assert_eq!(entry["published"], serde_json::json!(true));
        assert_eq!(entry["url"], serde_json::json!("https://example.com/p/9"));
        assert_eq!(entry["title"], serde_json::json!("post"));
        assert!(entry["timestamp"].is_string());
        assert!(entry.get("error").is_none());
    }

    #[test]
    fn pacing_pick_respects_bounds() {
        let pacing = Pacing {
            after_success: (Duration::from_secs(2), Duration::from_secs(5)),
            after_failure: (Duration::from_secs(1), Duration::from_secs(1)),
        };
        for _ in 0..32 {
            let d = Pacing::pick(pacing.after_success);
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(5));
        }
        assert_eq!(Pacing::pick(pacing.after_failure), Duration::from_secs(1));
    }
}
