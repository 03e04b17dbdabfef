//! The seam between the engine and a live browser session.
//!
//! The engine never talks to WebDriver directly; it drives whatever
//! implements [`Driver`]. The production implementation lives in
//! `inkpost-driver` (fantoccini-backed); tests script a fake.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How a click is delivered to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    /// Bring the element into view, then a standard input-simulated click.
    Standard,
    /// Click without visibility/overlap checks (script-level `el.click()`).
    Forced,
}

/// How text is injected into an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingMode {
    /// Single bulk key-send. Fast, but rich-text editors backed by an
    /// internal model may reject it.
    Bulk,
    /// One character at a time with small randomized delays.
    PerChar,
}

/// A live browser session as the engine sees it.
///
/// All methods are observations or single interactions; retry, fallback and
/// timeout composition live above this trait, in the engine. Implementations
/// should surface remote failures as errors rather than swallowing them —
/// the engine decides which failures are recoverable.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Opaque handle to a resolved element. Cloning must be cheap.
    type Element: Clone + Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// Look up a single element. `Ok(None)` when nothing matches.
    async fn find(&self, selector: &str) -> Result<Option<Self::Element>>;

    async fn is_visible(&self, element: &Self::Element) -> Result<bool>;

    async fn click(&self, element: &Self::Element, mode: ClickMode) -> Result<()>;

    /// Dispatch a synthetic click event directly on the element handle,
    /// bypassing all input-simulation layers.
    async fn dispatch_script_click(&self, element: &Self::Element) -> Result<()>;

    /// Focus the element and clear any existing content.
    async fn focus_and_clear(&self, element: &Self::Element) -> Result<()>;

    async fn type_text(
        &self,
        element: &Self::Element,
        text: &str,
        mode: TypingMode,
    ) -> Result<()>;

    /// Send an Enter/confirm keystroke to the element.
    async fn press_enter(&self, element: &Self::Element) -> Result<()>;

    async fn evaluate(
        &self,
        script: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value>;

    async fn current_url(&self) -> Result<String>;

    /// Capture a visual snapshot of the current state to `path`.
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Serialize the current document (full page source).
    async fn page_source(&self) -> Result<String>;

    async fn cookie_names(&self) -> Result<Vec<String>>;

    async fn local_storage_keys(&self) -> Result<Vec<String>>;

    /// Persist the session's credential artifact (cookies + storage).
    async fn save_credential_state(&self, path: &Path) -> Result<()>;

    /// Restore a previously saved credential artifact. Returns `false` when
    /// no artifact exists at `path`.
    async fn load_credential_state(&self, path: &Path) -> Result<bool>;

    /// Orderly close of the underlying session, releasing held resources.
    async fn close(&self) -> Result<()>;
}
