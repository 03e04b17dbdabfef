//! Heterogeneous login-state detection.
//!
//! No single signal reliably marks an externally-driven login transition, so
//! detection evaluates several independent observations in priority order
//! and reports the first that fires. Signals are side-effect-free; a signal
//! that cannot be evaluated counts as false rather than blocking the rest.
//! The exact signal set (selectors, substrings, URL patterns) is
//! platform-specific configuration, not a fixed contract.

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::descriptor::ElementDescriptor;
use crate::driver::Driver;
use crate::locate::{resolve, Resolution};

/// Outcome of one detection pass. Created fresh each pass; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub authenticated: bool,
    /// Which signal confirmed authentication, for observability.
    pub signal_id: Option<String>,
}

impl SessionState {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            signal_id: None,
        }
    }

    fn confirmed(signal_id: &str) -> Self {
        Self {
            authenticated: true,
            signal_id: Some(signal_id.to_string()),
        }
    }
}

/// One independent, side-effect-free observation contributing to an
/// authenticated-state decision.
#[async_trait]
pub trait SessionSignal<D: Driver>: Send + Sync {
    fn id(&self) -> &str;
    async fn evaluate(&self, driver: &D) -> anyhow::Result<bool>;
}

/// Evaluate `signals` strictly in priority order; the first that reports
/// true decides. Evaluation errors are swallowed and treated as "signal
/// false" — a single broken signal must not block detection via the rest.
pub async fn detect<D: Driver>(
    driver: &D,
    signals: &[Box<dyn SessionSignal<D>>],
) -> SessionState {
    for signal in signals {
        match signal.evaluate(driver).await {
            Ok(true) => {
                info!(target: "engine.session", signal = signal.id(), "authenticated");
                return SessionState::confirmed(signal.id());
            }
            Ok(false) => {}
            Err(e) => {
                debug!(
                    target: "engine.session",
                    signal = signal.id(),
                    error = %e,
                    "signal evaluation failed; treating as false"
                );
            }
        }
    }
    SessionState::anonymous()
}

/// Presence of a known logged-in landmark element (avatar, user menu).
pub struct LandmarkSignal {
    id: String,
    landmark: ElementDescriptor,
}

impl LandmarkSignal {
    pub fn new(id: impl Into<String>, landmark: ElementDescriptor) -> Self {
        Self {
            id: id.into(),
            landmark,
        }
    }
}

#[async_trait]
impl<D: Driver> SessionSignal<D> for LandmarkSignal {
    fn id(&self) -> &str {
        &self.id
    }

    async fn evaluate(&self, driver: &D) -> anyhow::Result<bool> {
        Ok(resolve(driver, &self.landmark).await.is_found())
    }
}

/// Presence of any internal link matching a user/profile route selector.
pub struct ProfileLinkSignal {
    id: String,
    selector: String,
}

impl ProfileLinkSignal {
    pub fn new(id: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selector: selector.into(),
        }
    }
}

#[async_trait]
impl<D: Driver> SessionSignal<D> for ProfileLinkSignal {
    fn id(&self) -> &str {
        &self.id
    }

    async fn evaluate(&self, driver: &D) -> anyhow::Result<bool> {
        Ok(driver.find(&self.selector).await?.is_some())
    }
}

/// Auth-looking keys in client-side key-value storage, by substring match.
pub struct StorageKeySignal {
    id: String,
    substrings: Vec<String>,
}

impl StorageKeySignal {
    /// Substrings are matched case-insensitively against the stored keys.
    pub fn new(id: impl Into<String>, substrings: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            id: id.into(),
            substrings: substrings.into_iter().map(str::to_lowercase).collect(),
        }
    }
}

#[async_trait]
impl<D: Driver> SessionSignal<D> for StorageKeySignal {
    fn id(&self) -> &str {
        &self.id
    }

    async fn evaluate(&self, driver: &D) -> anyhow::Result<bool> {
        let keys = driver.local_storage_keys().await?;
        Ok(keys.iter().any(|k| {
            let k = k.to_lowercase();
            self.substrings.iter().any(|s| k.contains(s))
        }))
    }
}

/// Auth-looking cookie names, by substring match.
pub struct CookieSignal {
    id: String,
    substrings: Vec<String>,
}

impl CookieSignal {
    /// Substrings are matched case-insensitively against the cookie names.
    pub fn new(id: impl Into<String>, substrings: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            id: id.into(),
            substrings: substrings.into_iter().map(str::to_lowercase).collect(),
        }
    }
}

#[async_trait]
impl<D: Driver> SessionSignal<D> for CookieSignal {
    fn id(&self) -> &str {
        &self.id
    }

    async fn evaluate(&self, driver: &D) -> anyhow::Result<bool> {
        let names = driver.cookie_names().await?;
        Ok(names.iter().any(|n| {
            let n = n.to_lowercase();
            self.substrings.iter().any(|s| n.contains(s))
        }))
    }
}

/// Current navigation URL matching a profile/account pattern.
pub struct UrlPatternSignal {
    id: String,
    pattern: Regex,
}

impl UrlPatternSignal {
    pub fn new(id: impl Into<String>, pattern: Regex) -> Self {
        Self {
            id: id.into(),
            pattern,
        }
    }
}

#[async_trait]
impl<D: Driver> SessionSignal<D> for UrlPatternSignal {
    fn id(&self) -> &str {
        &self.id
    }

    async fn evaluate(&self, driver: &D) -> anyhow::Result<bool> {
        let url = driver.current_url().await?;
        Ok(self.pattern.is_match(&url))
    }
}
