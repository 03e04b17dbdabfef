//! The live WebDriver session behind the engine's `Driver` trait.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder, Locator};
use inkpost_engine::driver::{ClickMode, Driver, TypingMode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use webdriver::capabilities::Capabilities;

use crate::launch::{build_browser_arguments, core_evasions, BrowserOptions};
use crate::pacing::HumanPacing;

/// A Chrome session driven over the WebDriver protocol.
///
/// `Client` is a cheap handle; methods take `&self` and serialize commands
/// over an internal channel.
pub struct WebDriverSession {
    client: Client,
    pacing: HumanPacing,
}

impl WebDriverSession {
    /// Connect to a running chromedriver and start a Chrome session.
    pub async fn connect(options: &BrowserOptions) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(build_browser_arguments(options)));
        // Chrome announces itself to page scripts when started by a driver;
        // several editors refuse to load in that state.
        chrome_opts.insert("excludeSwitches".to_string(), json!(["enable-automation"]));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&options.webdriver_url)
            .await
            .with_context(|| format!("connecting to webdriver at {}", options.webdriver_url))?;

        Ok(Self {
            client,
            pacing: HumanPacing::new(),
        })
    }

    fn as_arg(element: &Element) -> Result<serde_json::Value> {
        serde_json::to_value(element).context("serializing element handle")
    }
}

/// On-disk credential artifact: cookies plus localStorage, captured after a
/// successful login and replayed on later runs.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CredentialArtifact {
    cookies: Vec<StoredCookie>,
    local_storage: BTreeMap<String, String>,
}

impl CredentialArtifact {
    /// Load the artifact at `path`. `Ok(None)` when none was ever saved.
    async fn read(path: &Path) -> Result<Option<Self>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading credential state {}", path.display()))
            }
        };
        let artifact = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt credential state: {}", path.display()))?;
        Ok(Some(artifact))
    }

    async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, serde_json::to_string_pretty(self)?)
            .await
            .with_context(|| format!("writing credential state to {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
}

const LOCAL_STORAGE_DUMP: &str = r#"
    const out = {};
    for (let i = 0; i < window.localStorage.length; i++) {
        const k = window.localStorage.key(i);
        out[k] = window.localStorage.getItem(k);
    }
    return out;
"#;

#[async_trait]
impl Driver for WebDriverSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.pacing.random_delay(300, 1200).await;
        self.client.goto(url).await?;
        // Applied after every navigation so fresh documents see the same
        // environment.
        self.client.execute(core_evasions(), vec![]).await?;
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Option<Element>> {
        let mut matches = self.client.find_all(Locator::Css(selector)).await?;
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }

    async fn is_visible(&self, element: &Element) -> Result<bool> {
        Ok(element.is_displayed().await?)
    }

    async fn click(&self, element: &Element, mode: ClickMode) -> Result<()> {
        match mode {
            ClickMode::Standard => {
                self.client
                    .execute(
                        "arguments[0].scrollIntoView({ block: 'center' });",
                        vec![Self::as_arg(element)?],
                    )
                    .await?;
                self.pacing.random_delay(100, 400).await;
                element.click().await?;
            }
            ClickMode::Forced => {
                self.client
                    .execute("arguments[0].click();", vec![Self::as_arg(element)?])
                    .await?;
            }
        }
        Ok(())
    }

    async fn dispatch_script_click(&self, element: &Element) -> Result<()> {
        self.client
            .execute(
                r#"
                const el = arguments[0];
                for (const type of ['mousedown', 'mouseup', 'click']) {
                    el.dispatchEvent(new MouseEvent(type, {
                        bubbles: true,
                        cancelable: true,
                        view: window,
                    }));
                }
                "#,
                vec![Self::as_arg(element)?],
            )
            .await?;
        Ok(())
    }

    async fn focus_and_clear(&self, element: &Element) -> Result<()> {
        self.client
            .execute("arguments[0].focus();", vec![Self::as_arg(element)?])
            .await?;
        if element.clear().await.is_err() {
            // contenteditable surfaces reject the WebDriver clear command.
            self.client
                .execute(
                    r#"
                    const el = arguments[0];
                    el.innerHTML = '';
                    el.dispatchEvent(new Event('input', { bubbles: true }));
                    "#,
                    vec![Self::as_arg(element)?],
                )
                .await?;
        }
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str, mode: TypingMode) -> Result<()> {
        match mode {
            TypingMode::Bulk => element.send_keys(text).await?,
            TypingMode::PerChar => self.pacing.type_text_human_like(element, text).await?,
        }
        Ok(())
    }

    async fn press_enter(&self, element: &Element) -> Result<()> {
        element
            .send_keys(&char::from(Key::Enter).to_string())
            .await?;
        Ok(())
    }

    async fn evaluate(
        &self,
        script: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let png = self.client.screenshot().await?;
        tokio::fs::write(path, png)
            .await
            .with_context(|| format!("writing screenshot to {}", path.display()))?;
        Ok(())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn cookie_names(&self) -> Result<Vec<String>> {
        let cookies = self.client.get_all_cookies().await?;
        Ok(cookies.iter().map(|c| c.name().to_string()).collect())
    }

    async fn local_storage_keys(&self) -> Result<Vec<String>> {
        let value = self
            .client
            .execute("return Object.keys(window.localStorage);", vec![])
            .await?;
        Ok(serde_json::from_value(value).context("reading localStorage keys")?)
    }

    async fn save_credential_state(&self, path: &Path) -> Result<()> {
        let cookies = self
            .client
            .get_all_cookies()
            .await?
            .iter()
            .map(|c| StoredCookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
                domain: c.domain().map(str::to_string),
                path: c.path().map(str::to_string),
                secure: c.secure().unwrap_or(false),
            })
            .collect();
        let storage = self.client.execute(LOCAL_STORAGE_DUMP, vec![]).await?;
        let artifact = CredentialArtifact {
            cookies,
            local_storage: serde_json::from_value(storage).unwrap_or_default(),
        };
        artifact.write(path).await?;
        debug!(target: "driver.session", path = %path.display(), "credential state saved");
        Ok(())
    }

    async fn load_credential_state(&self, path: &Path) -> Result<bool> {
        let Some(artifact) = CredentialArtifact::read(path).await? else {
            return Ok(false);
        };

        // Cookies can only be set for the origin currently loaded; the
        // caller navigates to the platform before restoring.
        for stored in artifact.cookies {
            let mut cookie = Cookie::new(stored.name, stored.value);
            if let Some(domain) = stored.domain {
                cookie.set_domain(domain);
            }
            if let Some(cookie_path) = stored.path {
                cookie.set_path(cookie_path);
            }
            cookie.set_secure(stored.secure);
            if let Err(e) = self.client.add_cookie(cookie).await {
                warn!(target: "driver.session", error = %e, "cookie restore rejected; continuing");
            }
        }
        if !artifact.local_storage.is_empty() {
            self.client
                .execute(
                    r#"
                    const data = arguments[0];
                    for (const k in data) window.localStorage.setItem(k, data[k]);
                    "#,
                    vec![serde_json::to_value(&artifact.local_storage)?],
                )
                .await?;
        }
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn credential_artifact_roundtrips_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        // The parent directory does not exist yet; write must create it.
        let path = dir.path().join("credentials").join("csdn.json");

        let artifact = CredentialArtifact {
            cookies: vec![StoredCookie {
                name: "session_id".into(),
                value: "abc123".into(),
                domain: Some(".example.com".into()),
                path: Some("/".into()),
                secure: true,
            }],
            local_storage: BTreeMap::from([("app:token".to_string(), "xyz".to_string())]),
        };
        artifact.write(&path).await.unwrap();

        let back = CredentialArtifact::read(&path).await.unwrap().unwrap();
        assert_eq!(back.cookies.len(), 1);
        assert_eq!(back.cookies[0].name, "session_id");
        assert_eq!(back.local_storage.get("app:token").map(String::as_str), Some("xyz"));
    }

    #[tokio::test]
    async fn read_distinguishes_absent_from_corrupt() {
        let dir = tempfile::TempDir::new().unwrap();
        let absent = CredentialArtifact::read(&dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(absent.is_none());

        let bad = dir.path().join("bad.json");
        tokio::fs::write(&bad, "not json").await.unwrap();
        let err = CredentialArtifact::read(&bad).await.unwrap_err();
        assert!(err.to_string().contains("corrupt credential state"));
    }

    #[test]
    fn missing_artifact_fields_default() {
        let back: CredentialArtifact = serde_json::from_str(r#"{"cookies": []}"#).unwrap();
        assert!(back.cookies.is_empty());
        assert!(back.local_storage.is_empty());
    }
}
