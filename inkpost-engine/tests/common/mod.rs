//! Scripted in-memory driver used by the engine integration tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use inkpost_engine::driver::{ClickMode, Driver, TypingMode};

#[derive(Clone, Debug)]
pub struct MockElement {
    pub selector: String,
}

/// Per-selector behavior script.
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    pub visible: bool,
    pub fail_standard_click: bool,
    pub fail_forced_click: bool,
    pub fail_script_click: bool,
    pub fail_fill: bool,
}

impl ElementSpec {
    pub fn visible() -> Self {
        Self {
            visible: true,
            ..Default::default()
        }
    }

    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn unclickable() -> Self {
        Self {
            visible: true,
            fail_standard_click: true,
            fail_forced_click: true,
            fail_script_click: true,
            fail_fill: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub elements: HashMap<String, ElementSpec>,
    /// Every driver interaction, in order, e.g. `click:forced:button.save`.
    pub calls: Vec<String>,
    pub typed: Vec<(String, String, TypingMode)>,
    pub url: String,
    pub cookie_names: Vec<String>,
    pub storage_keys: Vec<String>,
    pub cookies_unavailable: bool,
    pub storage_unavailable: bool,
    pub closed: bool,
}

#[derive(Debug, Default)]
pub struct MockDriver {
    pub state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, selector: &str, spec: ElementSpec) {
        self.state
            .lock()
            .unwrap()
            .elements
            .insert(selector.to_string(), spec);
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().unwrap().url = url.to_string();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn spec_for(&self, selector: &str) -> Option<ElementSpec> {
        self.state.lock().unwrap().elements.get(selector).cloned()
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Element = MockElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate:{url}"));
        self.state.lock().unwrap().url = url.to_string();
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Option<MockElement>> {
        self.record(format!("find:{selector}"));
        Ok(self.spec_for(selector).map(|_| MockElement {
            selector: selector.to_string(),
        }))
    }

    async fn is_visible(&self, element: &MockElement) -> Result<bool> {
        Ok(self
            .spec_for(&element.selector)
            .map(|s| s.visible)
            .unwrap_or(false))
    }

    async fn click(&self, element: &MockElement, mode: ClickMode) -> Result<()> {
        let spec = self.spec_for(&element.selector).unwrap_or_default();
        match mode {
            ClickMode::Standard => {
                self.record(format!("click:standard:{}", element.selector));
                if spec.fail_standard_click {
                    bail!("element intercepted by overlay");
                }
            }
            ClickMode::Forced => {
                self.record(format!("click:forced:{}", element.selector));
                if spec.fail_forced_click {
                    bail!("forced click rejected");
                }
            }
        }
        Ok(())
    }

    async fn dispatch_script_click(&self, element: &MockElement) -> Result<()> {
        self.record(format!("click:script:{}", element.selector));
        let spec = self.spec_for(&element.selector).unwrap_or_default();
        if spec.fail_script_click {
            bail!("script dispatch rejected");
        }
        Ok(())
    }

    async fn focus_and_clear(&self, element: &MockElement) -> Result<()> {
        self.record(format!("clear:{}", element.selector));
        Ok(())
    }

    async fn type_text(&self, element: &MockElement, text: &str, mode: TypingMode) -> Result<()> {
        self.record(format!("type:{}", element.selector));
        let spec = self.spec_for(&element.selector).unwrap_or_default();
        if spec.fail_fill {
            bail!("editor rejected programmatic input");
        }
        self.state
            .lock()
            .unwrap()
            .typed
            .push((element.selector.clone(), text.to_string(), mode));
        Ok(())
    }

    async fn press_enter(&self, element: &MockElement) -> Result<()> {
        self.record(format!("enter:{}", element.selector));
        Ok(())
    }

    async fn evaluate(
        &self,
        _script: &str,
        _args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"\x89PNG mock capture")?;
        Ok(())
    }

    async fn page_source(&self) -> Result<String> {
        Ok("<html><body>mock document</body></html>".to_string())
    }

    async fn cookie_names(&self) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        if state.cookies_unavailable {
            bail!("cookie jar unavailable");
        }
        Ok(state.cookie_names.clone())
    }

    async fn local_storage_keys(&self) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        if state.storage_unavailable {
            bail!("storage unavailable");
        }
        Ok(state.storage_keys.clone())
    }

    async fn save_credential_state(&self, path: &Path) -> Result<()> {
        std::fs::write(path, "{}")?;
        Ok(())
    }

    async fn load_credential_state(&self, path: &Path) -> Result<bool> {
        Ok(path.exists())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
