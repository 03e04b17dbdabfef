//! Browser launch options and Chrome argument construction.

/// How the Chrome session is started.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// WebDriver endpoint (chromedriver).
    pub webdriver_url: String,
    pub headless: bool,
    /// Persistent profile directory. When set, cookies and storage survive
    /// across runs without a credential artifact.
    pub user_data_dir: Option<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: false,
            user_data_dir: None,
        }
    }
}

/// Chrome command-line arguments for a publishing session.
///
/// The automation-control flags matter: several publishing platforms gate
/// their editors behind scripted-browser checks.
pub fn build_browser_arguments(options: &BrowserOptions) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--window-size=1440,900".to_string(),
    ];
    if let Some(dir) = &options.user_data_dir {
        args.push(format!("--user-data-dir={dir}"));
    }
    if options.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

/// JavaScript evasions applied after navigation to reduce automation
/// signals visible to page scripts.
pub fn core_evasions() -> &'static str {
    r#"
        Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
        Object.defineProperty(navigator, 'plugins', { get: () => [1,2,3] });
        Object.defineProperty(navigator, 'languages', {
            get: () => ['en-US', 'en']
        });
        if (!window.chrome) window.chrome = { runtime: {} };
    "#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_adds_the_headless_flags() {
        let headed = build_browser_arguments(&BrowserOptions::default());
        assert!(!headed.iter().any(|a| a.starts_with("--headless")));

        let headless = build_browser_arguments(&BrowserOptions {
            headless: true,
            ..Default::default()
        });
        assert!(headless.iter().any(|a| a == "--headless=new"));
        assert!(headless.iter().any(|a| a == "--disable-gpu"));
    }

    #[test]
    fn profile_dir_is_passed_through() {
        let args = build_browser_arguments(&BrowserOptions {
            user_data_dir: Some("/srv/inkpost/profile".into()),
            ..Default::default()
        });
        assert!(args.contains(&"--user-data-dir=/srv/inkpost/profile".to_string()));
    }
}
