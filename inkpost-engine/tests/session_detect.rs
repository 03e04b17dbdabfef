mod common;

use anyhow::bail;
use async_trait::async_trait;
use common::{ElementSpec, MockDriver};
use inkpost_engine::session::{
    detect, CookieSignal, LandmarkSignal, ProfileLinkSignal, SessionSignal, StorageKeySignal,
    UrlPatternSignal,
};
use inkpost_engine::ElementDescriptor;
use regex::Regex;

struct FlagSignal {
    id: &'static str,
    value: bool,
}

#[async_trait]
impl SessionSignal<MockDriver> for FlagSignal {
    fn id(&self) -> &str {
        self.id
    }
    async fn evaluate(&self, _driver: &MockDriver) -> anyhow::Result<bool> {
        Ok(self.value)
    }
}

struct BrokenSignal;

#[async_trait]
impl SessionSignal<MockDriver> for BrokenSignal {
    fn id(&self) -> &str {
        "broken"
    }
    async fn evaluate(&self, _driver: &MockDriver) -> anyhow::Result<bool> {
        bail!("evaluation exploded")
    }
}

fn flags(values: &[(&'static str, bool)]) -> Vec<Box<dyn SessionSignal<MockDriver>>> {
    values
        .iter()
        .map(|(id, value)| {
            Box::new(FlagSignal { id, value: *value }) as Box<dyn SessionSignal<MockDriver>>
        })
        .collect()
}

#[tokio::test]
async fn first_true_signal_wins_regardless_of_position() {
    let driver = MockDriver::new();
    let signals = flags(&[
        ("avatar", false),
        ("profile-link", false),
        ("storage", true),
        ("cookie", false),
    ]);

    let state = detect(&driver, &signals).await;
    assert!(state.authenticated);
    assert_eq!(state.signal_id.as_deref(), Some("storage"));
}

#[tokio::test]
async fn higher_priority_signal_shadows_later_ones() {
    let driver = MockDriver::new();
    let signals = flags(&[("avatar", true), ("storage", true)]);

    let state = detect(&driver, &signals).await;
    assert_eq!(state.signal_id.as_deref(), Some("avatar"));
}

#[tokio::test]
async fn all_false_yields_anonymous() {
    let driver = MockDriver::new();
    let signals = flags(&[("avatar", false), ("cookie", false)]);

    let state = detect(&driver, &signals).await;
    assert!(!state.authenticated);
    assert!(state.signal_id.is_none());
}

#[tokio::test]
async fn a_broken_signal_never_blocks_the_rest() {
    let driver = MockDriver::new();
    let signals: Vec<Box<dyn SessionSignal<MockDriver>>> = vec![
        Box::new(BrokenSignal),
        Box::new(FlagSignal {
            id: "cookie",
            value: true,
        }),
    ];

    let state = detect(&driver, &signals).await;
    assert!(state.authenticated);
    assert_eq!(state.signal_id.as_deref(), Some("cookie"));
}

#[tokio::test]
async fn builtin_signals_observe_the_live_session() {
    let driver = MockDriver::new();
    driver.install("a.avatar-wrap", ElementSpec::visible());
    driver.install(r#"a[href*="/user/"]"#, ElementSpec::visible());
    {
        let mut state = driver.state.lock().unwrap();
        state.cookie_names = vec!["session_id".into(), "theme".into()];
        state.storage_keys = vec!["app:auth-token".into()];
        state.url = "https://example.com/people/self".into();
    }

    let landmark = LandmarkSignal::new(
        "avatar",
        ElementDescriptor::new("avatar", "a.avatar-wrap"),
    );
    assert!(landmark.evaluate(&driver).await.unwrap());

    let link = ProfileLinkSignal::new("profile-link", r#"a[href*="/user/"]"#);
    assert!(link.evaluate(&driver).await.unwrap());

    let storage = StorageKeySignal::new("storage", ["token", "login"]);
    assert!(storage.evaluate(&driver).await.unwrap());

    let cookie = CookieSignal::new("cookie", ["session", "auth"]);
    assert!(cookie.evaluate(&driver).await.unwrap());

    let url = UrlPatternSignal::new("url", Regex::new(r"/(user|people)/").unwrap());
    assert!(url.evaluate(&driver).await.unwrap());
}

#[tokio::test]
async fn substring_matching_is_case_insensitive_both_ways() {
    let driver = MockDriver::new();
    {
        let mut state = driver.state.lock().unwrap();
        state.cookie_names = vec!["UserToken".into()];
        state.storage_keys = vec!["Auth-Session".into()];
    }

    let cookie = CookieSignal::new("cookie", ["Token"]);
    assert!(cookie.evaluate(&driver).await.unwrap());

    let storage = StorageKeySignal::new("storage", ["SESSION"]);
    assert!(storage.evaluate(&driver).await.unwrap());
}

#[tokio::test]
async fn storage_signal_errors_count_as_false_in_detection() {
    let driver = MockDriver::new();
    driver.state.lock().unwrap().storage_unavailable = true;
    driver.state.lock().unwrap().cookie_names = vec!["auth_session".into()];

    let signals: Vec<Box<dyn SessionSignal<MockDriver>>> = vec![
        Box::new(StorageKeySignal::new("storage", ["token"])),
        Box::new(CookieSignal::new("cookie", ["auth"])),
    ];

    let state = detect(&driver, &signals).await;
    assert_eq!(state.signal_id.as_deref(), Some("cookie"));
}
