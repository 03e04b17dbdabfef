//! Table for the Zhihu column ("zhuanlan") editor.

use inkpost_engine::session::{
    CookieSignal, LandmarkSignal, ProfileLinkSignal, SessionSignal, StorageKeySignal,
    UrlPatternSignal,
};
use inkpost_engine::{Driver, ElementDescriptor, TypingMode};
use regex::Regex;

use crate::platform::{CompletionCheck, PlatformSpec};

const WRITE_URL: &str = "https://zhuanlan.zhihu.com/write";

/// A published article lands on `/p/<id>`; the edit view keeps an `/edit`
/// suffix and must not count.
fn published_url_pattern() -> Regex {
    Regex::new(r"zhuanlan\.zhihu\.com/p/\d+(\?.*)?$").unwrap()
}

/// Profile and organization routes are only reachable with a session; the
/// editor URL itself is not usable as a signal since anonymous visitors may
/// sit on it before the redirect.
fn account_url_pattern() -> Regex {
    Regex::new(r"zhihu\.com/(people|org)/").unwrap()
}

pub fn spec() -> PlatformSpec {
    PlatformSpec {
        id: "zhihu",
        editor_url: WRITE_URL,
        editor_ready: ElementDescriptor::new("title input", r#"[placeholder^="请输入标题"]"#),
        title_input: Some(ElementDescriptor::new(
            "title input",
            r#"[placeholder^="请输入标题"]"#,
        )),
        body_input: ElementDescriptor::new(
            "article body",
            "div.DraftEditor-editorContainer > div.public-DraftEditor-content",
        )
        .or(".public-DraftEditor-content"),
        // Draft.js drops bulk key-sends; each character must arrive as its
        // own input event.
        body_typing: TypingMode::PerChar,
        body_script_write: None,
        publish_button: ElementDescriptor::new(
            "publish button",
            "button.Button--primary.Button--blue",
        )
        .or(".PublishPanel-triggerButton"),
        confirm_button: ElementDescriptor::new(
            "confirm publish button",
            r#"div[role="dialog"] button.Button--primary"#,
        ),
        tag_step: None,
        completion: CompletionCheck::UrlMatches(published_url_pattern()),
        credential_file: "zhihu.json",
    }
}

pub fn signals<D: Driver>() -> Vec<Box<dyn SessionSignal<D>>> {
    vec![
        Box::new(LandmarkSignal::new(
            "avatar",
            ElementDescriptor::new("header avatar", "img.Avatar.AppHeader-profileAvatar")
                .or(".AppHeader-userInfo img.Avatar"),
        )),
        Box::new(ProfileLinkSignal::new(
            "profile-link",
            r#"a[href*="/people/"]"#,
        )),
        Box::new(StorageKeySignal::new(
            "storage",
            ["token", "login", "user", "auth", "session"],
        )),
        Box::new(CookieSignal::new("cookie", ["z_c0", "session"])),
        Box::new(UrlPatternSignal::new("url", account_url_pattern())),
    ]
}
