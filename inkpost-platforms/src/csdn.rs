//! Table for the CSDN markdown editor.

use inkpost_engine::session::{CookieSignal, LandmarkSignal, ProfileLinkSignal, SessionSignal, StorageKeySignal};
use inkpost_engine::{Driver, ElementDescriptor, TypingMode};

use crate::platform::{CompletionCheck, PlatformSpec, TagStep};

const EDITOR_URL: &str = "https://editor.csdn.net/md/?not_checkout=1";

/// Bulk write through the editor's own API where one is mounted; typed
/// input into a large markdown document is slow and lossy here.
const BODY_SCRIPT_WRITE: &str = r#"
    const text = arguments[0];
    try {
        const cm = document.querySelector('.CodeMirror');
        if (cm && cm.CodeMirror) { cm.CodeMirror.setValue(text); return true; }
        if (window.monaco && window.monaco.editor) {
            const editors = window.monaco.editor.getEditors
                ? window.monaco.editor.getEditors()
                : null;
            if (editors && editors[0]) { editors[0].setValue(text); return true; }
        }
        const el = document.querySelector('pre.editor__inner[contenteditable="true"]');
        if (el) {
            el.focus();
            el.textContent = text;
            const dt = new DataTransfer();
            dt.setData('text/plain', text);
            el.dispatchEvent(new ClipboardEvent('paste', { clipboardData: dt, bubbles: true }));
            el.dispatchEvent(new Event('input', { bubbles: true }));
            return true;
        }
    } catch (e) {}
    return false;
"#;

pub fn spec() -> PlatformSpec {
    PlatformSpec {
        id: "csdn",
        editor_url: EDITOR_URL,
        editor_ready: ElementDescriptor::new(
            "markdown editor",
            r#"pre.editor__inner.markdown-highlighting[contenteditable="true"]"#,
        )
        .or(r#"pre.editor__inner[contenteditable="true"]"#),
        title_input: Some(
            ElementDescriptor::new("title input", r#"input[placeholder*="标题"]"#)
                .or("input.title")
                .or("input#title")
                .or(r#"input[name="title"]"#),
        ),
        body_input: ElementDescriptor::new(
            "editor body",
            r#"pre.editor__inner.markdown-highlighting[contenteditable="true"]"#,
        )
        .or(r#"pre.editor__inner[contenteditable="true"]"#)
        .or(r#"div[contenteditable="true"]"#),
        body_typing: TypingMode::Bulk,
        body_script_write: Some(BODY_SCRIPT_WRITE),
        publish_button: ElementDescriptor::new("publish button", "button.btn.btn-publish")
            .or("button.btn-publish")
            .or(r#"button[role="button"][data-report-click]"#),
        confirm_button: ElementDescriptor::new(
            "confirm publish button",
            ".modal__inner-2 button.btn-b-red",
        )
        .or(".modal__button-bar button.btn-b-red")
        .or(".el-dialog__footer button.btn-b-red"),
        tag_step: Some(TagStep {
            existing_tags: ".mark_selection_box .el-tag",
            trigger: ElementDescriptor::new("tag selection box", ".mark_selection_box")
                .or(".mark_selection .tag__btn-tag")
                .or(".mark-mask-box-div"),
            input: ElementDescriptor::new(
                "tag input",
                ".mark_selection_box input.el-input__inner",
            )
            .or("input.el-input__inner"),
        }),
        // The editor stays on its own URL after publishing; the dialog
        // closing is the observable completion.
        completion: CompletionCheck::ElementGone(".modal__inner-2"),
        credential_file: "csdn.json",
    }
}

pub fn signals<D: Driver>() -> Vec<Box<dyn SessionSignal<D>>> {
    vec![
        Box::new(LandmarkSignal::new(
            "editor",
            ElementDescriptor::new(
                "markdown editor",
                r#"pre.editor__inner[contenteditable="true"]"#,
            ),
        )),
        Box::new(ProfileLinkSignal::new(
            "profile-link",
            r#"a[href*="blog.csdn.net"]"#,
        )),
        Box::new(StorageKeySignal::new(
            "storage",
            ["token", "login", "user", "auth", "session"],
        )),
        Box::new(CookieSignal::new(
            "cookie",
            ["usertoken", "username", "session"],
        )),
    ]
}
