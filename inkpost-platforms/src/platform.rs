//! The strategy table describing one platform's publishing surface.

use inkpost_engine::{ElementDescriptor, TypingMode};
use regex::Regex;

/// Everything the shared flow needs to publish on one platform.
///
/// Selector choices and signal sets live here as data; the flow itself has
/// no platform-specific branches.
pub struct PlatformSpec {
    pub id: &'static str,
    /// Where the editor lives. Also the page used to bootstrap login.
    pub editor_url: &'static str,
    /// Landmark that the editor finished loading and the account is usable.
    pub editor_ready: ElementDescriptor,
    /// Title input. Absent on platforms that derive the title elsewhere.
    pub title_input: Option<ElementDescriptor>,
    pub body_input: ElementDescriptor,
    pub body_typing: TypingMode,
    /// Editor-API bulk write attempted before falling back to typed input.
    /// The script receives the body as `arguments[0]` and returns a boolean.
    pub body_script_write: Option<&'static str>,
    pub publish_button: ElementDescriptor,
    pub confirm_button: ElementDescriptor,
    /// Tag handling inside the confirmation dialog, where required.
    pub tag_step: Option<TagStep>,
    pub completion: CompletionCheck,
    /// File name (within the credentials directory) of this platform's
    /// credential artifact.
    pub credential_file: &'static str,
}

/// The confirmation dialog refuses to publish without at least one tag on
/// some platforms.
pub struct TagStep {
    /// Selector matching tags already attached; when any exists, the step
    /// is skipped.
    pub existing_tags: &'static str,
    /// Element that reveals the tag input when clicked.
    pub trigger: ElementDescriptor,
    /// The input that accepts a tag name followed by Enter.
    pub input: ElementDescriptor,
}

/// How the flow decides a publish actually completed.
pub enum CompletionCheck {
    /// The page navigates to the published article; the final URL must
    /// match and is captured as the receipt.
    UrlMatches(Regex),
    /// The confirmation surface disappears from the document.
    ElementGone(&'static str),
}
