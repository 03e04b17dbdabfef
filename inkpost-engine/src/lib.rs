//! Resilient UI-driving engine for browser-based publishing.
//!
//! Remote editor UIs are externally controlled and change without notice:
//! selectors go stale, elements render behind transient overlays, and login
//! completes through side effects rather than a single reliable event. This
//! crate concentrates all of the recovery machinery for that in one place,
//! generic over a [`driver::Driver`] so every behavior is testable against a
//! scripted fake:
//!
//! - [`descriptor::ElementDescriptor`]: ordered candidate selectors for one
//!   logical element
//! - [`locate`]: first-visible-candidate resolution
//! - [`interact`]: escalating click/fill strategy chains
//! - [`session`]: ordered, fail-safe login-state signals
//! - [`poll`]: bounded polling with mandatory timeout diagnostics
//! - [`pipeline`]: per-item-isolated batch runs over a durable publish log

pub mod descriptor;
pub mod driver;
pub mod interact;
pub mod locate;
pub mod pipeline;
pub mod poll;
pub mod session;

pub use descriptor::ElementDescriptor;
pub use driver::{ClickMode, Driver, TypingMode};
pub use interact::{InteractionOutcome, Interactor, Strategy};
pub use pipeline::{BatchPipeline, PublishFlow, PublishLog, Summary, WorkItem};
pub use poll::{PollConfig, PollOutcome};
pub use session::{SessionSignal, SessionState};
