//! Per-platform publishing knowledge as data.
//!
//! Each platform contributes a [`PlatformSpec`]: selector tables, a session
//! signal set, and a completion check. The flow that executes those tables
//! is shared — adding a platform means writing a table, not a subclass.

pub mod csdn;
pub mod flow;
pub mod platform;
pub mod zhihu;

pub use flow::{FlowOptions, PlatformFlow};
pub use platform::{CompletionCheck, PlatformSpec, TagStep};
