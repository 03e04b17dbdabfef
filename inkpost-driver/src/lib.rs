//! Fantoccini-backed implementation of the engine's `Driver` seam.
//!
//! Connects to a running chromedriver, launches Chrome with
//! automation-signal-reducing arguments, and layers human-paced input on
//! top of the raw WebDriver protocol.

pub mod launch;
pub mod pacing;
pub mod session;

pub use launch::BrowserOptions;
pub use session::WebDriverSession;
