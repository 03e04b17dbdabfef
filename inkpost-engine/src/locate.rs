//! First-visible-candidate element resolution.

use tracing::{debug, trace};

use crate::descriptor::ElementDescriptor;
use crate::driver::Driver;

/// Result of resolving a descriptor against the live document.
///
/// `NotFound` is a reportable condition, not a hard failure: callers decide
/// whether the element was mandatory.
#[derive(Debug)]
pub enum Resolution<E> {
    Found {
        element: E,
        /// Index into the descriptor's candidate list.
        candidate: usize,
    },
    NotFound,
}

impl<E> Resolution<E> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

/// Resolve `descriptor` to the first candidate that is present *and*
/// visible, in candidate order.
///
/// A candidate that exists but is not visible does not match; resolution
/// moves on rather than falling back to an invisible element. Driver errors
/// on one candidate count as a miss for that candidate only. Read-only: no
/// interaction with the document.
pub async fn resolve<D: Driver>(
    driver: &D,
    descriptor: &ElementDescriptor,
) -> Resolution<D::Element> {
    resolve_from(driver, descriptor, 0).await
}

/// Like [`resolve`], but starts from candidate index `start`. The
/// interaction chain uses this to advance past a candidate whose strategies
/// are exhausted.
pub async fn resolve_from<D: Driver>(
    driver: &D,
    descriptor: &ElementDescriptor,
    start: usize,
) -> Resolution<D::Element> {
    for (idx, selector) in descriptor.candidates().iter().enumerate().skip(start) {
        let element = match driver.find(selector).await {
            Ok(Some(el)) => el,
            Ok(None) => {
                trace!(target: "engine.locate", %selector, "candidate absent");
                continue;
            }
            Err(e) => {
                debug!(target: "engine.locate", %selector, error = %e, "candidate query failed");
                continue;
            }
        };

        match driver.is_visible(&element).await {
            Ok(true) => {
                debug!(
                    target: "engine.locate",
                    label = descriptor.label(),
                    %selector,
                    candidate = idx,
                    "resolved"
                );
                return Resolution::Found {
                    element,
                    candidate: idx,
                };
            }
            Ok(false) => {
                trace!(target: "engine.locate", %selector, "candidate present but not visible");
            }
            Err(e) => {
                debug!(target: "engine.locate", %selector, error = %e, "visibility check failed");
            }
        }
    }

    debug!(
        target: "engine.locate",
        label = descriptor.label(),
        "no candidate resolved to a visible element"
    );
    Resolution::NotFound
}
