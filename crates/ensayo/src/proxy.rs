//! Interactive element proxy: bounded waits around session primitives.
//!
//! Every page interaction in the suite flows through a [`Proxy`]. Hard
//! operations wait for their readiness condition, act, and on timeout capture
//! failure evidence before returning a typed error. Soft operations wait the
//! same way but report timeout as `false` and never fail the caller.
//!
//! The proxy owns its session exclusively and closes it on drop, so the
//! browser is released on every exit path, panics included.

use std::cell::{Ref, RefCell, RefMut};

use crate::evidence::{EvidenceBundle, EvidenceSink, MemorySink};
use crate::locator::Locator;
use crate::result::{EnsayoError, EnsayoResult};
use crate::session::{ElementHandle, Session};
use crate::wait::{poll_until, WaitPolicy};

/// Bounded-wait wrapper around one exclusively-owned [`Session`].
pub struct Proxy<S: Session> {
    session: RefCell<S>,
    policy: WaitPolicy,
    sink: RefCell<Box<dyn EvidenceSink>>,
}

impl<S: Session> std::fmt::Debug for Proxy<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<S: Session> Proxy<S> {
    /// Take ownership of a session with the default wait policy and an
    /// in-memory evidence sink.
    pub fn new(session: S) -> Self {
        Self {
            session: RefCell::new(session),
            policy: WaitPolicy::default(),
            sink: RefCell::new(Box::new(MemorySink::new())),
        }
    }

    /// Set the wait policy. Fixed for the proxy's lifetime afterwards.
    #[must_use]
    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the evidence sink failures flush to.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn EvidenceSink>) -> Self {
        self.sink = RefCell::new(sink);
        self
    }

    /// The wait policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Borrow the underlying session.
    pub fn session(&self) -> Ref<'_, S> {
        self.session.borrow()
    }

    /// Mutably borrow the underlying session.
    pub fn session_mut(&self) -> RefMut<'_, S> {
        self.session.borrow_mut()
    }

    // ------------------------------------------------------------------
    // Hard operations: wait, act, evidence + typed error on timeout
    // ------------------------------------------------------------------

    /// Wait for the element to be present and return its handle.
    ///
    /// # Errors
    ///
    /// [`EnsayoError::NotFoundWithinTimeout`] when the element never appears
    /// within the wait bound; session errors propagate as-is.
    pub fn locate(&self, locator: &Locator) -> EnsayoResult<ElementHandle> {
        tracing::debug!(%locator, "locate");
        let mut found: Option<ElementHandle> = None;
        let result = poll_until(&self.policy, || {
            found = self.session.borrow_mut().query(locator)?;
            Ok(found.is_some())
        })?;

        match found {
            Some(handle) => {
                tracing::debug!(%locator, elapsed_ms = result.elapsed.as_millis() as u64, "located");
                Ok(handle)
            }
            None => Err(self.timeout_failure(EnsayoError::NotFoundWithinTimeout {
                locator: locator.to_string(),
                timeout_ms: self.policy.timeout_ms,
            })),
        }
    }

    /// Wait for the element to be clickable, then click it once.
    ///
    /// # Errors
    ///
    /// [`EnsayoError::NotClickableWithinTimeout`] when the element never
    /// becomes interactable within the wait bound.
    pub fn click_when_ready(&self, locator: &Locator) -> EnsayoResult<()> {
        tracing::debug!(%locator, "click");
        let result = poll_until(&self.policy, || {
            self.session.borrow_mut().is_clickable(locator)
        })?;

        if !result.satisfied {
            return Err(self.timeout_failure(EnsayoError::NotClickableWithinTimeout {
                locator: locator.to_string(),
                timeout_ms: self.policy.timeout_ms,
            }));
        }
        self.session.borrow_mut().click(locator)
    }

    /// Wait for the element, then set its value. `clear_first` replaces the
    /// prior contents; otherwise text is appended.
    ///
    /// # Errors
    ///
    /// [`EnsayoError::NotFoundWithinTimeout`] when the element never appears.
    pub fn set_text(&self, locator: &Locator, text: &str, clear_first: bool) -> EnsayoResult<()> {
        let _ = self.locate(locator)?;
        self.session.borrow_mut().set_value(locator, text, clear_first)
    }

    /// Wait for the element, then read its text content.
    ///
    /// # Errors
    ///
    /// [`EnsayoError::NotFoundWithinTimeout`] when the element never appears.
    pub fn read_text(&self, locator: &Locator) -> EnsayoResult<String> {
        let _ = self.locate(locator)?;
        self.session.borrow_mut().text_of(locator)
    }

    /// Wait for the element, then read an attribute. `None` means the element
    /// exists but carries no such attribute.
    ///
    /// # Errors
    ///
    /// [`EnsayoError::NotFoundWithinTimeout`] when the element never appears.
    pub fn read_attribute(&self, locator: &Locator, name: &str) -> EnsayoResult<Option<String>> {
        let _ = self.locate(locator)?;
        self.session.borrow_mut().attribute_of(locator, name)
    }

    /// Wait for the dropdown, then select an option by visible text.
    ///
    /// # Errors
    ///
    /// [`EnsayoError::NotFoundWithinTimeout`] when the dropdown never appears;
    /// [`EnsayoError::Session`] when the option does not exist.
    pub fn select_option_by_text(&self, locator: &Locator, option_text: &str) -> EnsayoResult<()> {
        let _ = self.locate(locator)?;
        self.session.borrow_mut().select_by_text(locator, option_text)
    }

    /// Wait for the dropdown, then select an option by index.
    ///
    /// # Errors
    ///
    /// [`EnsayoError::NotFoundWithinTimeout`] when the dropdown never appears;
    /// [`EnsayoError::Session`] when the index is out of range.
    pub fn select_option_by_index(&self, locator: &Locator, index: usize) -> EnsayoResult<()> {
        let _ = self.locate(locator)?;
        self.session.borrow_mut().select_by_index(locator, index)
    }

    /// Wait for the element, then scroll it into view.
    ///
    /// # Errors
    ///
    /// [`EnsayoError::NotFoundWithinTimeout`] when the element never appears.
    pub fn scroll_to_element(&self, locator: &Locator) -> EnsayoResult<()> {
        let _ = self.locate(locator)?;
        self.session.borrow_mut().scroll_into_view(locator)
    }

    // ------------------------------------------------------------------
    // Soft operations: bounded wait, boolean answer, never an error
    // ------------------------------------------------------------------

    /// Wait for the element to become visible. Timeout and session failures
    /// both answer `false`.
    pub fn is_visible(&self, locator: &Locator) -> bool {
        self.soft_wait(|session| session.is_visible(locator))
    }

    /// Whether the element is in the tree right now. Single probe, no wait;
    /// session failures answer `false`.
    pub fn is_present(&self, locator: &Locator) -> bool {
        self.session
            .borrow_mut()
            .query(locator)
            .map(|handle| handle.is_some())
            .unwrap_or(false)
    }

    /// Wait for the element to leave the tree. `true` once it is gone,
    /// `false` when it is still present at the bound.
    pub fn wait_for_disappearance(&self, locator: &Locator) -> bool {
        self.soft_wait(|session| Ok(session.query(locator)?.is_none()))
    }

    fn soft_wait<F>(&self, mut probe: F) -> bool
    where
        F: FnMut(&mut S) -> EnsayoResult<bool>,
    {
        let result = poll_until(&self.policy, || {
            let mut session = self.session.borrow_mut();
            Ok(probe(&mut session).unwrap_or(false))
        });
        match result {
            Ok(outcome) => outcome.satisfied,
            Err(_) => false,
        }
    }

    // ------------------------------------------------------------------
    // Page-level passthroughs
    // ------------------------------------------------------------------

    /// Navigate the session to a URL.
    ///
    /// # Errors
    ///
    /// Propagates session navigation failures.
    pub fn navigate(&self, url: &str) -> EnsayoResult<()> {
        tracing::debug!(url, "navigate");
        self.session.borrow_mut().navigate(url)
    }

    /// Current page URL.
    ///
    /// # Errors
    ///
    /// Propagates session failures.
    pub fn current_url(&self) -> EnsayoResult<String> {
        self.session.borrow().current_url()
    }

    /// Current page title.
    ///
    /// # Errors
    ///
    /// Propagates session failures.
    pub fn page_title(&self) -> EnsayoResult<String> {
        self.session.borrow().page_title()
    }

    /// Execute a script in the page.
    ///
    /// # Errors
    ///
    /// Propagates session failures.
    pub fn execute_script(
        &self,
        script: &str,
        args: &[serde_json::Value],
    ) -> EnsayoResult<serde_json::Value> {
        self.session.borrow_mut().execute_script(script, args)
    }

    /// Capture a PNG screenshot of the current page.
    ///
    /// # Errors
    ///
    /// Propagates session failures.
    pub fn take_screenshot(&self) -> EnsayoResult<Vec<u8>> {
        self.session.borrow_mut().capture_screenshot()
    }

    /// Capture a screenshot and attach it to the evidence sink under the
    /// given name. For deliberate captures outside the failure path.
    ///
    /// # Errors
    ///
    /// Propagates capture failures; [`EnsayoError::Evidence`] when the sink
    /// rejects the attachment.
    pub fn save_screenshot(&self, name: &str) -> EnsayoResult<()> {
        let png = self.take_screenshot()?;
        self.sink
            .borrow_mut()
            .attach(name, crate::evidence::MediaKind::Png, &png)
            .map_err(|err| EnsayoError::Evidence {
                message: err.to_string(),
            })
    }

    // ------------------------------------------------------------------

    /// Capture and flush evidence for a timeout, then hand the error back.
    fn timeout_failure(&self, error: EnsayoError) -> EnsayoError {
        tracing::warn!(%error, "bounded wait elapsed");
        let mut bundle = {
            let mut session = self.session.borrow_mut();
            EvidenceBundle::capture(&mut *session, error.to_string())
        };
        let mut sink = self.sink.borrow_mut();
        if let Err(flush_err) = bundle.flush(sink.as_mut()) {
            tracing::warn!(error = %flush_err, "evidence flush failed");
        }
        error
    }
}

impl<S: Session> Drop for Proxy<S> {
    fn drop(&mut self) {
        if let Err(err) = self.session.get_mut().close() {
            tracing::warn!(error = %err, "session close failed during proxy drop");
        }
    }
}
