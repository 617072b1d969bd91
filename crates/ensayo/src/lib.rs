//! Ensayo: page-object browser test automation with bounded waits.
//!
//! Every interaction flows through an interactive element proxy that wraps
//! one exclusively-owned browser session. Hard operations wait for their
//! readiness condition within a fixed bound and capture failure evidence
//! (screenshot, DOM, browser logs) before returning a typed error; soft
//! queries wait the same way but answer `false` instead of failing. Page
//! objects compose around the proxy and expose intent-level operations, so
//! scenarios read as user behavior rather than selector plumbing.
//!
//! # Example
//!
//! ```
//! use ensayo::{
//!     Credentials, Locator, LoginPage, Proxy, SimElement, SimulatedSession, WaitPolicy,
//! };
//!
//! # fn main() -> ensayo::EnsayoResult<()> {
//! let mut session = SimulatedSession::new();
//! session.model_mut().insert(&Locator::id("login"), SimElement::new("form"));
//! session.model_mut().insert(&Locator::id("username"), SimElement::new("input"));
//! session.model_mut().insert(&Locator::id("password"), SimElement::new("input"));
//! session.model_mut().insert(
//!     &Locator::css("button[type='submit']"),
//!     SimElement::new("button"),
//! );
//!
//! let proxy = Proxy::new(session)
//!     .with_policy(WaitPolicy::new().with_timeout(500).with_poll_interval(10));
//! let login = LoginPage::new(&proxy, "https://the-internet.herokuapp.com");
//! login.open()?;
//! login.login(&Credentials::new("tomsmith", "SuperSecretPassword!"))?;
//! # Ok(())
//! # }
//! ```
//!
//! The `browser` feature adds [`browser::CdpSession`], a synchronous session
//! over a real Chromium via the Chrome `DevTools` Protocol.

#[cfg(feature = "browser")]
pub mod browser;
pub mod evidence;
pub mod fixture;
pub mod locator;
pub mod page;
pub mod proxy;
pub mod result;
pub mod session;
pub mod wait;

#[cfg(feature = "browser")]
pub use browser::CdpSession;
pub use evidence::{
    Attachment, EvidenceBundle, EvidenceSink, FsEvidenceSink, MediaKind, MemorySink,
};
pub use fixture::{Credentials, SuiteConfig, UserProfiles};
pub use locator::{Locator, Selector};
pub use page::{HomePage, LoginPage, SecureAreaPage};
pub use proxy::Proxy;
pub use result::{EnsayoError, EnsayoResult};
pub use session::{
    ElementHandle, Engine, LogChannel, LogEntry, PageModel, Session, SessionConfig, SessionGuard,
    SessionManager, SimElement, SimulatedSession,
};
pub use wait::{PollResult, WaitPolicy, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
