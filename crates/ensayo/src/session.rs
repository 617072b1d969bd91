//! Browser session abstraction.
//!
//! A [`Session`] is one exclusively-owned browser handle: page-level
//! operations (navigate, screenshot, script execution, DOM serialization,
//! log retrieval) plus single-probe element primitives. Element primitives
//! never wait — the bounded poll loop lives in [`crate::proxy`], which calls
//! a probe repeatedly until its wait policy elapses.
//!
//! [`SimulatedSession`] is the in-memory implementation used by unit tests;
//! the real CDP-backed session lives in [`crate::browser`] behind the
//! `browser` feature.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::result::{EnsayoError, EnsayoResult};

/// Browser engine choice for session acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// Chromium-family browser (default)
    #[default]
    Chromium,
    /// Firefox
    Firefox,
}

impl Engine {
    /// Engine name as used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Engine {
    type Err = EnsayoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Self::Chromium),
            "firefox" => Ok(Self::Firefox),
            other => Err(EnsayoError::UnsupportedConfiguration {
                message: format!("unknown browser engine '{other}'"),
            }),
        }
    }
}

/// Configuration passed at session-acquisition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Which browser engine to drive
    pub engine: Engine,
    /// Suppress visible UI
    pub headless: bool,
    /// Viewport width and height
    pub viewport: (u32, u32),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Chromium,
            headless: true,
            viewport: (1920, 1080),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine.
    #[must_use]
    pub const fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Set headless mode.
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the viewport size.
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    /// Reject configurations no backend can honor.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::UnsupportedConfiguration`] for a zero-sized
    /// viewport.
    pub fn validate(&self) -> EnsayoResult<()> {
        let (w, h) = self.viewport;
        if w == 0 || h == 0 {
            return Err(EnsayoError::UnsupportedConfiguration {
                message: format!("viewport {w}x{h} must be non-zero"),
            });
        }
        Ok(())
    }
}

/// Log channel to read from a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChannel {
    /// Messages emitted by the page (console)
    Browser,
    /// Messages emitted by the automation backend itself
    Driver,
}

impl LogChannel {
    /// Channel name string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Driver => "driver",
        }
    }
}

/// One structured log line read from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity label as reported by the backend
    pub level: String,
    /// Log message
    pub message: String,
}

impl LogEntry {
    /// Create a log entry.
    #[must_use]
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
        }
    }
}

/// Snapshot of a matched DOM node at probe time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Locator description that matched the node
    pub id: String,
    /// Tag name, lowercase
    pub tag_name: String,
    /// Text content at probe time
    pub text: Option<String>,
    /// Whether the node was visible at probe time
    pub visible: bool,
}

impl ElementHandle {
    /// Create a handle.
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text: None,
            visible: false,
        }
    }
}

/// One live browser session: synchronous, blocking, exclusively owned.
///
/// Element primitives probe or act exactly once; they never wait. Waiting is
/// the proxy's job.
pub trait Session {
    /// Navigate to a URL.
    fn navigate(&mut self, url: &str) -> EnsayoResult<()>;

    /// Current page URL.
    fn current_url(&self) -> EnsayoResult<String>;

    /// Current page title.
    fn page_title(&self) -> EnsayoResult<String>;

    /// Execute a script in the page with positional arguments.
    fn execute_script(
        &mut self,
        script: &str,
        args: &[serde_json::Value],
    ) -> EnsayoResult<serde_json::Value>;

    /// Capture a PNG screenshot of the page.
    fn capture_screenshot(&mut self) -> EnsayoResult<Vec<u8>>;

    /// Serialize the current DOM to HTML.
    fn serialize_dom(&mut self) -> EnsayoResult<String>;

    /// Read buffered log entries for a channel.
    fn read_logs(&mut self, channel: LogChannel) -> EnsayoResult<Vec<LogEntry>>;

    /// Close the session. Must be idempotent; called again after success it
    /// returns `Ok(())`.
    fn close(&mut self) -> EnsayoResult<()>;

    /// Probe for the element right now. `None` when absent from the tree.
    fn query(&mut self, locator: &Locator) -> EnsayoResult<Option<ElementHandle>>;

    /// Whether the element is present and visible right now.
    fn is_visible(&mut self, locator: &Locator) -> EnsayoResult<bool>;

    /// Whether the element is visible and interactable right now.
    fn is_clickable(&mut self, locator: &Locator) -> EnsayoResult<bool>;

    /// Click the element once.
    fn click(&mut self, locator: &Locator) -> EnsayoResult<()>;

    /// Set the element's value, optionally clearing prior contents first.
    fn set_value(&mut self, locator: &Locator, text: &str, clear_first: bool) -> EnsayoResult<()>;

    /// Text content of the element.
    fn text_of(&mut self, locator: &Locator) -> EnsayoResult<String>;

    /// Attribute value, `None` when the attribute is absent.
    fn attribute_of(&mut self, locator: &Locator, name: &str) -> EnsayoResult<Option<String>>;

    /// Select a dropdown option by visible text.
    fn select_by_text(&mut self, locator: &Locator, option_text: &str) -> EnsayoResult<()>;

    /// Select a dropdown option by index.
    fn select_by_index(&mut self, locator: &Locator, index: usize) -> EnsayoResult<()>;

    /// Scroll the element into view.
    fn scroll_into_view(&mut self, locator: &Locator) -> EnsayoResult<()>;
}

/// Scoped session ownership: the wrapped session is closed when the guard
/// drops, on every exit path including panics.
#[derive(Debug)]
pub struct SessionGuard<S: Session> {
    inner: S,
}

impl<S: Session> SessionGuard<S> {
    /// Take ownership of a session.
    pub fn new(session: S) -> Self {
        Self { inner: session }
    }
}

impl<S: Session> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: Session> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Err(err) = self.inner.close() {
            tracing::warn!(error = %err, "session close failed during guard drop");
        }
    }
}

/// Acquires and releases browser sessions.
#[derive(Debug, Default)]
pub struct SessionManager;

impl SessionManager {
    /// Launch a CDP-backed session for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::UnsupportedConfiguration`] for a non-Chromium
    /// engine or an invalid viewport, and [`EnsayoError::Session`] when the
    /// browser cannot be launched.
    #[cfg(feature = "browser")]
    pub fn acquire(config: &SessionConfig) -> EnsayoResult<SessionGuard<crate::browser::CdpSession>> {
        config.validate()?;
        let session = crate::browser::CdpSession::launch(config)?;
        Ok(SessionGuard::new(session))
    }

    /// Release a session explicitly. Dropping the guard has the same effect.
    pub fn release<S: Session>(guard: SessionGuard<S>) {
        drop(guard);
    }
}

// ============================================================================
// Simulated session (in-memory page model)
// ============================================================================

/// One element in the simulated page model.
#[derive(Debug, Clone)]
pub struct SimElement {
    /// Tag name
    pub tag: String,
    /// Text content
    pub text: String,
    /// Attribute map; input values live under `"value"`
    pub attributes: HashMap<String, String>,
    /// Dropdown options, if any
    pub options: Vec<String>,
    /// Selected option index
    pub selected: Option<usize>,
    /// Whether the element renders
    pub visible: bool,
    /// Whether the element accepts interaction
    pub enabled: bool,
    appears_at: Option<Instant>,
    disappears_at: Option<Instant>,
}

impl SimElement {
    /// Create a visible, enabled element.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: String::new(),
            attributes: HashMap::new(),
            options: Vec::new(),
            selected: None,
            visible: true,
            enabled: true,
            appears_at: None,
            disappears_at: None,
        }
    }

    /// Set the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set dropdown options.
    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Mark the element hidden.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Mark the element disabled.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The element enters the tree only after the given delay from now.
    #[must_use]
    pub fn appearing_after(mut self, delay: Duration) -> Self {
        self.appears_at = Some(Instant::now() + delay);
        self
    }

    /// The element leaves the tree after the given delay from now.
    #[must_use]
    pub fn disappearing_after(mut self, delay: Duration) -> Self {
        self.disappears_at = Some(Instant::now() + delay);
        self
    }

    fn present_now(&self) -> bool {
        let now = Instant::now();
        self.appears_at.map_or(true, |t| now >= t) && self.disappears_at.map_or(true, |t| now < t)
    }
}

/// Mutable page state shared with scripted click effects.
#[derive(Debug, Default)]
pub struct PageModel {
    /// Current URL
    pub url: String,
    /// Page title
    pub title: String,
    /// Elements keyed by locator description
    pub elements: BTreeMap<String, SimElement>,
    /// Browser-channel log buffer
    pub logs: Vec<LogEntry>,
    /// Serialized DOM returned by `serialize_dom`
    pub dom: String,
}

impl PageModel {
    /// Look up an element by locator.
    #[must_use]
    pub fn element(&self, locator: &Locator) -> Option<&SimElement> {
        self.elements.get(&locator.to_string())
    }

    /// Mutable element lookup by locator.
    pub fn element_mut(&mut self, locator: &Locator) -> Option<&mut SimElement> {
        self.elements.get_mut(&locator.to_string())
    }

    /// Insert or replace an element.
    pub fn insert(&mut self, locator: &Locator, element: SimElement) {
        let _ = self.elements.insert(locator.to_string(), element);
    }

    /// Remove an element from the tree.
    pub fn remove(&mut self, locator: &Locator) {
        let _ = self.elements.remove(&locator.to_string());
    }
}

type ClickRule = Box<dyn FnMut(&mut PageModel)>;

/// In-memory [`Session`] backed by a small page model.
///
/// Unit-test backend: timed element appearance drives the wait-bound
/// properties, scripted click effects drive whole-page scenarios, and a
/// shared closed flag lets tests assert release on every exit path.
pub struct SimulatedSession {
    model: PageModel,
    click_rules: Vec<(String, ClickRule)>,
    script_results: VecDeque<serde_json::Value>,
    call_history: Vec<String>,
    screenshot: Vec<u8>,
    screenshot_supported: bool,
    logs_supported: bool,
    closed: Rc<Cell<bool>>,
}

impl std::fmt::Debug for SimulatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedSession")
            .field("url", &self.model.url)
            .field("elements", &self.model.elements.len())
            .field("closed", &self.closed.get())
            .finish_non_exhaustive()
    }
}

impl Default for SimulatedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSession {
    /// Create an empty simulated session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: PageModel {
                dom: "<html><body></body></html>".to_string(),
                ..PageModel::default()
            },
            click_rules: Vec::new(),
            script_results: VecDeque::new(),
            call_history: Vec::new(),
            screenshot: vec![0x89, 0x50, 0x4E, 0x47],
            screenshot_supported: true,
            logs_supported: true,
            closed: Rc::new(Cell::new(false)),
        }
    }

    /// Access the page model.
    #[must_use]
    pub fn model(&self) -> &PageModel {
        &self.model
    }

    /// Mutable access to the page model.
    pub fn model_mut(&mut self) -> &mut PageModel {
        &mut self.model
    }

    /// Set the page title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.model.title = title.into();
    }

    /// Set the serialized DOM.
    pub fn set_dom(&mut self, dom: impl Into<String>) {
        self.model.dom = dom.into();
    }

    /// Append a browser-channel log line.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.model.logs.push(entry);
    }

    /// Queue a result for the next `execute_script` call.
    pub fn push_script_result(&mut self, value: serde_json::Value) {
        self.script_results.push_back(value);
    }

    /// Register an effect that runs when the element is clicked.
    pub fn on_click<F>(&mut self, locator: &Locator, effect: F)
    where
        F: FnMut(&mut PageModel) + 'static,
    {
        self.click_rules.push((locator.to_string(), Box::new(effect)));
    }

    /// Make screenshot capture fail, to exercise best-effort evidence paths.
    pub fn fail_screenshots(&mut self) {
        self.screenshot_supported = false;
    }

    /// Make log retrieval fail, to exercise best-effort evidence paths.
    pub fn fail_logs(&mut self) {
        self.logs_supported = false;
    }

    /// Shared flag flipped when the session closes. Clone it out before
    /// handing the session over.
    #[must_use]
    pub fn closed_handle(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.closed)
    }

    /// Recorded calls, newest last.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Whether a call with the given prefix was recorded.
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(prefix))
    }

    fn live_element(&mut self, locator: &Locator) -> EnsayoResult<&mut SimElement> {
        let key = locator.to_string();
        match self.model.elements.get_mut(&key) {
            Some(el) if el.present_now() => Ok(el),
            _ => Err(EnsayoError::Session {
                message: format!("no such element: {key}"),
            }),
        }
    }
}

impl Session for SimulatedSession {
    fn navigate(&mut self, url: &str) -> EnsayoResult<()> {
        self.call_history.push(format!("navigate:{url}"));
        self.model.url = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> EnsayoResult<String> {
        Ok(self.model.url.clone())
    }

    fn page_title(&self) -> EnsayoResult<String> {
        Ok(self.model.title.clone())
    }

    fn execute_script(
        &mut self,
        script: &str,
        _args: &[serde_json::Value],
    ) -> EnsayoResult<serde_json::Value> {
        self.call_history.push(format!("script:{script}"));
        Ok(self.script_results.pop_front().unwrap_or(serde_json::Value::Null))
    }

    fn capture_screenshot(&mut self) -> EnsayoResult<Vec<u8>> {
        self.call_history.push("screenshot".to_string());
        if self.screenshot_supported {
            Ok(self.screenshot.clone())
        } else {
            Err(EnsayoError::Session {
                message: "screenshot capture not supported".to_string(),
            })
        }
    }

    fn serialize_dom(&mut self) -> EnsayoResult<String> {
        self.call_history.push("serialize_dom".to_string());
        Ok(self.model.dom.clone())
    }

    fn read_logs(&mut self, channel: LogChannel) -> EnsayoResult<Vec<LogEntry>> {
        self.call_history.push(format!("read_logs:{}", channel.as_str()));
        if !self.logs_supported {
            return Err(EnsayoError::Session {
                message: "log retrieval not supported".to_string(),
            });
        }
        match channel {
            LogChannel::Browser => Ok(self.model.logs.clone()),
            LogChannel::Driver => Ok(Vec::new()),
        }
    }

    fn close(&mut self) -> EnsayoResult<()> {
        self.call_history.push("close".to_string());
        self.closed.set(true);
        Ok(())
    }

    fn query(&mut self, locator: &Locator) -> EnsayoResult<Option<ElementHandle>> {
        let key = locator.to_string();
        Ok(self.model.elements.get(&key).and_then(|el| {
            if el.present_now() {
                Some(ElementHandle {
                    id: key.clone(),
                    tag_name: el.tag.clone(),
                    text: Some(el.text.clone()),
                    visible: el.visible,
                })
            } else {
                None
            }
        }))
    }

    fn is_visible(&mut self, locator: &Locator) -> EnsayoResult<bool> {
        Ok(self
            .model
            .element(locator)
            .is_some_and(|el| el.present_now() && el.visible))
    }

    fn is_clickable(&mut self, locator: &Locator) -> EnsayoResult<bool> {
        Ok(self
            .model
            .element(locator)
            .is_some_and(|el| el.present_now() && el.visible && el.enabled))
    }

    fn click(&mut self, locator: &Locator) -> EnsayoResult<()> {
        let key = locator.to_string();
        self.call_history.push(format!("click:{key}"));
        let _ = self.live_element(locator)?;

        // Rules are moved out while running so effects can mutate the model.
        let mut rules = std::mem::take(&mut self.click_rules);
        for (rule_key, effect) in &mut rules {
            if *rule_key == key {
                effect(&mut self.model);
            }
        }
        self.click_rules = rules;
        Ok(())
    }

    fn set_value(&mut self, locator: &Locator, text: &str, clear_first: bool) -> EnsayoResult<()> {
        self.call_history
            .push(format!("set_value:{locator}:{text}:{clear_first}"));
        let element = self.live_element(locator)?;
        let value = if clear_first {
            text.to_string()
        } else {
            let prior = element.attributes.get("value").cloned().unwrap_or_default();
            format!("{prior}{text}")
        };
        let _ = element.attributes.insert("value".to_string(), value);
        Ok(())
    }

    fn text_of(&mut self, locator: &Locator) -> EnsayoResult<String> {
        Ok(self.live_element(locator)?.text.clone())
    }

    fn attribute_of(&mut self, locator: &Locator, name: &str) -> EnsayoResult<Option<String>> {
        Ok(self.live_element(locator)?.attributes.get(name).cloned())
    }

    fn select_by_text(&mut self, locator: &Locator, option_text: &str) -> EnsayoResult<()> {
        self.call_history
            .push(format!("select_text:{locator}:{option_text}"));
        let element = self.live_element(locator)?;
        match element.options.iter().position(|o| o == option_text) {
            Some(index) => {
                element.selected = Some(index);
                Ok(())
            }
            None => Err(EnsayoError::Session {
                message: format!("no option '{option_text}' in {locator}"),
            }),
        }
    }

    fn select_by_index(&mut self, locator: &Locator, index: usize) -> EnsayoResult<()> {
        self.call_history
            .push(format!("select_index:{locator}:{index}"));
        let element = self.live_element(locator)?;
        if index >= element.options.len() {
            return Err(EnsayoError::Session {
                message: format!("option index {index} out of range for {locator}"),
            });
        }
        element.selected = Some(index);
        Ok(())
    }

    fn scroll_into_view(&mut self, locator: &Locator) -> EnsayoResult<()> {
        self.call_history.push(format!("scroll:{locator}"));
        let _ = self.live_element(locator)?;
        Ok(())
    }
}
