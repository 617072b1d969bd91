//! CDP-backed session via the Chrome `DevTools` Protocol.
//!
//! [`CdpSession`] drives a real Chromium through chromiumoxide while keeping
//! the crate's synchronous session contract: it owns a tokio runtime and
//! blocks on each protocol call. Element primitives are served by evaluating
//! the JavaScript snippets a [`Locator`] renders, so only script execution is
//! needed from the protocol.
//!
//! Only the Chromium engine has a CDP backend; requesting Firefox is an
//! unsupported configuration.

use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use tokio::runtime::Runtime;

use crate::locator::Locator;
use crate::result::{EnsayoError, EnsayoResult};
use crate::session::{ElementHandle, Engine, LogChannel, LogEntry, Session, SessionConfig};

/// Hook installed after navigation so browser-channel logs are readable
/// through script evaluation alone.
const CONSOLE_HOOK_JS: &str = "(() => { if (window.__console_capture) return; \
 window.__console_capture = []; \
 for (const level of ['log', 'info', 'warn', 'error']) { \
   const orig = console[level]; \
   console[level] = (...args) => { \
     window.__console_capture.push({ level, message: args.map(String).join(' ') }); \
     orig.apply(console, args); }; } })()";

/// Synchronous [`Session`] over a live Chromium instance.
pub struct CdpSession {
    runtime: Runtime,
    browser: Option<CdpBrowser>,
    page: CdpPage,
    url: String,
    driver_logs: Vec<LogEntry>,
}

impl std::fmt::Debug for CdpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpSession")
            .field("url", &self.url)
            .field("open", &self.browser.is_some())
            .finish_non_exhaustive()
    }
}

impl CdpSession {
    /// Launch a Chromium instance and open a blank page.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::UnsupportedConfiguration`] for a non-Chromium
    /// engine and [`EnsayoError::Session`] when the browser cannot start.
    pub fn launch(config: &SessionConfig) -> EnsayoResult<Self> {
        if config.engine != Engine::Chromium {
            return Err(EnsayoError::UnsupportedConfiguration {
                message: format!("engine '{}' has no CDP backend", config.engine),
            });
        }
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let mut builder = CdpConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        let (width, height) = config.viewport;
        builder = builder.window_size(width, height);

        let cdp_config = builder
            .build()
            .map_err(|message| EnsayoError::Session { message })?;

        let (browser, mut handler) = runtime
            .block_on(CdpBrowser::launch(cdp_config))
            .map_err(session_error)?;

        // Handler task drives the CDP connection for the browser's lifetime.
        let _handle = runtime.spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = runtime
            .block_on(browser.new_page("about:blank"))
            .map_err(session_error)?;

        tracing::info!(headless = config.headless, width, height, "browser launched");
        Ok(Self {
            runtime,
            browser: Some(browser),
            page,
            url: String::from("about:blank"),
            driver_logs: Vec::new(),
        })
    }

    fn eval(&mut self, script: &str) -> EnsayoResult<serde_json::Value> {
        let result = self
            .runtime
            .block_on(self.page.evaluate(script))
            .map_err(session_error)?;
        // Undefined and other non-JSON results read as null.
        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    fn eval_action(&mut self, script: &str, locator: &Locator) -> EnsayoResult<()> {
        match self.eval(script)? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(EnsayoError::Session {
                message: format!("no such element: {locator}"),
            }),
        }
    }
}

impl Session for CdpSession {
    fn navigate(&mut self, url: &str) -> EnsayoResult<()> {
        self.runtime
            .block_on(self.page.goto(url))
            .map_err(|err| EnsayoError::Navigation {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        self.url = url.to_string();
        self.driver_logs
            .push(LogEntry::new("INFO", format!("navigated to {url}")));
        // Console hook is per-document, so reinstall after every navigation.
        let _ = self.eval(CONSOLE_HOOK_JS)?;
        Ok(())
    }

    fn current_url(&self) -> EnsayoResult<String> {
        let live = self
            .runtime
            .block_on(self.page.url())
            .map_err(session_error)?;
        Ok(live.unwrap_or_else(|| self.url.clone()))
    }

    fn page_title(&self) -> EnsayoResult<String> {
        let title = self
            .runtime
            .block_on(self.page.get_title())
            .map_err(session_error)?;
        Ok(title.unwrap_or_default())
    }

    fn execute_script(
        &mut self,
        script: &str,
        args: &[serde_json::Value],
    ) -> EnsayoResult<serde_json::Value> {
        if args.is_empty() {
            self.eval(script)
        } else {
            let bound = format!(
                "(() => {{ const args = {json}; return ({script}); }})()",
                json = serde_json::to_string(args)?
            );
            self.eval(&bound)
        }
    }

    fn capture_screenshot(&mut self) -> EnsayoResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot = self
            .runtime
            .block_on(self.page.execute(params))
            .map_err(session_error)?;

        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|err| EnsayoError::Session {
                message: err.to_string(),
            })
    }

    fn serialize_dom(&mut self) -> EnsayoResult<String> {
        match self.eval("document.documentElement.outerHTML")? {
            serde_json::Value::String(html) => Ok(html),
            other => Err(EnsayoError::Session {
                message: format!("DOM serialization returned {other}"),
            }),
        }
    }

    fn read_logs(&mut self, channel: LogChannel) -> EnsayoResult<Vec<LogEntry>> {
        match channel {
            LogChannel::Driver => Ok(self.driver_logs.clone()),
            LogChannel::Browser => {
                let value = self.eval("window.__console_capture || []")?;
                Ok(serde_json::from_value(value)?)
            }
        }
    }

    fn close(&mut self) -> EnsayoResult<()> {
        if let Some(mut browser) = self.browser.take() {
            self.runtime
                .block_on(browser.close())
                .map_err(session_error)?;
            tracing::info!("browser closed");
        }
        Ok(())
    }

    fn query(&mut self, locator: &Locator) -> EnsayoResult<Option<ElementHandle>> {
        let probe = self.eval(&locator.probe_js())?;
        if probe.get("found").and_then(serde_json::Value::as_bool) != Some(true) {
            return Ok(None);
        }
        Ok(Some(ElementHandle {
            id: locator.to_string(),
            tag_name: probe
                .get("tag")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            text: probe
                .get("text")
                .and_then(serde_json::Value::as_str)
                .map(String::from),
            visible: probe
                .get("visible")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
        }))
    }

    fn is_visible(&mut self, locator: &Locator) -> EnsayoResult<bool> {
        Ok(self.eval(&locator.visibility_js())? == serde_json::Value::Bool(true))
    }

    fn is_clickable(&mut self, locator: &Locator) -> EnsayoResult<bool> {
        Ok(self.eval(&locator.clickable_js())? == serde_json::Value::Bool(true))
    }

    fn click(&mut self, locator: &Locator) -> EnsayoResult<()> {
        let script = locator.click_js();
        self.eval_action(&script, locator)
    }

    fn set_value(&mut self, locator: &Locator, text: &str, clear_first: bool) -> EnsayoResult<()> {
        let script = locator.set_value_js(text, clear_first);
        self.eval_action(&script, locator)
    }

    fn text_of(&mut self, locator: &Locator) -> EnsayoResult<String> {
        match self.eval(&locator.text_js())? {
            serde_json::Value::String(text) => Ok(text),
            _ => Err(EnsayoError::Session {
                message: format!("no such element: {locator}"),
            }),
        }
    }

    fn attribute_of(&mut self, locator: &Locator, name: &str) -> EnsayoResult<Option<String>> {
        match self.eval(&locator.attribute_js(name))? {
            serde_json::Value::String(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    fn select_by_text(&mut self, locator: &Locator, option_text: &str) -> EnsayoResult<()> {
        let script = locator.select_by_text_js(option_text);
        match self.eval(&script)? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(EnsayoError::Session {
                message: format!("no option '{option_text}' in {locator}"),
            }),
        }
    }

    fn select_by_index(&mut self, locator: &Locator, index: usize) -> EnsayoResult<()> {
        let script = locator.select_by_index_js(index);
        match self.eval(&script)? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(EnsayoError::Session {
                message: format!("option index {index} out of range for {locator}"),
            }),
        }
    }

    fn scroll_into_view(&mut self, locator: &Locator) -> EnsayoResult<()> {
        let script = locator.scroll_js();
        self.eval_action(&script, locator)
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, "browser close failed during drop");
        }
    }
}

fn session_error(err: impl std::fmt::Display) -> EnsayoError {
    EnsayoError::Session {
        message: err.to_string(),
    }
}
