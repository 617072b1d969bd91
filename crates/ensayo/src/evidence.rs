//! Failure evidence capture and attachment.
//!
//! When a hard operation times out, the proxy captures an [`EvidenceBundle`]
//! from the live session before returning the typed error: screenshot,
//! serialized DOM, and browser logs. Capture is best-effort — a piece that
//! cannot be captured is logged and skipped, never allowed to mask the
//! original failure. A bundle flushes to an [`EvidenceSink`] exactly once.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::result::{EnsayoError, EnsayoResult};
use crate::session::{LogChannel, LogEntry, Session};

/// Media type of an evidence attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// PNG image
    Png,
    /// HTML document
    Html,
    /// Plain text
    Text,
}

impl MediaKind {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Html => "html",
            Self::Text => "txt",
        }
    }

    /// MIME type string.
    #[must_use]
    pub const fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Html => "text/html",
            Self::Text => "text/plain",
        }
    }
}

/// Destination for evidence attachments.
pub trait EvidenceSink {
    /// Record one named attachment.
    fn attach(&mut self, name: &str, kind: MediaKind, bytes: &[u8]) -> EnsayoResult<()>;
}

impl<T: EvidenceSink> EvidenceSink for std::rc::Rc<std::cell::RefCell<T>> {
    fn attach(&mut self, name: &str, kind: MediaKind, bytes: &[u8]) -> EnsayoResult<()> {
        self.borrow_mut().attach(name, kind, bytes)
    }
}

/// One recorded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment name
    pub name: String,
    /// Media type
    pub kind: MediaKind,
    /// Raw content
    pub bytes: Vec<u8>,
}

/// In-memory sink for tests and report assembly.
#[derive(Debug, Default)]
pub struct MemorySink {
    attachments: Vec<Attachment>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded attachments in arrival order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Find an attachment by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.name == name)
    }
}

impl EvidenceSink for MemorySink {
    fn attach(&mut self, name: &str, kind: MediaKind, bytes: &[u8]) -> EnsayoResult<()> {
        self.attachments.push(Attachment {
            name: name.to_string(),
            kind,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

/// Filesystem sink: each attachment becomes a timestamped file in one
/// directory, created on first write.
#[derive(Debug)]
pub struct FsEvidenceSink {
    dir: PathBuf,
}

impl FsEvidenceSink {
    /// Create a sink rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory attachments are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl EvidenceSink for FsEvidenceSink {
    fn attach(&mut self, name: &str, kind: MediaKind, bytes: &[u8]) -> EnsayoResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let path = self
            .dir
            .join(format!("{stamp}_{name}.{ext}", ext = kind.extension()));
        let mut file = std::fs::File::create(&path)?;
        file.write_all(bytes)?;
        tracing::debug!(path = %path.display(), "evidence attachment written");
        Ok(())
    }
}

/// Everything captured from a session at the moment of failure.
#[derive(Debug)]
pub struct EvidenceBundle {
    /// Unique bundle id
    pub id: Uuid,
    /// Description of the failure that triggered capture
    pub failure: String,
    /// Capture time
    pub captured_at: DateTime<Utc>,
    /// Page URL, if readable
    pub url: Option<String>,
    /// PNG screenshot, if capture succeeded
    pub screenshot: Option<Vec<u8>>,
    /// Serialized DOM, if capture succeeded
    pub dom: Option<String>,
    /// Browser-channel logs, if retrieval succeeded
    pub browser_logs: Option<Vec<LogEntry>>,
    flushed: bool,
}

impl EvidenceBundle {
    /// Capture a bundle from a live session. Each piece is attempted
    /// independently; pieces that fail are logged and omitted, so capture
    /// itself never errors.
    pub fn capture<S: Session + ?Sized>(session: &mut S, failure: impl Into<String>) -> Self {
        let failure = failure.into();
        let id = Uuid::new_v4();
        tracing::warn!(%id, %failure, "capturing failure evidence");

        let url = match session.current_url() {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(error = %err, "could not read URL for evidence");
                None
            }
        };
        let screenshot = match session.capture_screenshot() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::warn!(error = %err, "could not capture screenshot for evidence");
                None
            }
        };
        let dom = match session.serialize_dom() {
            Ok(html) => Some(html),
            Err(err) => {
                tracing::warn!(error = %err, "could not serialize DOM for evidence");
                None
            }
        };
        let browser_logs = match session.read_logs(LogChannel::Browser) {
            Ok(entries) => Some(entries),
            Err(err) => {
                tracing::warn!(error = %err, "could not read browser logs for evidence");
                None
            }
        };

        Self {
            id,
            failure,
            captured_at: Utc::now(),
            url,
            screenshot,
            dom,
            browser_logs,
            flushed: false,
        }
    }

    /// Whether anything was captured at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.screenshot.is_none() && self.dom.is_none() && self.browser_logs.is_none()
    }

    /// Write every captured piece to the sink. A second flush is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::Evidence`] when the sink rejects an attachment.
    pub fn flush(&mut self, sink: &mut dyn EvidenceSink) -> EnsayoResult<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;

        let prefix = format!("failure_{id}", id = self.id.simple());
        if let Some(png) = &self.screenshot {
            sink.attach(&format!("{prefix}_screenshot"), MediaKind::Png, png)
                .map_err(attach_error)?;
        }
        if let Some(html) = &self.dom {
            sink.attach(&format!("{prefix}_page"), MediaKind::Html, html.as_bytes())
                .map_err(attach_error)?;
        }
        if let Some(entries) = &self.browser_logs {
            let text = entries
                .iter()
                .map(|e| format!("[{}] {}", e.level, e.message))
                .collect::<Vec<_>>()
                .join("\n");
            sink.attach(&format!("{prefix}_logs"), MediaKind::Text, text.as_bytes())
                .map_err(attach_error)?;
        }
        Ok(())
    }

    /// Render a single self-contained HTML report: failure description,
    /// inlined screenshot, DOM source, and browser logs.
    #[must_use]
    pub fn to_html_report(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>Failure {}</title>\n</head>\n<body>\n", self.id));
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&self.failure)));
        html.push_str(&format!(
            "<p>Captured at {} (bundle {})</p>\n",
            self.captured_at.to_rfc3339(),
            self.id
        ));
        if let Some(url) = &self.url {
            html.push_str(&format!("<p>URL: <code>{}</code></p>\n", escape_html(url)));
        }
        if let Some(png) = &self.screenshot {
            let encoded = base64::engine::general_purpose::STANDARD.encode(png);
            html.push_str(&format!(
                "<h2>Screenshot</h2>\n<img src=\"data:image/png;base64,{encoded}\" alt=\"failure screenshot\">\n"
            ));
        }
        if let Some(entries) = &self.browser_logs {
            html.push_str("<h2>Browser logs</h2>\n<ul>\n");
            for entry in entries {
                html.push_str(&format!(
                    "<li><b>{}</b> {}</li>\n",
                    escape_html(&entry.level),
                    escape_html(&entry.message)
                ));
            }
            html.push_str("</ul>\n");
        }
        if let Some(dom) = &self.dom {
            html.push_str(&format!(
                "<h2>Page source</h2>\n<pre>{}</pre>\n",
                escape_html(dom)
            ));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn attach_error(err: EnsayoError) -> EnsayoError {
    EnsayoError::Evidence {
        message: err.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SimulatedSession;

    mod capture_tests {
        use super::*;

        #[test]
        fn test_capture_collects_all_pieces() {
            let mut session = SimulatedSession::new();
            session.navigate("https://example.com/login").unwrap();
            session.set_dom("<html><body>login</body></html>");
            session.push_log(LogEntry::new("SEVERE", "boom"));

            let bundle = EvidenceBundle::capture(&mut session, "element id=x not found");
            assert_eq!(bundle.url.as_deref(), Some("https://example.com/login"));
            assert!(bundle.screenshot.is_some());
            assert_eq!(
                bundle.dom.as_deref(),
                Some("<html><body>login</body></html>")
            );
            assert_eq!(bundle.browser_logs.as_ref().map(Vec::len), Some(1));
            assert!(!bundle.is_empty());
        }

        #[test]
        fn test_capture_is_best_effort() {
            let mut session = SimulatedSession::new();
            session.fail_screenshots();
            session.fail_logs();

            let bundle = EvidenceBundle::capture(&mut session, "timeout");
            assert!(bundle.screenshot.is_none());
            assert!(bundle.browser_logs.is_none());
            // DOM still captured
            assert!(bundle.dom.is_some());
        }
    }

    mod flush_tests {
        use super::*;

        #[test]
        fn test_flush_writes_each_piece() {
            let mut session = SimulatedSession::new();
            session.push_log(LogEntry::new("INFO", "ready"));
            let mut bundle = EvidenceBundle::capture(&mut session, "timeout");

            let mut sink = MemorySink::new();
            bundle.flush(&mut sink).unwrap();
            assert_eq!(sink.attachments().len(), 3);
            assert!(sink
                .attachments()
                .iter()
                .any(|a| a.kind == MediaKind::Png));
        }

        #[test]
        fn test_second_flush_is_noop() {
            let mut session = SimulatedSession::new();
            let mut bundle = EvidenceBundle::capture(&mut session, "timeout");

            let mut sink = MemorySink::new();
            bundle.flush(&mut sink).unwrap();
            let first = sink.attachments().len();
            bundle.flush(&mut sink).unwrap();
            assert_eq!(sink.attachments().len(), first);
        }

        #[test]
        fn test_fs_sink_creates_files() {
            let dir = tempfile::tempdir().unwrap();
            let mut session = SimulatedSession::new();
            let mut bundle = EvidenceBundle::capture(&mut session, "timeout");

            let mut sink = FsEvidenceSink::new(dir.path().join("evidence"));
            bundle.flush(&mut sink).unwrap();

            let written: Vec<_> = std::fs::read_dir(dir.path().join("evidence"))
                .unwrap()
                .collect();
            assert!(!written.is_empty());
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_html_report_inlines_screenshot() {
            let mut session = SimulatedSession::new();
            let bundle = EvidenceBundle::capture(&mut session, "element not found");
            let report = bundle.to_html_report();
            assert!(report.contains("data:image/png;base64,"));
            assert!(report.contains("element not found"));
        }

        #[test]
        fn test_html_report_escapes_markup() {
            let mut session = SimulatedSession::new();
            session.set_dom("<script>alert(1)</script>");
            let bundle = EvidenceBundle::capture(&mut session, "<timeout>");
            let report = bundle.to_html_report();
            assert!(report.contains("&lt;script&gt;"));
            assert!(report.contains("&lt;timeout&gt;"));
        }
    }
}
