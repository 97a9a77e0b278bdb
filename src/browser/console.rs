//! Console and log capture.
//!
//! [`ConsoleCapture`] enables the `Runtime` and `Log` domains on a target
//! and records what the target prints:
//!
//! | Event | Entry kind | Level |
//! |-------|------------|-------|
//! | `Runtime.consoleAPICalled` | [`EntryKind::Console`] | call type (`log`, `warning`, `error`, ...) |
//! | `Runtime.exceptionThrown` | [`EntryKind::Exception`] | `error` |
//! | `Log.entryAdded` | [`EntryKind::Log`] | entry level |
//!
//! Entries can also be appended to a log file, one line per entry:
//!
//! ```text
//! [1718900000.123] [content] ERROR: Uncaught TypeError: x is undefined
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::{Command, Event, LogCommand, ParsedEvent, RuntimeCommand};
use crate::transport::Connection;

use super::wait::{WaitOptions, poll_until};

// ============================================================================
// ConsoleEntry
// ============================================================================

/// Source of a console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// `console.*` call.
    Console,
    /// Uncaught exception.
    Exception,
    /// Browser log entry.
    Log,
}

/// One captured console line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleEntry {
    /// Label of the capture that recorded the entry.
    pub label: String,
    /// Entry source.
    pub kind: EntryKind,
    /// Level or call type, lowercase.
    pub level: String,
    /// Rendered text.
    pub text: String,
    /// Wall-clock time in milliseconds since the epoch.
    pub timestamp: f64,
}

impl ConsoleEntry {
    /// Builds an entry from a console-related event.
    ///
    /// Returns `None` for other events.
    #[must_use]
    pub fn from_event(label: &str, event: &Event) -> Option<Self> {
        let (kind, level, text, timestamp) = match event.parse() {
            ParsedEvent::RuntimeConsoleApiCalled {
                kind,
                args,
                timestamp,
            } => (EntryKind::Console, kind, args.join(" "), timestamp),
            ParsedEvent::RuntimeExceptionThrown {
                text,
                description,
                timestamp,
            } => {
                let text = match description {
                    Some(description) => format!("{text} {description}"),
                    None => text,
                };
                (EntryKind::Exception, "error".to_string(), text, timestamp)
            }
            ParsedEvent::LogEntryAdded {
                level,
                text,
                timestamp,
                ..
            } => (EntryKind::Log, level, text, timestamp),
            _ => return None,
        };

        Some(Self {
            label: label.to_string(),
            kind,
            level,
            text,
            timestamp,
        })
    }

    /// Returns `true` for errors, failed assertions and exceptions.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == EntryKind::Exception || matches!(self.level.as_str(), "error" | "assert")
    }
}

impl fmt::Display for ConsoleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}] [{}] {}: {}",
            self.timestamp / 1000.0,
            self.label,
            self.level.to_uppercase(),
            self.text
        )
    }
}

// ============================================================================
// ConsoleCapture
// ============================================================================

/// Records console output of one target in the background.
///
/// Capture stops when the connection closes or the capture is dropped.
pub struct ConsoleCapture {
    label: String,
    entries: Arc<Mutex<Vec<ConsoleEntry>>>,
    task: JoinHandle<()>,
}

impl fmt::Debug for ConsoleCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleCapture")
            .field("label", &self.label)
            .field("entries", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl ConsoleCapture {
    /// Starts capturing console output of `connection`.
    ///
    /// When `log_file` is given, entries are appended to it as they arrive.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`](crate::Error::Io) if the log file cannot be opened
    /// - Any error from enabling the `Runtime` or `Log` domains
    pub async fn start(
        connection: &Connection,
        label: impl Into<String>,
        log_file: Option<&Path>,
    ) -> Result<Self> {
        let label = label.into();

        let file = match log_file {
            Some(path) => Some(open_log(path).await?),
            None => None,
        };

        // Listen before enabling so buffered messages replayed on enable are kept.
        let events = connection.event_stream();
        connection
            .execute(Command::Runtime(RuntimeCommand::Enable))
            .await?;
        connection.execute(Command::Log(LogCommand::Enable)).await?;

        let entries = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(Self::run(
            label.clone(),
            events,
            Arc::clone(&entries),
            file,
        ));

        debug!(%label, url = connection.url(), "Console capture started");

        Ok(Self {
            label,
            entries,
            task,
        })
    }

    /// Returns the capture label.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns a copy of every entry recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<ConsoleEntry> {
        self.entries.lock().clone()
    }

    /// Returns the error entries recorded so far.
    #[must_use]
    pub fn errors(&self) -> Vec<ConsoleEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.is_error())
            .cloned()
            .collect()
    }

    /// Discards recorded entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Waits until an entry whose text contains `needle` is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitTimeout`](crate::Error::WaitTimeout) if none arrives.
    pub async fn wait_for_message(&self, needle: &str, options: WaitOptions) -> Result<ConsoleEntry> {
        poll_until(
            &format!("console message containing {needle:?}"),
            || {
                let found = self
                    .entries
                    .lock()
                    .iter()
                    .find(|entry| entry.text.contains(needle))
                    .cloned();
                async move { Ok(found) }
            },
            options,
        )
        .await
    }

    /// Stops capturing and returns the recorded entries.
    pub fn stop(self) -> Vec<ConsoleEntry> {
        self.task.abort();
        self.entries()
    }

    async fn run(
        label: String,
        mut events: mpsc::UnboundedReceiver<Event>,
        entries: Arc<Mutex<Vec<ConsoleEntry>>>,
        mut file: Option<File>,
    ) {
        while let Some(event) = events.recv().await {
            let Some(entry) = ConsoleEntry::from_event(&label, &event) else {
                continue;
            };

            if let Some(out) = file.as_mut() {
                let line = format!("{entry}\n");
                if let Err(e) = out.write_all(line.as_bytes()).await {
                    warn!(%label, error = %e, "Console log write failed, disabling file output");
                    file = None;
                } else {
                    let _ = out.flush().await;
                }
            }

            entries.lock().push(entry);
        }

        debug!(%label, "Console capture ended");
    }
}

impl Drop for ConsoleCapture {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn open_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(file)
}

/// Default log file for a capture label inside `dir`.
#[must_use]
pub fn log_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("{label}.log"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    use crate::transport::{MockTarget, mock_event};

    fn console_events() -> Vec<serde_json::Value> {
        vec![
            mock_event(
                "Runtime.consoleAPICalled",
                json!({
                    "type": "log",
                    "args": [{"type": "string", "value": "hints"}, {"type": "number", "value": 3}],
                    "timestamp": 1_718_900_000_123.0
                }),
            ),
            mock_event(
                "Runtime.exceptionThrown",
                json!({
                    "timestamp": 1_718_900_000_500.0,
                    "exceptionDetails": {
                        "text": "Uncaught",
                        "exception": {"type": "object", "description": "TypeError: x is undefined"}
                    }
                }),
            ),
            mock_event(
                "Log.entryAdded",
                json!({"entry": {"source": "network", "level": "warning", "text": "slow", "timestamp": 1.0}}),
            ),
            mock_event("Page.loadEventFired", json!({"timestamp": 1.0})),
        ]
    }

    /// Emits the console events right after `Log.enable` is answered.
    async fn chatty_target() -> Connection {
        let target = MockTarget::bind().await.expect("bind");
        let url = target.ws_url();
        let _server = target.serve(|request| {
            let mut frames = vec![request.reply(json!({}))];
            if request.method == "Log.enable" {
                frames.extend(console_events());
            }
            frames
        });
        Connection::connect(&url).await.expect("connect")
    }

    fn fast() -> WaitOptions {
        WaitOptions::new(Duration::from_secs(2), Duration::from_millis(10))
    }

    #[test]
    fn test_entry_line_format() {
        let entry = ConsoleEntry {
            label: "content".into(),
            kind: EntryKind::Console,
            level: "warning".into(),
            text: "careful".into(),
            timestamp: 1_718_900_000_123.0,
        };
        assert_eq!(entry.to_string(), "[1718900000.123] [content] WARNING: careful");
        assert!(!entry.is_error());
    }

    #[test]
    fn test_from_event_ignores_other_events() {
        let event = Event::new("Page.loadEventFired", json!({}));
        assert!(ConsoleEntry::from_event("x", &event).is_none());
    }

    #[tokio::test]
    async fn test_capture_records_entries() {
        let connection = chatty_target().await;
        let capture = ConsoleCapture::start(&connection, "content", None)
            .await
            .expect("start");

        let entry = capture
            .wait_for_message("slow", fast())
            .await
            .expect("log entry");
        assert_eq!(entry.kind, EntryKind::Log);

        let entries = capture.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].text, "hints 3");
        assert_eq!(entries[1].kind, EntryKind::Exception);
        assert!(entries[1].text.contains("TypeError"));

        let errors = capture.errors();
        assert_eq!(errors.len(), 1);

        capture.clear();
        assert!(capture.stop().is_empty());
    }

    #[tokio::test]
    async fn test_capture_appends_to_file() {
        let connection = chatty_target().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = log_path(dir.path(), "content");

        let capture = ConsoleCapture::start(&connection, "content", Some(path.as_path()))
            .await
            .expect("start");
        capture
            .wait_for_message("slow", fast())
            .await
            .expect("log entry");
        drop(capture);

        let text = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[1718900000.123] [content] LOG: hints 3");
        assert!(lines[1].contains("ERROR: Uncaught TypeError"));
    }
}
