//! Append-only audit log of inbound bus traffic, plus a diagnostic stream.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use parking_lot::Mutex;

use halux_domain::message::{self, Diagnostic, DiagnosticKind, LogEntry, Message};

#[derive(Debug)]
struct Inner {
    entries: VecDeque<LogEntry>,
    last_entry_id: u64,
    diagnostics: VecDeque<Diagnostic>,
    last_diagnostic_id: u64,
}

/// Process-wide, append-only message log.
///
/// Sequence ids and timestamps are assigned inside one critical section, so
/// concurrent appends never share an id and id order matches append order.
/// With a retention cap the oldest records are evicted first; ids keep
/// counting from where they were.
#[derive(Debug)]
pub struct MessageLog {
    retention: Option<NonZeroUsize>,
    inner: Mutex<Inner>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    /// An unbounded log.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A log keeping at most `retention` entries (and as many diagnostics).
    #[must_use]
    pub fn with_retention(retention: NonZeroUsize) -> Self {
        Self::build(Some(retention))
    }

    fn build(retention: Option<NonZeroUsize>) -> Self {
        Self {
            retention,
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                last_entry_id: 0,
                diagnostics: VecDeque::new(),
                last_diagnostic_id: 0,
            }),
        }
    }

    /// Record `message` and return the stored entry.
    pub fn append(&self, message: &Message) -> LogEntry {
        let payload = message.payload_text().into_owned();
        let mut inner = self.inner.lock();
        inner.last_entry_id += 1;
        let entry = LogEntry {
            sequence_id: inner.last_entry_id,
            timestamp: message::now(),
            address: message.address().clone(),
            payload,
        };
        inner.entries.push_back(entry.clone());
        if let Some(limit) = self.retention {
            while inner.entries.len() > limit.get() {
                inner.entries.pop_front();
            }
        }
        entry
    }

    /// Snapshot of the retained entries, oldest first.
    #[must_use]
    pub fn query(&self) -> Vec<LogEntry> {
        self.inner.lock().entries.iter().cloned().collect()
    }

    /// Up to `limit` retained entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.inner
            .lock()
            .entries
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Sequence id of the last appended entry, `0` before the first append.
    #[must_use]
    pub fn last_sequence_id(&self) -> u64 {
        self.inner.lock().last_entry_id
    }

    /// Record a failure on the diagnostic stream.
    pub fn record_diagnostic(
        &self,
        kind: DiagnosticKind,
        topic: impl Into<String>,
        detail: impl Into<String>,
    ) -> Diagnostic {
        let topic = topic.into();
        let detail = detail.into();
        let mut inner = self.inner.lock();
        inner.last_diagnostic_id += 1;
        let diagnostic = Diagnostic {
            sequence_id: inner.last_diagnostic_id,
            timestamp: message::now(),
            kind,
            topic,
            detail,
        };
        inner.diagnostics.push_back(diagnostic.clone());
        if let Some(limit) = self.retention {
            while inner.diagnostics.len() > limit.get() {
                inner.diagnostics.pop_front();
            }
        }
        diagnostic
    }

    /// Snapshot of the retained diagnostics, oldest first.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.lock().diagnostics.iter().cloned().collect()
    }
}
