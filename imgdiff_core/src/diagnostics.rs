use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, warn};

/// Something the diff engines had to work around
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// A matched entry was left out of the result because it could not be inspected
    EntrySkipped { entry: String, reason: String },
    /// A size could not be resolved and was reported as unknown
    SizeUnresolved { path: PathBuf, reason: String },
}

/// Sink for failures the engines tolerate instead of returning
pub trait Diagnostics: Send + Sync {
    fn report(&self, event: DiagnosticEvent);

    fn entry_skipped(&self, entry: &str, reason: &dyn std::fmt::Display) {
        self.report(DiagnosticEvent::EntrySkipped {
            entry: entry.to_string(),
            reason: reason.to_string(),
        });
    }

    fn size_unresolved(&self, path: &Path, reason: &dyn std::fmt::Display) {
        self.report(DiagnosticEvent::SizeUnresolved {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::EntrySkipped { entry, reason } => {
                warn!("Error checking directory entry {}: {}", entry, reason);
            }
            DiagnosticEvent::SizeUnresolved { path, reason } => {
                error!("Could not obtain size for {}: {}", path.display(), reason);
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn skipped_entries(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DiagnosticEvent::EntrySkipped { entry, .. } => Some(entry),
                DiagnosticEvent::SizeUnresolved { .. } => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, event: DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
