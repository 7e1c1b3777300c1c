use std::cell::RefCell;

/// Where verbs report progress and per-record failures.
///
/// Passed explicitly to every operation so callers choose how progress is
/// surfaced: the console, the log only, or an in-memory record for tests.
pub trait Diagnostics {
    /// Progress the operator should see.
    fn note(&self, message: &str);

    /// A record that failed and was skipped.
    fn failure(&self, subject: &str, error: &dyn std::error::Error);
}

/// Prints notes to stdout and failures to stderr, mirroring both to tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDiagnostics;

impl Diagnostics for ConsoleDiagnostics {
    fn note(&self, message: &str) {
        tracing::info!("{message}");
        println!("{message}");
    }

    fn failure(&self, subject: &str, error: &dyn std::error::Error) {
        tracing::warn!(subject, %error, "skipped");
        eprintln!("\tfailed {subject}: {error}");
    }
}

/// Like [`ConsoleDiagnostics`] but notes go to stderr, leaving stdout free.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn note(&self, message: &str) {
        tracing::info!("{message}");
        eprintln!("{message}");
    }

    fn failure(&self, subject: &str, error: &dyn std::error::Error) {
        tracing::warn!(subject, %error, "skipped");
        eprintln!("\tfailed {subject}: {error}");
    }
}

/// Sends everything to tracing only. Used when stdout carries JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn note(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn failure(&self, subject: &str, error: &dyn std::error::Error) {
        tracing::warn!(subject, %error, "skipped");
    }
}

/// Keeps every note and failure in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    notes: RefCell<Vec<String>>,
    failures: RefCell<Vec<(String, String)>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes.borrow().clone()
    }

    /// `(subject, error message)` pairs in the order they were reported.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.failures.borrow().clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn note(&self, message: &str) {
        self.notes.borrow_mut().push(message.to_string());
    }

    fn failure(&self, subject: &str, error: &dyn std::error::Error) {
        self.failures
            .borrow_mut()
            .push((subject.to_string(), error.to_string()));
    }
}
