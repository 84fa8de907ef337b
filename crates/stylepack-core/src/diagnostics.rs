use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

/// Stable identifiers for the recoverable conditions the bundler reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    RemoteImport,
    RemoteHoisted,
    ImportMedia,
    ModuleNotFound,
    CircularDependency,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::RemoteImport => "remote-import",
            DiagnosticCode::RemoteHoisted => "remote-hoisted",
            DiagnosticCode::ImportMedia => "import-media",
            DiagnosticCode::ModuleNotFound => "module-not-found",
            DiagnosticCode::CircularDependency => "circular-dependency",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagnostic message attached to the file that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub file: PathBuf,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, file: &Path, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code,
            file: file.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn warning(code: DiagnosticCode, file: &Path, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            code,
            file: file.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn info(code: DiagnosticCode, file: &Path, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            code,
            file: file.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Trait for handling diagnostics
/// This allows for dependency injection and testing with mock handlers
pub trait DiagnosticHandler: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    fn error(&self, code: DiagnosticCode, file: &Path, message: &str) {
        self.report(Diagnostic::error(code, file, message));
    }

    fn warning(&self, code: DiagnosticCode, file: &Path, message: &str) {
        self.report(Diagnostic::warning(code, file, message));
    }

    fn info(&self, code: DiagnosticCode, file: &Path, message: &str) {
        self.report(Diagnostic::info(code, file, message));
    }

    fn has_errors(&self) -> bool;
    fn error_count(&self) -> usize;
    fn warning_count(&self) -> usize;
    fn get_diagnostics(&self) -> Vec<Diagnostic>;
}

fn lock(diagnostics: &Mutex<Vec<Diagnostic>>) -> MutexGuard<'_, Vec<Diagnostic>> {
    diagnostics.lock().unwrap_or_else(PoisonError::into_inner)
}

fn count_level(diagnostics: &Mutex<Vec<Diagnostic>>, level: DiagnosticLevel) -> usize {
    lock(diagnostics)
        .iter()
        .filter(|d| d.level == level)
        .count()
}

/// Diagnostic handler that forwards every report to `tracing`
pub struct ConsoleDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl ConsoleDiagnosticHandler {
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
        }
    }
}

impl Default for ConsoleDiagnosticHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticHandler for ConsoleDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        let file = diagnostic.file.display();
        match diagnostic.level {
            DiagnosticLevel::Error => {
                error!(code = %diagnostic.code, file = %file, "{}", diagnostic.message)
            }
            DiagnosticLevel::Warning => {
                warn!(code = %diagnostic.code, file = %file, "{}", diagnostic.message)
            }
            DiagnosticLevel::Info => {
                info!(code = %diagnostic.code, file = %file, "{}", diagnostic.message)
            }
        }

        lock(&self.diagnostics).push(diagnostic);
    }

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn error_count(&self) -> usize {
        count_level(&self.diagnostics, DiagnosticLevel::Error)
    }

    fn warning_count(&self) -> usize {
        count_level(&self.diagnostics, DiagnosticLevel::Warning)
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        lock(&self.diagnostics).clone()
    }
}

/// Collecting diagnostic handler for testing
/// Collects all diagnostics without printing
pub struct CollectingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnosticHandler {
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    /// Diagnostics reported with the given code
    pub fn with_code(&self, code: DiagnosticCode) -> Vec<Diagnostic> {
        lock(&self.diagnostics)
            .iter()
            .filter(|d| d.code == code)
            .cloned()
            .collect()
    }
}

impl Default for CollectingDiagnosticHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticHandler for CollectingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        lock(&self.diagnostics).push(diagnostic);
    }

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn error_count(&self) -> usize {
        count_level(&self.diagnostics, DiagnosticLevel::Error)
    }

    fn warning_count(&self) -> usize {
        count_level(&self.diagnostics, DiagnosticLevel::Warning)
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        lock(&self.diagnostics).clone()
    }
}
