use crate::bundler::Bundler;
use crate::config::BundlerOptions;
use crate::diagnostics::{ConsoleDiagnosticHandler, DiagnosticHandler};
use crate::fs::{FileSystem, RealFileSystem};
use crate::parser::ModuleParser;
use std::sync::Arc;

/// Dependency injection container
/// Owns the shared collaborators and wires them into bundlers
pub struct Container {
    options: Arc<BundlerOptions>,
    diagnostic_handler: Arc<dyn DiagnosticHandler>,
    file_system: Arc<dyn FileSystem>,
    parser: ModuleParser,
}

impl Container {
    /// Create a new container with production dependencies
    pub fn new(options: BundlerOptions) -> Self {
        Container {
            options: Arc::new(options),
            diagnostic_handler: Arc::new(ConsoleDiagnosticHandler::new()),
            file_system: Arc::new(RealFileSystem::new()),
            parser: ModuleParser::new(),
        }
    }

    /// Create a container with custom dependencies (for testing)
    pub fn with_dependencies(
        options: BundlerOptions,
        diagnostic_handler: Arc<dyn DiagnosticHandler>,
        file_system: Arc<dyn FileSystem>,
    ) -> Self {
        Container {
            options: Arc::new(options),
            diagnostic_handler,
            file_system,
            parser: ModuleParser::new(),
        }
    }

    /// Use a custom extension dispatch table for every bundler created
    pub fn with_parser(mut self, parser: ModuleParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn options(&self) -> &Arc<BundlerOptions> {
        &self.options
    }

    pub fn diagnostic_handler(&self) -> &Arc<dyn DiagnosticHandler> {
        &self.diagnostic_handler
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.file_system
    }

    pub fn parser(&self) -> &ModuleParser {
        &self.parser
    }

    /// Build a bundler sharing this container's collaborators
    pub fn bundler(&self) -> Bundler {
        Bundler::new(
            Arc::clone(&self.options),
            Arc::clone(&self.file_system),
            Arc::clone(&self.diagnostic_handler),
        )
        .with_parser(self.parser.clone())
    }

    /// Check if any errors have been reported
    pub fn has_errors(&self) -> bool {
        self.diagnostic_handler.has_errors()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostic_handler.error_count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostic_handler.warning_count()
    }
}
