//! User-facing warnings.

use console::style;

/// Receives non-fatal notices raised while a command runs.
pub trait Diagnostics {
    /// Report a warning under a short category label such as the command name.
    fn warn(&self, category: &str, message: &str);
}

/// Writes warnings to the log and, styled, to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct TermDiagnostics;

impl Diagnostics for TermDiagnostics {
    fn warn(&self, category: &str, message: &str) {
        log::warn!("{category}: {message}");
        eprintln!(
            "{} {} {}",
            style("WARN").black().on_yellow(),
            style(category).magenta(),
            message
        );
    }
}
