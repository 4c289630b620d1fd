//! Buffered, severity-tagged diagnostics (spec §3/§7).
//!
//! Semantic errors are collected, not thrown: the analyzer pushes a record
//! and keeps going so a single run surfaces every problem it can find.
//! Loader and parse failures are a different animal (they abort the
//! pipeline via `Result`) and are not represented here.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Debug => "Debug",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: u32,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} at line {}", self.severity, self.message, self.line)
    }
}

/// Owns the diagnostic buffer for one analysis run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, severity: Severity, message: impl Into<String>, line: u32) {
        let diagnostic = Diagnostic { severity, message: message.into(), line };
        log::debug!("{diagnostic}");
        self.records.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, line: u32) {
        self.push(Severity::Error, message, line);
    }

    pub fn warning(&mut self, message: impl Into<String>, line: u32) {
        self.push(Severity::Warning, message, line);
    }

    pub fn had_error(&self) -> bool {
        self.records.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    /// Writes every buffered record to stderr in insertion order.
    pub fn dump(&self) {
        for record in &self.records {
            eprintln!("{record}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn had_error_ignores_warnings() {
        let mut diags = Diagnostics::default();
        diags.warning("shadowed extern", 3);
        assert!(!diags.had_error());
        diags.error("type mismatch", 4);
        assert!(diags.had_error());
    }

    #[test]
    fn format_matches_user_visible_contract() {
        let diagnostic = Diagnostic { severity: Severity::Error, message: "bad stuff".into(), line: 7 };
        assert_eq!(diagnostic.to_string(), "Error: bad stuff at line 7");
    }
}
