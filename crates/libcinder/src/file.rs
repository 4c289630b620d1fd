//! Source file representation shared by the lexer, parser, loader and analyzer.

use std::sync::Arc;

/// A single source file, identified by its normalized filesystem path.
///
/// Cheap to clone: the path and source text are both reference counted so
/// every AST node, token, and diagnostic can hold its own [`SourceFile`]
/// without copying the underlying text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    pub path: Arc<str>,
    pub source: Arc<str>,
}

impl SourceFile {
    pub fn new(path: impl Into<Arc<str>>, source: impl Into<Arc<str>>) -> Self {
        Self { path: path.into(), source: source.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
