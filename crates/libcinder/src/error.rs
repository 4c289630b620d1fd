//! Top-level pipeline errors: I/O, lexing, parsing and module loading.
//!
//! These are distinct from [`crate::sema::diagnostics::Diagnostics`], which
//! accumulates semantic errors instead of aborting the pipeline (spec §7).

use std::path::PathBuf;

use thiserror::Error;

use crate::lexer::LexError;
use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("duplicate module name '{name}': already declared at {existing}, redeclared at {redeclared}")]
    DuplicateModuleName { name: String, existing: PathBuf, redeclared: PathBuf },

    #[error("unresolved import '{name}' from {from}")]
    UnresolvedImport { name: String, from: PathBuf },

    #[error("Import cycle detected: {chain}")]
    ImportCycle { chain: String },
}
