//! cinder language compiler front end.
//!
//! The library is organized around the stages of the pipeline:
//!
//! - [`token`] / [`lexer`]: scan source text into a token vector.
//! - [`ast`]: the parsed tree, with `Cell`-based annotation slots filled in
//!   by semantic analysis.
//! - [`parser`]: recursive-descent construction of an [`ast::Module`].
//! - [`loader`]: dependency-ordered loading of a module and its imports.
//! - [`sema`]: the three-pass analyzer, type context, symbol table.
//! - [`error`]: pipeline-level (loader/lex/parse) errors.
//!
//! The main entry point is [`compile`], which loads a module graph and runs
//! semantic analysis over it. Code generation lives in the separate
//! `cinder_codegen` crate, which consumes [`CompileOutcome`] post-analysis.

pub mod ast;
pub mod error;
pub mod file;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod sema;
pub mod token;

use std::path::PathBuf;

pub use error::LoadError;
pub use loader::LoadedModule;
pub use sema::{AnalysisResult, Diagnostics};

/// The result of a full `load -> analyze` run: every loaded module in
/// dependency order plus the shared analysis state the emitter consumes.
pub struct CompileOutcome {
    pub modules: Vec<LoadedModule>,
    pub analysis: AnalysisResult,
}

impl CompileOutcome {
    pub fn had_error(&self) -> bool {
        self.analysis.had_error()
    }
}

/// Loads `entries` (and their transitive imports, searched under `roots`)
/// and runs semantic analysis over the resulting module set.
///
/// A `LoadError` here means the pipeline aborted before analysis ran at
/// all (spec §7: "loader errors abort the pipeline immediately"). A
/// successful return does not imply an error-free program — check
/// [`CompileOutcome::had_error`], and call `analysis.diagnostics.dump()`
/// to print buffered semantic diagnostics the way `LastError()` does for
/// loader failures (via this function's `Err` variant's `Display`).
pub fn compile(entries: &[PathBuf], roots: &[PathBuf]) -> Result<CompileOutcome, LoadError> {
    let modules = loader::load(entries, roots)?;
    let analysis = sema::analyze(&modules);
    Ok(CompileOutcome { modules, analysis })
}
