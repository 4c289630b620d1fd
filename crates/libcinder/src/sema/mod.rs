//! Semantic analysis: type context, symbol table, scope stack, diagnostics,
//! and the three-pass analyzer that ties them together (spec §4.3).

pub mod analyzer;
pub mod diagnostics;
pub mod scope;
pub mod symbol;
pub mod types;

pub use analyzer::{analyze, AnalysisResult};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use symbol::{Symbol, SymbolId, SymbolTable};
pub use types::{Type, TypeContext, TypeId, TypeKind};
