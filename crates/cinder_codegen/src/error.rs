use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("cannot generate code for a program with semantic errors")]
    AnalysisFailed,

    #[error("reference to undeclared symbol id {0:?}")]
    UndeclaredSymbol(u32),

    #[error("LLVM builder error: {0}")]
    Builder(String),

    #[error("function {0} failed LLVM verification")]
    Verification(String),

    #[error("module failed LLVM verification: {0}")]
    ModuleVerification(String),

    #[error("target/object emission failed: {0}")]
    Target(String),

    #[error("link failed: {0}")]
    Link(String),
}

impl From<inkwell::builder::BuilderError> for CodegenError {
    fn from(err: inkwell::builder::BuilderError) -> Self {
        CodegenError::Builder(err.to_string())
    }
}
