//! LLVM code generation and native linking for analyzed cinder programs.
//!
//! Consumes a [`libcinder::CompileOutcome`] straight from the front end;
//! there is no separate intermediate representation (see [`emitter`]).

pub mod emitter;
pub mod error;
pub mod linker;
pub mod types;

use std::path::Path;

use inkwell::context::Context;
use inkwell::OptimizationLevel;

pub use emitter::CodeGenerator;
pub use error::CodegenError;
use libcinder::CompileOutcome;

/// Runs code generation, object emission, and linking for `outcome`,
/// producing a native executable at `output_path`.
pub fn compile_to_executable(context: &Context, outcome: &CompileOutcome, module_name: &str, output_path: &Path, opt_level: OptimizationLevel, extra_libs: &[String]) -> Result<(), CodegenError> {
    let mut generator = CodeGenerator::new(context, module_name);
    generator.compile(outcome)?;
    let module = generator.into_module();

    let object_path = output_path.with_extension("o");
    linker::emit_object(&module, &object_path, opt_level)?;
    linker::link(&object_path, output_path, extra_libs)?;
    let _ = std::fs::remove_file(&object_path);
    Ok(())
}
