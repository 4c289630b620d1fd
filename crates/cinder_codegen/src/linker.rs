//! Emits an LLVM module to a native object file and links it with the
//! system C compiler, grounded on `llts_driver`'s pipeline/linker split.
//! The Darwin sysroot lookup (`SDKROOT`, then the usual Command Line
//! Tools/Xcode paths) mirrors the original `cinder` compiler's own
//! `ClangDriver::LinkObject`/`ResolveDarwinSysroot`.

use std::path::Path;
use std::process::Command;

use inkwell::module::Module as LlvmModule;
use inkwell::targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine};
use inkwell::OptimizationLevel;

use crate::error::CodegenError;

/// Lowers `module` to a native object file at `object_path` for the host
/// target.
pub fn emit_object(module: &LlvmModule<'_>, object_path: &Path, opt_level: OptimizationLevel) -> Result<(), CodegenError> {
    Target::initialize_native(&InitializationConfig::default()).map_err(|e| CodegenError::Target(e.to_string()))?;

    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple).map_err(|e| CodegenError::Target(e.to_string()))?;
    let cpu = TargetMachine::get_host_cpu_name();
    let features = TargetMachine::get_host_cpu_features();

    let machine = target
        .create_target_machine(&triple, cpu.to_str().unwrap_or("generic"), features.to_str().unwrap_or(""), opt_level, RelocMode::PIC, CodeModel::Default)
        .ok_or_else(|| CodegenError::Target("failed to create target machine".into()))?;

    machine.write_to_file(module, FileType::Object, object_path).map_err(|e| CodegenError::Target(e.to_string()))
}

/// Resolves the Darwin system SDK root for the final link step by honoring
/// `SDKROOT`, falling back to the usual Command Line Tools/Xcode install
/// locations.
fn darwin_sysroot() -> Option<String> {
    if let Ok(sdkroot) = std::env::var("SDKROOT") {
        if !sdkroot.is_empty() {
            return Some(sdkroot);
        }
    }
    const CANDIDATES: &[&str] = &[
        "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk",
        "/Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform/Developer/SDKs/MacOSX.sdk",
    ];
    CANDIDATES.iter().find(|path| Path::new(path).exists()).map(|path| path.to_string())
}

/// Links `object_path` into a native executable at `output_path`, passing
/// through any extra `-l` libraries the caller requested.
pub fn link(object_path: &Path, output_path: &Path, extra_libs: &[String]) -> Result<(), CodegenError> {
    let mut command = Command::new("cc");
    command.arg(object_path).arg("-o").arg(output_path);
    for lib in extra_libs {
        command.arg(format!("-l{lib}"));
    }

    if cfg!(target_os = "macos") {
        if let Some(sysroot) = darwin_sysroot() {
            command.arg("-isysroot").arg(sysroot);
        }
    }

    let status = command.status().map_err(|e| CodegenError::Link(format!("failed to invoke linker: {e}")))?;
    if !status.success() {
        return Err(CodegenError::Link(format!("linker exited with status: {status}")));
    }
    Ok(())
}
