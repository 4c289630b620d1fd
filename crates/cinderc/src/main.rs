//! Command-line driver for the cinder compiler.
//!
//! Wires `libcinder`'s load-and-analyze pipeline to `cinder_codegen`'s
//! LLVM backend, following the same logging-setup-then-dispatch shape as
//! the teacher's own compiler executable.

use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use inkwell::context::Context;
use inkwell::OptimizationLevel;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, LevelPadding, TermLogger, TerminalMode, ThreadLogMode};

use libcinder::file::SourceFile;
use libcinder::lexer::lex;

#[derive(Parser, Debug)]
#[command(name = "cinderc", about = "cinder language compiler")]
struct Cli {
    /// One or more source file paths to compile.
    #[arg(required = true)]
    src: Vec<PathBuf>,

    /// Output path (default: "cinder").
    #[arg(short = 'o', long, default_value = "cinder")]
    output: PathBuf,

    /// Emit a native executable (requires a system linker).
    #[arg(long)]
    compile: bool,

    /// Emit textual LLVM IR to the output path instead of an executable.
    #[arg(long = "emit-llvm")]
    emit_llvm: bool,

    /// Dump the parsed AST of every module and exit.
    #[arg(long = "emit-ast")]
    emit_ast: bool,

    /// Dump the token stream of every source file and exit.
    #[arg(long = "emit-tokens")]
    emit_tokens: bool,

    /// Additional root directory to search for imports (repeatable).
    #[arg(short = 'r', long = "root")]
    roots: Vec<PathBuf>,

    /// Additional linker flag, passed as `-l<FLAG>` (repeatable).
    #[arg(short = 'l')]
    libs: Vec<String>,

    /// Increase log verbosity (repeatable: -v for info, -vv for debug).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress warnings; only errors are logged.
    #[arg(short = 'q', long)]
    quiet: bool,
}

/// Picks the log level from `-v`/`-q`, falling back to the `CINDER_LOG`
/// environment variable, then `Warn`.
fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        return LevelFilter::Error;
    }
    match cli.verbose {
        0 => std::env::var("CINDER_LOG").ok().and_then(|v| v.parse().ok()).unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn init_logging(level: LevelFilter) {
    let config = ConfigBuilder::new().set_location_level(LevelFilter::Error).set_thread_mode(ThreadLogMode::Both).set_level_padding(LevelPadding::Off).set_thread_level(LevelFilter::Off).build();
    CombinedLogger::init(vec![TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)]).ok();
}

fn main() {
    let cli = Cli::parse();
    init_logging(log_level(&cli));

    if cli.emit_tokens {
        run_emit_tokens(&cli.src);
        return;
    }

    let modules = match libcinder::loader::load(&cli.src, &cli.roots) {
        Ok(modules) => modules,
        Err(error) => {
            eprintln!("{error}");
            exit(1);
        }
    };

    if cli.emit_ast {
        for module in &modules {
            println!("{:#?}", module.ast);
        }
        return;
    }

    let analysis = libcinder::sema::analyze(&modules);
    if analysis.had_error() {
        analysis.diagnostics.dump();
        exit(1);
    }
    let outcome = libcinder::CompileOutcome { modules, analysis };

    if cli.emit_llvm {
        let context = Context::create();
        let mut generator = cinder_codegen::CodeGenerator::new(&context, module_label(&outcome));
        if let Err(error) = generator.compile(&outcome) {
            eprintln!("{error}");
            exit(1);
        }
        let module = generator.into_module();
        if let Err(error) = module.print_to_file(&cli.output) {
            eprintln!("{error}");
            exit(1);
        }
        return;
    }

    if cli.compile {
        let context = Context::create();
        let result = cinder_codegen::compile_to_executable(&context, &outcome, module_label(&outcome), &cli.output, OptimizationLevel::None, &cli.libs);
        if let Err(error) = result {
            eprintln!("{error}");
            exit(1);
        }
        return;
    }

    eprintln!("nothing to do: pass --compile, --emit-llvm, --emit-ast, or --emit-tokens");
    exit(1);
}

fn module_label(outcome: &libcinder::CompileOutcome) -> &str {
    outcome.modules.last().map(|m| m.ast.name.lexeme.as_str()).unwrap_or("cinder")
}

fn run_emit_tokens(paths: &[PathBuf]) {
    for path in paths {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                eprintln!("{}: {error}", path.display());
                exit(1);
            }
        };
        let file = SourceFile::new(path.to_string_lossy().into_owned(), source);
        match lex(&file) {
            Ok(tokens) => {
                for token in &tokens {
                    println!("{token}");
                }
            }
            Err(error) => {
                eprintln!("{error}");
                exit(1);
            }
        }
    }
}
