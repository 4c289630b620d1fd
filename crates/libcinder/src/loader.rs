//! Dependency-aware module loader (spec §4.1).
//!
//! Depth-first traversal keyed by canonicalized absolute path. Produces a
//! module list in dependency order: for every `import A -> B`, `B` precedes
//! `A`. The loader owns every parsed AST and hands the list to the analyzer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::{Module, Stmt};
use crate::error::LoadError;
use crate::file::SourceFile;
use crate::lexer::lex;
use crate::parser::parse;

pub struct LoadedModule {
    pub path: PathBuf,
    pub ast: Module,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// Loads `entries` and everything they transitively import, searching
/// `roots` (in order) and each importing file's own directory for
/// unresolved `import NAME;` statements.
pub fn load(entries: &[PathBuf], roots: &[PathBuf]) -> Result<Vec<LoadedModule>, LoadError> {
    let mut loader = Loader { roots, marks: HashMap::new(), stack: Vec::new(), module_index: HashMap::new(), order: Vec::new() };
    for entry in entries {
        loader.visit(entry)?;
    }
    Ok(loader.order)
}

struct Loader<'a> {
    roots: &'a [PathBuf],
    marks: HashMap<PathBuf, Mark>,
    stack: Vec<PathBuf>,
    module_index: HashMap<String, PathBuf>,
    order: Vec<LoadedModule>,
}

impl<'a> Loader<'a> {
    fn visit(&mut self, path: &Path) -> Result<(), LoadError> {
        let canonical = self.canonicalize(path)?;
        match self.marks.get(&canonical) {
            Some(Mark::Visited) => return Ok(()),
            Some(Mark::Visiting) => return Err(self.cycle_error(&canonical)),
            None => {}
        }

        self.marks.insert(canonical.clone(), Mark::Visiting);
        self.stack.push(canonical.clone());

        let source_text = std::fs::read_to_string(&canonical).map_err(|source| LoadError::Io { path: canonical.clone(), source })?;
        let file = SourceFile::new(canonical.to_string_lossy().into_owned(), source_text);
        let tokens = lex(&file)?;
        let module = parse(tokens)?;

        let module_name = module.name.lexeme.clone();
        match self.module_index.get(&module_name) {
            Some(existing) if existing != &canonical => {
                return Err(LoadError::DuplicateModuleName { name: module_name, existing: existing.clone(), redeclared: canonical });
            }
            Some(_) => {}
            None => {
                self.module_index.insert(module_name, canonical.clone());
            }
        }

        let imports: Vec<String> = module
            .stmts
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Import { module_name } => Some(module_name.lexeme.clone()),
                _ => None,
            })
            .collect();

        for import_name in &imports {
            let import_path = self.resolve_import(import_name, &canonical)?;
            self.visit(&import_path)?;
        }

        self.marks.insert(canonical.clone(), Mark::Visited);
        self.stack.pop();
        self.order.push(LoadedModule { path: canonical, ast: module });
        Ok(())
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, LoadError> {
        path.canonicalize().map_err(|source| LoadError::Io { path: path.to_path_buf(), source })
    }

    /// (a) already-indexed module name; (b) `NAME.ci` under a configured
    /// root directory; (c) `NAME.ci` as a sibling of the importing file.
    fn resolve_import(&self, name: &str, importing_file: &Path) -> Result<PathBuf, LoadError> {
        if let Some(path) = self.module_index.get(name) {
            return Ok(path.clone());
        }
        for root in self.roots {
            let candidate = root.join(format!("{name}.ci"));
            if candidate.is_file() {
                return self.canonicalize(&candidate);
            }
        }
        if let Some(parent) = importing_file.parent() {
            let candidate = parent.join(format!("{name}.ci"));
            if candidate.is_file() {
                return self.canonicalize(&candidate);
            }
        }
        Err(LoadError::UnresolvedImport { name: name.to_string(), from: importing_file.to_path_buf() })
    }

    /// Walks the active DFS stack from the first occurrence of `offending`
    /// to build an `A -> B -> ... -> A` chain for the error message.
    fn cycle_error(&self, offending: &Path) -> LoadError {
        let start = self.stack.iter().position(|p| p == offending).unwrap_or(0);
        let mut chain: Vec<String> = self.stack[start..].iter().map(|p| p.display().to_string()).collect();
        chain.push(offending.display().to_string());
        LoadError::ImportCycle { chain: chain.join(" -> ") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_a_single_module_with_no_imports() {
        let dir = tempdir();
        let entry = write_file(&dir, "demo.ci", "mod demo;\ndef f() -> void\nend\n");
        let modules = load(&[entry], &[]).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].ast.name.lexeme, "demo");
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let dir = tempdir();
        write_file(&dir, "math.ci", "mod math;\ndef sum(int32 a, int32 b) -> int32 return a + b; end\n");
        let entry = write_file(&dir, "main.ci", "mod main;\nimport math;\ndef main() -> int32 return 0; end\n");
        let modules = load(&[entry], &[]).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].ast.name.lexeme, "math");
        assert_eq!(modules[1].ast.name.lexeme, "main");
    }

    #[test]
    fn import_cycle_is_reported() {
        let dir = tempdir();
        let a = write_file(&dir, "a.ci", "mod a;\nimport b;\n");
        write_file(&dir, "b.ci", "mod b;\nimport a;\n");
        let err = load(&[a], &[]).unwrap_err();
        match err {
            LoadError::ImportCycle { chain } => {
                assert!(chain.contains("a.ci"));
                assert!(chain.contains("b.ci"));
            }
            other => panic!("expected ImportCycle, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_import_is_reported() {
        let dir = tempdir();
        let entry = write_file(&dir, "main.ci", "mod main;\nimport missing;\n");
        assert!(matches!(load(&[entry], &[]), Err(LoadError::UnresolvedImport { .. })));
    }

    fn tempdir() -> PathBuf {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("cinder-loader-test-{}-{id}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
