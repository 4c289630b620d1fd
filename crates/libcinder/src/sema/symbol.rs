//! Program-wide symbol table keyed by stable [`SymbolId`]s.

use indexmap::IndexMap;

use crate::sema::types::TypeId;

/// A dense, monotonically increasing identifier for a declared name.
/// Stable for the remainder of the compile (spec §3 invariant: never
/// reused, `{ids declared} == {0, 1, ..., N-1}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    /// Module-qualified name (`MODULE.NAME`) for every top-level
    /// declaration; the bare spelling for locals and `extern` functions.
    pub name: String,
    pub ty: TypeId,
    pub is_function: bool,
}

/// Owns every declared [`Symbol`]; the scope stack and the global table
/// below only ever store copies of `SymbolId`.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    /// `MODULE.NAME` -> id, populated by the struct and signature passes so
    /// later passes can resolve cross-module and forward references.
    globals: IndexMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn declare(&mut self, name: String, ty: TypeId, is_function: bool) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol { id, name, ty, is_function });
        id
    }

    /// Declares a symbol under a module-qualified global name. Fails if the
    /// name is already globally declared (spec §3: "module-qualified global
    /// names are globally unique").
    pub fn declare_global(&mut self, qualified_name: String, ty: TypeId, is_function: bool) -> Result<SymbolId, SymbolId> {
        if let Some(&existing) = self.globals.get(&qualified_name) {
            return Err(existing);
        }
        let id = self.declare(qualified_name.clone(), ty, is_function);
        self.globals.insert(qualified_name, id);
        Ok(id)
    }

    pub fn lookup_global(&self, qualified_name: &str) -> Option<SymbolId> {
        self.globals.get(qualified_name).copied()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::types::TypeContext;

    #[test]
    fn ids_are_dense_and_increasing() {
        let ctx = TypeContext::new();
        let mut table = SymbolTable::default();
        let a = table.declare("a".into(), ctx.int32, false);
        let b = table.declare("b".into(), ctx.int32, false);
        assert_eq!(a.0, 0);
        assert_eq!(b.0, 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn global_names_are_unique() {
        let ctx = TypeContext::new();
        let mut table = SymbolTable::default();
        table.declare_global("demo.add".into(), ctx.int32, true).unwrap();
        assert!(table.declare_global("demo.add".into(), ctx.int32, true).is_err());
    }
}
