//! Lexical scope stack for the body pass.
//!
//! Frames are strictly LIFO: `begin`/`end` bracket modules, function
//! bodies, and `for` loops (spec §4.3). `while` and `if` bodies do **not**
//! open a frame, so assignments inside them reach whatever scope was
//! already active — this is what lets `if`/`while` bodies mutate an outer
//! variable without the analyzer treating that as a new declaration.

use std::collections::HashMap;

use crate::sema::symbol::SymbolId;

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, SymbolId>>,
}

impl ScopeStack {
    pub fn begin(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pops the innermost frame. Guaranteed to run on every structural exit
    /// from the analyzer, including error exits, since the body pass always
    /// pairs `begin`/`end` with a scope guard rather than early-returning
    /// past it (spec §5: "an implementation must guarantee `PopScope` runs
    /// on every structural exit").
    pub fn end(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Declares `name` in the innermost frame. Returns `Err` if `name` is
    /// already declared in that same frame (spec §3: "no symbol name is
    /// declared twice within the same scope frame").
    pub fn declare(&mut self, name: String, id: SymbolId) -> Result<(), SymbolId> {
        let frame = self.frames.last_mut().expect("declare() called with no active scope");
        if let Some(&existing) = frame.get(&name) {
            return Err(existing);
        }
        frame.insert(name, id);
        Ok(())
    }

    /// Walks the scope stack top-down looking for a bare name.
    pub fn resolve(&self, name: &str) -> Option<SymbolId> {
        self.frames.iter().rev().find_map(|frame| frame.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_frame_shadows_outer() {
        let mut scopes = ScopeStack::default();
        scopes.begin();
        scopes.declare("x".into(), SymbolId(0)).unwrap();
        scopes.begin();
        scopes.declare("x".into(), SymbolId(1)).unwrap();
        assert_eq!(scopes.resolve("x"), Some(SymbolId(1)));
        scopes.end();
        assert_eq!(scopes.resolve("x"), Some(SymbolId(0)));
        scopes.end();
        assert_eq!(scopes.resolve("x"), None);
    }

    #[test]
    fn duplicate_in_same_frame_is_rejected() {
        let mut scopes = ScopeStack::default();
        scopes.begin();
        scopes.declare("x".into(), SymbolId(0)).unwrap();
        assert!(scopes.declare("x".into(), SymbolId(1)).is_err());
    }
}
