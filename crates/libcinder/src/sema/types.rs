//! The type context: canonical primitive types, an interned function-type
//! pool, and named struct types.
//!
//! Types are reference-identified (spec §3): equality is identity within
//! the owning [`TypeContext`]. Rather than modelling that with `Rc`
//! aliasing (which the design notes flag as unable to support a future
//! self-referential struct field without an ownership cycle), types live in
//! a flat arena and every reference elsewhere in the compiler is a
//! `TypeId` index into it — two types are equal iff they have the same id.

use indexmap::IndexMap;

/// An index into a [`TypeContext`]'s arena. Cheap to copy, stored on AST
/// annotations and symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    Bool,
    String,
    Function { return_type: TypeId, params: Vec<TypeId>, variadic: bool },
    /// `fields` preserves declaration order so `MemberAccess::field_index`
    /// is stable and matches the emitter's struct layout contract.
    Struct { qualified_name: String, fields: Vec<(String, TypeId)> },
}

/// Coarse type category, used for variadic promotion and for literal
/// typing; finer-grained equality (e.g. `int32` vs `int64`) is always by
/// `TypeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Int,
    Float,
    Bool,
    String,
    Function,
    Struct,
}

pub struct TypeContext {
    arena: Vec<Type>,
    pub int32: TypeId,
    pub int64: TypeId,
    pub flt32: TypeId,
    pub flt64: TypeId,
    pub bool_ty: TypeId,
    pub string_ty: TypeId,
    pub void_ty: TypeId,
    function_pool: IndexMap<(TypeId, Vec<TypeId>, bool), TypeId>,
    struct_map: IndexMap<String, TypeId>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    pub fn new() -> Self {
        let mut arena = Vec::new();
        let mut push = |ty: Type| -> TypeId {
            let id = TypeId(arena.len() as u32);
            arena.push(ty);
            id
        };
        let int32 = push(Type::Int { bits: 32, signed: true });
        let int64 = push(Type::Int { bits: 64, signed: true });
        let flt32 = push(Type::Float { bits: 32 });
        let flt64 = push(Type::Float { bits: 64 });
        let bool_ty = push(Type::Bool);
        let string_ty = push(Type::String);
        let void_ty = push(Type::Void);
        TypeContext {
            arena,
            int32,
            int64,
            flt32,
            flt64,
            bool_ty,
            string_ty,
            void_ty,
            function_pool: IndexMap::new(),
            struct_map: IndexMap::new(),
        }
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.arena[id.0 as usize]
    }

    pub fn kind(&self, id: TypeId) -> TypeKind {
        match self.get(id) {
            Type::Void => TypeKind::Void,
            Type::Int { .. } => TypeKind::Int,
            Type::Float { .. } => TypeKind::Float,
            Type::Bool => TypeKind::Bool,
            Type::String => TypeKind::String,
            Type::Function { .. } => TypeKind::Function,
            Type::Struct { .. } => TypeKind::Struct,
        }
    }

    /// Looks up a primitive type by its keyword spelling (`int32`, `str`, …).
    pub fn primitive_by_name(&self, name: &str) -> Option<TypeId> {
        Some(match name {
            "int32" => self.int32,
            "int64" => self.int64,
            "flt32" => self.flt32,
            "flt64" => self.flt64,
            "bool" => self.bool_ty,
            "str" => self.string_ty,
            "void" => self.void_ty,
            _ => return None,
        })
    }

    /// Interns a function type, returning the existing `TypeId` if this
    /// exact signature was already created.
    pub fn intern_function(&mut self, return_type: TypeId, params: Vec<TypeId>, variadic: bool) -> TypeId {
        let key = (return_type, params.clone(), variadic);
        if let Some(&id) = self.function_pool.get(&key) {
            return id;
        }
        let id = TypeId(self.arena.len() as u32);
        self.arena.push(Type::Function { return_type, params, variadic });
        self.function_pool.insert(key, id);
        id
    }

    /// Reserves a struct type under its qualified name with no fields yet,
    /// so later struct declarations and function signatures can reference
    /// it before the struct pass resolves its fields (spec §3/§4.3).
    ///
    /// Returns `None` if `qualified_name` is already reserved.
    pub fn reserve_struct(&mut self, qualified_name: String) -> Option<TypeId> {
        if self.struct_map.contains_key(&qualified_name) {
            return None;
        }
        let id = TypeId(self.arena.len() as u32);
        self.arena.push(Type::Struct { qualified_name: qualified_name.clone(), fields: Vec::new() });
        self.struct_map.insert(qualified_name, id);
        Some(id)
    }

    pub fn set_struct_fields(&mut self, id: TypeId, fields: Vec<(String, TypeId)>) {
        if let Type::Struct { fields: slot, .. } = &mut self.arena[id.0 as usize] {
            *slot = fields;
        }
    }

    pub fn struct_by_name(&self, qualified_name: &str) -> Option<TypeId> {
        self.struct_map.get(qualified_name).copied()
    }

    /// Every struct `TypeId` registered so far, in declaration order. Used
    /// by the IR emitter to forward-declare every struct type before
    /// emitting any function body (spec §4.4).
    pub fn struct_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.struct_map.values().copied()
    }

    /// Field lookup used by `MemberAccess`; returns the field's declared
    /// index (stable, matches declaration order) and its type.
    pub fn struct_field(&self, struct_id: TypeId, field_name: &str) -> Option<(usize, TypeId)> {
        match self.get(struct_id) {
            Type::Struct { fields, .. } => fields.iter().position(|(n, _)| n == field_name).map(|idx| (idx, fields[idx].1)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_singletons() {
        let ctx = TypeContext::new();
        assert_eq!(ctx.primitive_by_name("int32"), Some(ctx.int32));
        assert_ne!(ctx.int32, ctx.int64);
    }

    #[test]
    fn function_types_are_interned() {
        let mut ctx = TypeContext::new();
        let a = ctx.intern_function(ctx.int32, vec![ctx.int32, ctx.int32], false);
        let b = ctx.intern_function(ctx.int32, vec![ctx.int32, ctx.int32], false);
        assert_eq!(a, b);
        let c = ctx.intern_function(ctx.int32, vec![ctx.int64, ctx.int32], false);
        assert_ne!(a, c);
    }

    #[test]
    fn struct_fields_resolve_after_forward_reference() {
        let mut ctx = TypeContext::new();
        let vec2 = ctx.reserve_struct("math.Vector2".to_string()).unwrap();
        assert!(ctx.reserve_struct("math.Vector2".to_string()).is_none());
        ctx.set_struct_fields(vec2, vec![("x".to_string(), ctx.int32), ("y".to_string(), ctx.int32)]);
        assert_eq!(ctx.struct_field(vec2, "y"), Some((1, ctx.int32)));
        assert_eq!(ctx.struct_field(vec2, "z"), None);
    }
}
