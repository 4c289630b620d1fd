//! Maps the analyzer's [`TypeId`] arena to LLVM types for one module.
//!
//! Struct types are cached by `TypeId` (not by name) so a two-phase
//! declare-then-define sequence can hand out the same opaque LLVM struct to
//! every forward reference before any field is resolved, mirroring the
//! analyzer's own forward-declare-then-resolve struct pass.

use std::collections::HashMap;

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType, StructType};
use inkwell::AddressSpace;

use libcinder::sema::{Type, TypeContext, TypeId};

pub struct TypeMapper<'ctx> {
    context: &'ctx Context,
    struct_cache: HashMap<TypeId, StructType<'ctx>>,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self { context, struct_cache: HashMap::new() }
    }

    pub fn llvm_type(&mut self, types: &TypeContext, id: TypeId) -> BasicTypeEnum<'ctx> {
        match types.get(id) {
            Type::Int { bits: 8, .. } => self.context.i8_type().into(),
            Type::Int { bits: 16, .. } => self.context.i16_type().into(),
            Type::Int { bits: 64, .. } => self.context.i64_type().into(),
            Type::Int { .. } => self.context.i32_type().into(),
            Type::Float { bits: 64 } => self.context.f64_type().into(),
            Type::Float { .. } => self.context.f32_type().into(),
            Type::Bool => self.context.bool_type().into(),
            // Void has no basic-type representation; callers needing a
            // BasicTypeEnum for it (e.g. an alloca) are an analyzer bug, as
            // void can only appear in return position.
            Type::Void => self.context.i8_type().into(),
            Type::String => self.string_type().into(),
            Type::Struct { .. } => self.declare_struct(types, id).into(),
            Type::Function { .. } => self.context.ptr_type(AddressSpace::default()).into(),
        }
    }

    pub fn fn_type(&mut self, types: &TypeContext, return_type: TypeId, params: &[TypeId], variadic: bool) -> FunctionType<'ctx> {
        let param_types: Vec<BasicMetadataTypeEnum<'ctx>> = params.iter().map(|&p| self.llvm_type(types, p).into()).collect();
        if matches!(types.get(return_type), Type::Void) {
            self.context.void_type().fn_type(&param_types, variadic)
        } else {
            let ret = self.llvm_type(types, return_type);
            ret.fn_type(&param_types, variadic)
        }
    }

    /// `str` is a fat pointer: `{ ptr, len }`, UTF-8 data with no
    /// terminator guarantee (the lexer-decoded literal length is known at
    /// compile time so no NUL scan is required at the call site).
    fn string_type(&self) -> StructType<'ctx> {
        let ptr_ty = self.context.ptr_type(AddressSpace::default()).into();
        let len_ty = self.context.i64_type().into();
        self.context.struct_type(&[ptr_ty, len_ty], false)
    }

    /// Registers (or returns the cached) opaque LLVM struct for `id`. Safe
    /// to call before the struct's fields are resolved, which is exactly
    /// what lets a field reference a struct declared later in the same
    /// file (spec §3: struct types may be forward-referenced).
    pub fn declare_struct(&mut self, types: &TypeContext, id: TypeId) -> StructType<'ctx> {
        if let Some(&cached) = self.struct_cache.get(&id) {
            return cached;
        }
        let name = match types.get(id) {
            Type::Struct { qualified_name, .. } => qualified_name.clone(),
            _ => unreachable!("declare_struct called on a non-struct TypeId"),
        };
        let opaque = self.context.opaque_struct_type(&name);
        self.struct_cache.insert(id, opaque);
        opaque
    }

    pub fn define_struct(&mut self, types: &TypeContext, id: TypeId) {
        let st = self.declare_struct(types, id);
        let fields = match types.get(id) {
            Type::Struct { fields, .. } => fields.clone(),
            _ => unreachable!("define_struct called on a non-struct TypeId"),
        };
        let field_types: Vec<BasicTypeEnum<'ctx>> = fields.iter().map(|(_, ty)| self.llvm_type(types, *ty)).collect();
        st.set_body(&field_types, false);
    }
}
