//! Walks an analyzed [`CompileOutcome`] directly into an LLVM module.
//!
//! There is no separate lowering IR: the analyzed AST already carries
//! everything an emitter needs (`expr.ty()`, `expr.id()`, stable
//! `SymbolId`s on every declaration, stable `field_index` on every member
//! access), so the emitter walks `ast::Stmt`/`ast::Expr` the same way the
//! analyzer does.

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module as LlvmModule};
use inkwell::types::BasicType;
use inkwell::values::{BasicValue, BasicValueEnum, FunctionValue, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use libcinder::ast::{BinaryOp, CompareOp, Expr, ForStmt, IfStmt, PrefixOp, Stmt};
use libcinder::sema::{SymbolId, Type, TypeContext, TypeId, TypeKind};
use libcinder::token::Literal;
use libcinder::CompileOutcome;

use crate::error::CodegenError;
use crate::types::TypeMapper;

pub struct CodeGenerator<'ctx> {
    context: &'ctx Context,
    module: LlvmModule<'ctx>,
    builder: Builder<'ctx>,
    mapper: TypeMapper<'ctx>,
    functions: HashMap<SymbolId, FunctionValue<'ctx>>,
    variables: HashMap<SymbolId, PointerValue<'ctx>>,
    current_function: Option<FunctionValue<'ctx>>,
}

impl<'ctx> CodeGenerator<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        CodeGenerator {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            mapper: TypeMapper::new(context),
            functions: HashMap::new(),
            variables: HashMap::new(),
            current_function: None,
        }
    }

    pub fn into_module(self) -> LlvmModule<'ctx> {
        self.module
    }

    pub fn compile(&mut self, outcome: &CompileOutcome) -> Result<(), CodegenError> {
        if outcome.had_error() {
            return Err(CodegenError::AnalysisFailed);
        }
        let types = &outcome.analysis.types;

        for id in types.struct_ids() {
            self.mapper.declare_struct(types, id);
        }
        for id in types.struct_ids() {
            self.mapper.define_struct(types, id);
        }

        for loaded in &outcome.modules {
            for stmt in &loaded.ast.stmts {
                self.declare_function(types, outcome, stmt)?;
            }
        }

        for loaded in &outcome.modules {
            for stmt in &loaded.ast.stmts {
                if let Stmt::FunctionStmt { proto, body, id } = stmt {
                    let Some(symbol_id) = id.get() else { continue };
                    self.emit_function_body(types, symbol_id, proto, body)?;
                }
            }
        }

        self.module.verify().map_err(|msg| CodegenError::ModuleVerification(msg.to_string()))
    }

    fn declare_function(&mut self, types: &TypeContext, outcome: &CompileOutcome, stmt: &Stmt) -> Result<(), CodegenError> {
        let id = match stmt {
            Stmt::FunctionProto { id, .. } => id.get(),
            Stmt::FunctionStmt { id, .. } => id.get(),
            _ => return Ok(()),
        };
        let Some(symbol_id) = id else { return Ok(()) };
        if self.functions.contains_key(&symbol_id) {
            return Ok(());
        }
        let symbol = outcome.analysis.symbols.get(symbol_id);
        let Type::Function { return_type, params, variadic } = types.get(symbol.ty).clone() else {
            return Ok(());
        };
        let fn_type = self.mapper.fn_type(types, return_type, &params, variadic);
        let function = self.module.add_function(&symbol.name, fn_type, Some(Linkage::External));
        self.functions.insert(symbol_id, function);
        Ok(())
    }

    fn emit_function_body(&mut self, types: &TypeContext, symbol_id: SymbolId, proto: &libcinder::ast::FunctionProto, body: &[Stmt]) -> Result<(), CodegenError> {
        let function = *self.functions.get(&symbol_id).ok_or(CodegenError::UndeclaredSymbol(symbol_id.0))?;
        if proto.is_extern {
            return Ok(());
        }
        self.current_function = Some(function);
        self.variables.clear();

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        for (index, arg) in proto.args.iter().enumerate() {
            let Some(param_id) = arg.resolved_id.get() else { continue };
            let Some(param_ty) = arg.resolved_type.get() else { continue };
            let llvm_ty = self.mapper.llvm_type(types, param_ty);
            let slot = self.builder.build_alloca(llvm_ty, &arg.identifier.lexeme)?;
            let param_value = function.get_nth_param(index as u32).expect("parameter count matches signature");
            self.builder.build_store(slot, param_value)?;
            self.variables.insert(param_id, slot);
        }

        for stmt in body {
            self.emit_stmt(types, stmt)?;
        }

        if function.get_last_basic_block().map(|b| b.get_terminator().is_none()).unwrap_or(false) {
            // Every path through a `void` function that falls off the end
            // needs an explicit terminator; non-void functions falling off
            // the end without a `return` are an analyzer-level bug.
            self.builder.build_return(None)?;
        }

        if !function.verify(true) {
            return Err(CodegenError::Verification(proto.name.lexeme.clone()));
        }
        Ok(())
    }

    fn emit_stmt(&mut self, types: &TypeContext, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::VarDeclaration { name, value, id, .. } => {
                let Some(symbol_id) = id.get() else { return Ok(()) };
                let Some(declared_ty) = value.ty() else { return Ok(()) };
                let llvm_ty = self.mapper.llvm_type(types, declared_ty);
                let init = self.emit_expr(types, value)?;
                let slot = self.builder.build_alloca(llvm_ty, &name.lexeme)?;
                self.builder.build_store(slot, init)?;
                self.variables.insert(symbol_id, slot);
                Ok(())
            }
            Stmt::Expression { expr } => {
                self.emit_expr(types, expr)?;
                Ok(())
            }
            Stmt::Return { value, .. } => {
                match value {
                    Some(expr) => {
                        let result = self.emit_expr(types, expr)?;
                        self.builder.build_return(Some(&result))?;
                    }
                    None => {
                        self.builder.build_return(None)?;
                    }
                }
                Ok(())
            }
            Stmt::If(if_stmt) => self.emit_if(types, if_stmt),
            Stmt::While { cond, body } => self.emit_while(types, cond, body),
            Stmt::For(for_stmt) => self.emit_for(types, for_stmt),
            Stmt::Module { .. } | Stmt::Import { .. } | Stmt::FunctionProto { .. } | Stmt::FunctionStmt { .. } | Stmt::StructStmt { .. } => Ok(()),
        }
    }

    fn emit_if(&mut self, types: &TypeContext, if_stmt: &IfStmt) -> Result<(), CodegenError> {
        let function = self.current_function.expect("emit_if called outside a function");
        let merge_block = self.context.append_basic_block(function, "if.merge");

        let mut arms: Vec<(&Expr, &Stmt)> = Vec::with_capacity(1 + if_stmt.elifs.len());
        arms.push((&if_stmt.cond, &if_stmt.then_branch));
        for (cond, body) in &if_stmt.elifs {
            arms.push((cond, body));
        }

        for (cond, body) in arms {
            let then_block = self.context.append_basic_block(function, "if.then");
            let next_block = self.context.append_basic_block(function, "if.next");
            let cond_value = self.emit_expr(types, cond)?.into_int_value();
            self.builder.build_conditional_branch(cond_value, then_block, next_block)?;

            self.builder.position_at_end(then_block);
            self.emit_stmt(types, body)?;
            self.branch_to_if_unterminated(merge_block)?;

            self.builder.position_at_end(next_block);
        }

        if let Some(else_branch) = &if_stmt.else_branch {
            self.emit_stmt(types, else_branch)?;
        }
        self.branch_to_if_unterminated(merge_block)?;

        self.builder.position_at_end(merge_block);
        Ok(())
    }

    fn emit_while(&mut self, types: &TypeContext, cond: &Expr, body: &[Stmt]) -> Result<(), CodegenError> {
        let function = self.current_function.expect("emit_while called outside a function");
        let cond_block = self.context.append_basic_block(function, "while.cond");
        let body_block = self.context.append_basic_block(function, "while.body");
        let exit_block = self.context.append_basic_block(function, "while.exit");

        self.builder.build_unconditional_branch(cond_block)?;
        self.builder.position_at_end(cond_block);
        let cond_value = self.emit_expr(types, cond)?.into_int_value();
        self.builder.build_conditional_branch(cond_value, body_block, exit_block)?;

        self.builder.position_at_end(body_block);
        for stmt in body {
            self.emit_stmt(types, stmt)?;
        }
        self.branch_to_if_unterminated(cond_block)?;

        self.builder.position_at_end(exit_block);
        Ok(())
    }

    fn emit_for(&mut self, types: &TypeContext, for_stmt: &ForStmt) -> Result<(), CodegenError> {
        let function = self.current_function.expect("emit_for called outside a function");
        self.emit_stmt(types, &for_stmt.init)?;

        let cond_block = self.context.append_basic_block(function, "for.cond");
        let body_block = self.context.append_basic_block(function, "for.body");
        let exit_block = self.context.append_basic_block(function, "for.exit");

        self.builder.build_unconditional_branch(cond_block)?;
        self.builder.position_at_end(cond_block);
        let cond_value = self.emit_expr(types, &for_stmt.cond)?.into_int_value();
        self.builder.build_conditional_branch(cond_value, body_block, exit_block)?;

        self.builder.position_at_end(body_block);
        for stmt in &for_stmt.body {
            self.emit_stmt(types, stmt)?;
        }
        if let Some(step) = &for_stmt.step {
            self.emit_expr(types, step)?;
        }
        self.branch_to_if_unterminated(cond_block)?;

        self.builder.position_at_end(exit_block);
        Ok(())
    }

    /// Branches the current block to `target` unless it already ends in a
    /// terminator (e.g. a `return` inside an `if` arm).
    fn branch_to_if_unterminated(&mut self, target: BasicBlock<'ctx>) -> Result<(), CodegenError> {
        let current = self.builder.get_insert_block().expect("builder always has a current block while emitting a function");
        if current.get_terminator().is_none() {
            self.builder.build_unconditional_branch(target)?;
        }
        Ok(())
    }

    /// Resolves the storage address of an lvalue expression (`Variable` or
    /// `MemberAccess`), for loads, stores, and `++`/`--`.
    fn emit_place(&mut self, types: &TypeContext, expr: &Expr) -> Result<PointerValue<'ctx>, CodegenError> {
        match expr {
            Expr::Variable { id, .. } => {
                let symbol_id = id.get().ok_or(CodegenError::UndeclaredSymbol(u32::MAX))?;
                self.variables.get(&symbol_id).copied().ok_or(CodegenError::UndeclaredSymbol(symbol_id.0))
            }
            Expr::MemberAccess { object, field_index, .. } => {
                let base = self.emit_place(types, object)?;
                let object_ty = object.ty().expect("analyzed member access has a typed base");
                let struct_ty = self.mapper.declare_struct(types, object_ty);
                let index = field_index.get().expect("analyzed member access has a field index") as u32;
                Ok(self.builder.build_struct_gep(struct_ty, base, index, "field")?)
            }
            _ => unreachable!("emit_place called on a non-lvalue expression"),
        }
    }

    fn emit_expr(&mut self, types: &TypeContext, expr: &Expr) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match expr {
            Expr::Literal { value, ty, .. } => self.emit_literal(types, value, ty.get().expect("analyzed literal has a type")),
            Expr::Variable { ty, .. } => {
                let place = self.emit_place(types, expr)?;
                let llvm_ty = self.mapper.llvm_type(types, ty.get().expect("analyzed variable has a type"));
                Ok(self.builder.build_load(llvm_ty, place, "load")?)
            }
            Expr::Grouping { inner, .. } => self.emit_expr(types, inner),
            Expr::PreFixOp { op, id, ty, .. } => {
                let result_ty = ty.get().expect("analyzed prefix op has a type");
                let symbol_id = id.get().expect("analyzed prefix op has a resolved symbol");
                let place = *self.variables.get(&symbol_id).ok_or(CodegenError::UndeclaredSymbol(symbol_id.0))?;
                let llvm_ty = self.mapper.llvm_type(types, result_ty);
                let current = self.builder.build_load(llvm_ty, place, "preop.cur")?;
                let updated = self.apply_delta(types, result_ty, current, *op)?;
                self.builder.build_store(place, updated)?;
                Ok(updated)
            }
            Expr::Binary { left, op, right, ty, .. } => {
                let lhs = self.emit_expr(types, left)?;
                let rhs = self.emit_expr(types, right)?;
                let result_ty = ty.get().expect("analyzed binary expression has a type");
                self.emit_binary(types, result_ty, *op, lhs, rhs)
            }
            Expr::Conditional { left, op, right, .. } => {
                let operand_ty = left.ty().expect("analyzed comparison operand has a type");
                let lhs = self.emit_expr(types, left)?;
                let rhs = self.emit_expr(types, right)?;
                self.emit_compare(types, operand_ty, *op, lhs, rhs)
            }
            Expr::Assign { value, id, .. } => {
                let result = self.emit_expr(types, value)?;
                let symbol_id = id.get().expect("analyzed assignment has a resolved symbol");
                let place = *self.variables.get(&symbol_id).ok_or(CodegenError::UndeclaredSymbol(symbol_id.0))?;
                self.builder.build_store(place, result)?;
                Ok(result)
            }
            Expr::MemberAccess { ty, .. } => {
                let place = self.emit_place(types, expr)?;
                let llvm_ty = self.mapper.llvm_type(types, ty.get().expect("analyzed member access has a type"));
                Ok(self.builder.build_load(llvm_ty, place, "field.load")?)
            }
            Expr::MemberAssign { target, value, .. } => {
                let result = self.emit_expr(types, value)?;
                let place = self.emit_place(types, target)?;
                self.builder.build_store(place, result)?;
                Ok(result)
            }
            Expr::CallExpr { args, id, ty, .. } => self.emit_call(types, args, id.get(), ty.get()),
        }
    }

    fn emit_call(&mut self, types: &TypeContext, args: &[Expr], callee_id: Option<SymbolId>, result_ty: Option<TypeId>) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let symbol_id = callee_id.ok_or(CodegenError::UndeclaredSymbol(u32::MAX))?;
        let function = *self.functions.get(&symbol_id).ok_or(CodegenError::UndeclaredSymbol(symbol_id.0))?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.emit_expr(types, arg)?.into());
        }
        let call = self.builder.build_call(function, &values, "call")?;
        match call.try_as_basic_value().left() {
            Some(value) => Ok(value),
            None => {
                // `void` call: callers in an expression-statement position
                // discard this; callers expecting a value only reach here
                // when `result_ty` is `void`, which the analyzer forbids.
                let void_ty = result_ty.unwrap_or(types.void_ty);
                Ok(self.mapper.llvm_type(types, void_ty).const_zero())
            }
        }
    }

    fn emit_literal(&mut self, types: &TypeContext, value: &Literal, ty: TypeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match value {
            Literal::Integer(v) => {
                let int_ty = self.mapper.llvm_type(types, ty).into_int_type();
                Ok(int_ty.const_int(*v as u64, true).into())
            }
            Literal::Floating(v) => {
                let float_ty = self.mapper.llvm_type(types, ty).into_float_type();
                Ok(float_ty.const_float(*v).into())
            }
            Literal::Boolean(v) => Ok(self.context.bool_type().const_int(*v as u64, false).into()),
            Literal::String(s) => self.emit_string_literal(s),
        }
    }

    fn emit_string_literal(&mut self, s: &str) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let bytes = s.as_bytes();
        let array_ty = self.context.i8_type().array_type(bytes.len() as u32);
        let global = self.module.add_global(array_ty, None, "str");
        global.set_initializer(&self.context.const_string(bytes, false));
        global.set_constant(true);
        global.set_linkage(Linkage::Private);

        let ptr = global.as_pointer_value();
        let len = self.context.i64_type().const_int(bytes.len() as u64, false);
        let struct_ty = self.context.struct_type(&[self.context.ptr_type(inkwell::AddressSpace::default()).into(), self.context.i64_type().into()], false);
        let undef = struct_ty.get_undef();
        let with_ptr = self.builder.build_insert_value(undef, ptr, 0, "str.ptr")?;
        let with_len = self.builder.build_insert_value(with_ptr, len, 1, "str.len")?;
        Ok(with_len.as_basic_value_enum())
    }

    fn apply_delta(&mut self, types: &TypeContext, ty: TypeId, current: BasicValueEnum<'ctx>, op: PrefixOp) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match types.kind(ty) {
            TypeKind::Int => {
                let int_ty = current.into_int_value().get_type();
                let one = int_ty.const_int(1, false);
                let current = current.into_int_value();
                let result = match op {
                    PrefixOp::Increment => self.builder.build_int_add(current, one, "inc")?,
                    PrefixOp::Decrement => self.builder.build_int_sub(current, one, "dec")?,
                };
                Ok(result.into())
            }
            TypeKind::Float => {
                let float_ty = current.into_float_value().get_type();
                let one = float_ty.const_float(1.0);
                let current = current.into_float_value();
                let result = match op {
                    PrefixOp::Increment => self.builder.build_float_add(current, one, "finc")?,
                    PrefixOp::Decrement => self.builder.build_float_sub(current, one, "fdec")?,
                };
                Ok(result.into())
            }
            _ => unreachable!("analyzer rejects ++/-- on non-numeric operands"),
        }
    }

    fn emit_binary(&mut self, types: &TypeContext, ty: TypeId, op: BinaryOp, lhs: BasicValueEnum<'ctx>, rhs: BasicValueEnum<'ctx>) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match types.kind(ty) {
            TypeKind::Int => {
                let (l, r) = (lhs.into_int_value(), rhs.into_int_value());
                let result = match op {
                    BinaryOp::Add => self.builder.build_int_add(l, r, "add")?,
                    BinaryOp::Sub => self.builder.build_int_sub(l, r, "sub")?,
                    BinaryOp::Mul => self.builder.build_int_mul(l, r, "mul")?,
                    BinaryOp::Div => self.builder.build_int_signed_div(l, r, "div")?,
                };
                Ok(result.into())
            }
            TypeKind::Float => {
                let (l, r) = (lhs.into_float_value(), rhs.into_float_value());
                let result = match op {
                    BinaryOp::Add => self.builder.build_float_add(l, r, "fadd")?,
                    BinaryOp::Sub => self.builder.build_float_sub(l, r, "fsub")?,
                    BinaryOp::Mul => self.builder.build_float_mul(l, r, "fmul")?,
                    BinaryOp::Div => self.builder.build_float_div(l, r, "fdiv")?,
                };
                Ok(result.into())
            }
            _ => unreachable!("analyzer rejects binary arithmetic on non-numeric operands"),
        }
    }

    fn emit_compare(&mut self, types: &TypeContext, operand_ty: TypeId, op: CompareOp, lhs: BasicValueEnum<'ctx>, rhs: BasicValueEnum<'ctx>) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match types.kind(operand_ty) {
            TypeKind::Float => {
                let (l, r) = (lhs.into_float_value(), rhs.into_float_value());
                let predicate = match op {
                    CompareOp::Lt => FloatPredicate::OLT,
                    CompareOp::Le => FloatPredicate::OLE,
                    CompareOp::Gt => FloatPredicate::OGT,
                    CompareOp::Ge => FloatPredicate::OGE,
                    CompareOp::Eq => FloatPredicate::OEQ,
                    CompareOp::Ne => FloatPredicate::ONE,
                };
                Ok(self.builder.build_float_compare(predicate, l, r, "fcmp")?.into())
            }
            _ => {
                let (l, r) = (lhs.into_int_value(), rhs.into_int_value());
                let predicate = match op {
                    CompareOp::Lt => IntPredicate::SLT,
                    CompareOp::Le => IntPredicate::SLE,
                    CompareOp::Gt => IntPredicate::SGT,
                    CompareOp::Ge => IntPredicate::SGE,
                    CompareOp::Eq => IntPredicate::EQ,
                    CompareOp::Ne => IntPredicate::NE,
                };
                Ok(self.builder.build_int_compare(predicate, l, r, "icmp")?.into())
            }
        }
    }
}
