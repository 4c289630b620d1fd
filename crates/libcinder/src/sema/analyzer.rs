//! The semantic analyzer: three ordered passes over the topologically
//! ordered module set (spec §4.3).
//!
//! 1. **Struct pass** — reserve and then resolve every struct type.
//! 2. **Signature pass** — resolve every function prototype and intern its
//!    function type.
//! 3. **Body pass** — walk every function body, resolving names and
//!    computing expression types.
//!
//! Each pass iterates the full ordered module list once; pass ordering is
//! what guarantees forward references to structs and functions within a
//! module and across imports (spec §4.3/§5).

use crate::ast::{BinaryOp, CompareOp, Expr, ForStmt, FunctionProto, IfStmt, Module, Stmt, StructField, TypeSpec};
use crate::loader::LoadedModule;
use crate::sema::diagnostics::Diagnostics;
use crate::sema::scope::ScopeStack;
use crate::sema::symbol::{SymbolId, SymbolTable};
use crate::sema::types::{TypeContext, TypeId, TypeKind};
use crate::token::{Literal, Token};

pub struct AnalysisResult {
    pub types: TypeContext,
    pub symbols: SymbolTable,
    pub diagnostics: Diagnostics,
}

impl AnalysisResult {
    pub fn had_error(&self) -> bool {
        self.diagnostics.had_error()
    }
}

struct Analyzer {
    types: TypeContext,
    symbols: SymbolTable,
    diagnostics: Diagnostics,
    scopes: ScopeStack,
    current_return: Option<TypeId>,
}

pub fn analyze(modules: &[LoadedModule]) -> AnalysisResult {
    let mut analyzer = Analyzer {
        types: TypeContext::new(),
        symbols: SymbolTable::default(),
        diagnostics: Diagnostics::default(),
        scopes: ScopeStack::default(),
        current_return: None,
    };

    for loaded in modules {
        analyzer.struct_pass_reserve(&loaded.ast);
    }
    for loaded in modules {
        analyzer.struct_pass_resolve(&loaded.ast);
    }
    for loaded in modules {
        analyzer.signature_pass(&loaded.ast);
    }
    for loaded in modules {
        analyzer.body_pass(&loaded.ast);
    }

    AnalysisResult { types: analyzer.types, symbols: analyzer.symbols, diagnostics: analyzer.diagnostics }
}

impl Analyzer {
    fn module_name(module: &Module) -> &str {
        &module.name.lexeme
    }

    fn qualify(module_name: &str, name: &str) -> String {
        format!("{module_name}.{name}")
    }

    /// Resolves a (possibly dotted) type reference to a `TypeId`, pushing an
    /// "Invalid type" diagnostic and returning `None` on failure.
    fn resolve_type_spec(&mut self, module_name: &str, spec: &TypeSpec) -> Option<TypeId> {
        match spec {
            TypeSpec::Primitive(tok) => self.types.primitive_by_name(&tok.lexeme),
            TypeSpec::Named(parts) => {
                let display = spec.display_name();
                if parts.len() == 1 {
                    if let Some(id) = self.types.struct_by_name(&Self::qualify(module_name, &display)) {
                        return Some(id);
                    }
                } else if let Some(id) = self.types.struct_by_name(&display) {
                    return Some(id);
                }
                self.diagnostics.error(format!("Invalid type: {display}"), spec.location().line);
                None
            }
        }
    }

    // ---- Pass 1a: reserve every struct's TypeId + global symbol --------

    fn struct_pass_reserve(&mut self, module: &Module) {
        let module_name = module.name.lexeme.clone();
        for stmt in &module.stmts {
            if let Stmt::StructStmt { name, .. } = stmt {
                let qualified = Self::qualify(&module_name, &name.lexeme);
                match self.types.reserve_struct(qualified.clone()) {
                    Some(struct_ty) => {
                        if self.symbols.declare_global(qualified, struct_ty, false).is_err() {
                            self.diagnostics.error(format!("Redeclaration of struct: {}", name.lexeme), name.location.line);
                        }
                    }
                    None => {
                        self.diagnostics.error(format!("Redeclaration of struct: {}", name.lexeme), name.location.line);
                    }
                }
            }
        }
    }

    // ---- Pass 1b: resolve every struct's fields -------------------------

    fn struct_pass_resolve(&mut self, module: &Module) {
        let module_name = module.name.lexeme.clone();
        for stmt in &module.stmts {
            if let Stmt::StructStmt { name, fields, id } = stmt {
                let qualified = Self::qualify(&module_name, &name.lexeme);
                let Some(struct_ty) = self.types.struct_by_name(&qualified) else { continue };
                if let Some(symbol_id) = self.symbols.lookup_global(&qualified) {
                    id.set(Some(symbol_id));
                }

                let mut resolved_fields = Vec::with_capacity(fields.len());
                let mut seen = std::collections::HashSet::new();
                for StructField { type_token, name: field_name } in fields {
                    if !seen.insert(field_name.lexeme.clone()) {
                        self.diagnostics.error(format!("Duplicate field name: {}", field_name.lexeme), field_name.location.line);
                        continue;
                    }
                    let Some(field_ty) = self.resolve_type_spec(&module_name, type_token) else { continue };
                    if matches!(self.types.get(field_ty), crate::sema::types::Type::Void) || self.types.kind(field_ty) == TypeKind::Function {
                        self.diagnostics.error(format!("Invalid field type for {}", field_name.lexeme), field_name.location.line);
                        continue;
                    }
                    resolved_fields.push((field_name.lexeme.clone(), field_ty));
                }
                self.types.set_struct_fields(struct_ty, resolved_fields);
            }
        }
    }

    // ---- Pass 2: function signatures ------------------------------------

    fn signature_pass(&mut self, module: &Module) {
        let module_name = module.name.lexeme.clone();
        for stmt in &module.stmts {
            match stmt {
                Stmt::FunctionProto { proto, id } => {
                    // A bare top-level prototype is always an `extern` declaration.
                    let symbol_id = self.declare_function_signature(&module_name, proto, proto.is_extern);
                    id.set(symbol_id);
                }
                Stmt::FunctionStmt { proto, id, .. } => {
                    let symbol_id = self.declare_function_signature(&module_name, proto, false);
                    id.set(symbol_id);
                }
                _ => {}
            }
        }
    }

    fn declare_function_signature(&mut self, module_name: &str, proto: &FunctionProto, is_extern: bool) -> Option<SymbolId> {
        let return_ty = self.resolve_type_spec(module_name, &proto.return_type)?;
        let mut params = Vec::with_capacity(proto.args.len());
        for arg in &proto.args {
            let ty = self.resolve_type_spec(module_name, &arg.type_token)?;
            arg.resolved_type.set(Some(ty));
            params.push(ty);
        }
        let fn_ty = self.types.intern_function(return_ty, params, proto.is_variadic);

        let qualified_name = if is_extern { proto.name.lexeme.clone() } else { Self::qualify(module_name, &proto.name.lexeme) };

        match self.symbols.declare_global(qualified_name.clone(), fn_ty, true) {
            Ok(id) => {
                if is_extern {
                    // §3 supplement: warn (not error) if an extern repeats a
                    // name already declared as a module-qualified function.
                    let shadowed = Self::qualify(module_name, &proto.name.lexeme);
                    if self.symbols.lookup_global(&shadowed).is_some() {
                        self.diagnostics.warning(format!("extern '{}' shadows {}", proto.name.lexeme, shadowed), proto.name.location.line);
                    }
                }
                Some(id)
            }
            Err(_existing) => {
                self.diagnostics.error(format!("Redeclaration of function: {}", proto.name.lexeme), proto.name.location.line);
                None
            }
        }
    }

    // ---- Pass 3: function bodies -----------------------------------------

    fn body_pass(&mut self, module: &Module) {
        let module_name = module.name.lexeme.clone();
        for stmt in &module.stmts {
            if let Stmt::FunctionStmt { proto, body, .. } = stmt {
                self.analyze_function_body(&module_name, proto, body);
            }
        }
    }

    fn analyze_function_body(&mut self, module_name: &str, proto: &FunctionProto, body: &[Stmt]) {
        let Some(return_ty) = self.resolve_type_spec_quiet(module_name, &proto.return_type) else {
            return;
        };
        let saved_return = self.current_return.replace(return_ty);
        self.scopes.begin();

        for arg in &proto.args {
            if let Some(ty) = arg.resolved_type.get() {
                let id = self.symbols.declare(arg.identifier.lexeme.clone(), ty, false);
                arg.resolved_id.set(Some(id));
                if self.scopes.declare(arg.identifier.lexeme.clone(), id).is_err() {
                    self.diagnostics.error(format!("Redeclaration of parameter: {}", arg.identifier.lexeme), arg.identifier.location.line);
                }
            }
        }

        for stmt in body {
            self.analyze_stmt(module_name, stmt);
        }

        self.scopes.end();
        self.current_return = saved_return;
    }

    fn resolve_type_spec_quiet(&self, module_name: &str, spec: &TypeSpec) -> Option<TypeId> {
        match spec {
            TypeSpec::Primitive(tok) => self.types.primitive_by_name(&tok.lexeme),
            TypeSpec::Named(_) => {
                let display = spec.display_name();
                self.types.struct_by_name(&display).or_else(|| self.types.struct_by_name(&Self::qualify(module_name, &display)))
            }
        }
    }

    fn analyze_stmt(&mut self, module_name: &str, stmt: &Stmt) {
        match stmt {
            Stmt::VarDeclaration { type_token, name, value, id } => {
                self.analyze_expr(module_name, value);
                let Some(declared_ty) = self.resolve_type_spec(module_name, type_token) else { return };
                if let Some(value_ty) = value.ty() {
                    if value_ty != declared_ty {
                        self.diagnostics.error(format!("Type mismatch in declaration: {}", name.lexeme), name.location.line);
                    }
                }
                let symbol_id = self.symbols.declare(Self::qualify(module_name, &name.lexeme), declared_ty, false);
                if self.scopes.declare(name.lexeme.clone(), symbol_id).is_err() {
                    self.diagnostics.error(format!("Redeclaration of variable: {}", name.lexeme), name.location.line);
                    return;
                }
                id.set(Some(symbol_id));
            }
            Stmt::Expression { expr } => self.analyze_expr(module_name, expr),
            Stmt::Return { ret_token, value } => {
                let return_ty = self.current_return;
                match (value, return_ty) {
                    (None, Some(ty)) if self.types.kind(ty) != TypeKind::Void => {
                        self.diagnostics.error("Return value required", ret_token.location.line);
                    }
                    (Some(expr), Some(ty)) => {
                        self.analyze_expr(module_name, expr);
                        if self.types.kind(ty) == TypeKind::Void {
                            self.diagnostics.error("Unexpected return value in void function", ret_token.location.line);
                        } else if let Some(expr_ty) = expr.ty() {
                            if self.types.kind(expr_ty) != self.types.kind(ty) {
                                self.diagnostics.error("Type mismatch in return", ret_token.location.line);
                            }
                        }
                    }
                    (Some(expr), None) => self.analyze_expr(module_name, expr),
                    (None, None) => {}
                    (None, Some(_)) => {}
                }
            }
            Stmt::If(IfStmt { cond, then_branch, elifs, else_branch }) => {
                self.check_condition(module_name, cond);
                self.analyze_stmt(module_name, then_branch);
                for (elif_cond, elif_body) in elifs {
                    self.check_condition(module_name, elif_cond);
                    self.analyze_stmt(module_name, elif_body);
                }
                if let Some(else_branch) = else_branch {
                    self.analyze_stmt(module_name, else_branch);
                }
            }
            Stmt::While { cond, body } => {
                self.check_condition(module_name, cond);
                for stmt in body {
                    self.analyze_stmt(module_name, stmt);
                }
            }
            Stmt::For(ForStmt { init, cond, step, body }) => {
                self.scopes.begin();
                self.analyze_stmt(module_name, init);
                self.check_condition(module_name, cond);
                if let Some(step) = step {
                    self.analyze_expr(module_name, step);
                }
                for stmt in body {
                    self.analyze_stmt(module_name, stmt);
                }
                self.scopes.end();
            }
            // Module/Import/FunctionProto/FunctionStmt/StructStmt cannot
            // appear nested inside a body; nothing to do for them here.
            Stmt::Module { .. } | Stmt::Import { .. } | Stmt::FunctionProto { .. } | Stmt::FunctionStmt { .. } | Stmt::StructStmt { .. } => {}
        }
    }

    fn check_condition(&mut self, module_name: &str, cond: &Expr) {
        self.analyze_expr(module_name, cond);
    }

    fn analyze_expr(&mut self, module_name: &str, expr: &Expr) {
        match expr {
            Expr::Literal { value, ty, .. } => {
                let resolved = match value {
                    Literal::Integer(_) => self.types.int32,
                    Literal::Floating(_) => self.types.flt32,
                    Literal::String(_) => self.types.string_ty,
                    Literal::Boolean(_) => self.types.bool_ty,
                };
                ty.set(Some(resolved));
            }
            Expr::Variable { name, id, ty } => {
                if let Some(symbol_id) = self.resolve_name(module_name, &name.lexeme) {
                    id.set(Some(symbol_id));
                    ty.set(Some(self.symbols.get(symbol_id).ty));
                } else {
                    self.diagnostics.error(format!("Undeclared identifier: {}", name.lexeme), name.location.line);
                }
            }
            Expr::Grouping { inner, ty } => {
                self.analyze_expr(module_name, inner);
                ty.set(inner.ty());
            }
            Expr::PreFixOp { op: _, op_token, name, id, ty } => {
                if let Some(symbol_id) = self.resolve_name(module_name, &name.lexeme) {
                    id.set(Some(symbol_id));
                    let symbol_ty = self.symbols.get(symbol_id).ty;
                    let kind = self.types.kind(symbol_ty);
                    if kind != TypeKind::Int && kind != TypeKind::Float {
                        self.diagnostics.error(format!("++/-- target must be numeric: {}", name.lexeme), op_token.location.line);
                    } else {
                        ty.set(Some(symbol_ty));
                    }
                } else {
                    self.diagnostics.error(format!("Undeclared identifier: {}", name.lexeme), name.location.line);
                }
            }
            Expr::Binary { left, op, op_token, right, ty } => {
                self.analyze_expr(module_name, left);
                self.analyze_expr(module_name, right);
                if let (Some(lt), Some(rt)) = (left.ty(), right.ty()) {
                    if self.types.kind(lt) != self.types.kind(rt) {
                        self.diagnostics.error(format!("Type mismatch in binary '{}'", binary_op_symbol(*op)), op_token.location.line);
                    } else {
                        ty.set(Some(lt));
                    }
                }
            }
            Expr::Conditional { left, op: _, op_token, right, ty } => {
                self.analyze_expr(module_name, left);
                self.analyze_expr(module_name, right);
                if let (Some(lt), Some(rt)) = (left.ty(), right.ty()) {
                    if self.types.kind(lt) != self.types.kind(rt) {
                        self.diagnostics.error(format!("Type mismatch in comparison '{}'", compare_op_symbol(*op)), op_token.location.line);
                    } else {
                        ty.set(Some(self.types.bool_ty));
                    }
                }
            }
            Expr::Assign { name, value, id, ty } => {
                self.analyze_expr(module_name, value);
                if let Some(symbol_id) = self.resolve_name(module_name, &name.lexeme) {
                    id.set(Some(symbol_id));
                    let declared_ty = self.symbols.get(symbol_id).ty;
                    if let Some(value_ty) = value.ty() {
                        if value_ty != declared_ty {
                            self.diagnostics.error(format!("Type mismatch in assignment: {}", name.lexeme), name.location.line);
                        } else {
                            ty.set(Some(declared_ty));
                        }
                    }
                } else {
                    self.diagnostics.error(format!("Undeclared identifier: {}", name.lexeme), name.location.line);
                }
            }
            Expr::MemberAccess { object, member, field_index, id, ty } => {
                self.analyze_expr(module_name, object);
                if let Some(object_ty) = object.ty() {
                    if self.types.kind(object_ty) == TypeKind::Struct {
                        match self.types.struct_field(object_ty, &member.lexeme) {
                            Some((index, field_ty)) => {
                                field_index.set(Some(index));
                                ty.set(Some(field_ty));
                                if let Expr::Variable { id: base_id, .. } = object.as_ref() {
                                    id.set(base_id.get());
                                }
                            }
                            None => self.diagnostics.error(format!("Unknown field: {}", member.lexeme), member.location.line),
                        }
                        return;
                    }
                }
                // Not a struct member access: treat as a cross-module qualified reference.
                if let Expr::Variable { name: base_name, .. } = object.as_ref() {
                    let qualified = format!("{}.{}", base_name.lexeme, member.lexeme);
                    if let Some(symbol_id) = self.symbols.lookup_global(&qualified) {
                        id.set(Some(symbol_id));
                        ty.set(Some(self.symbols.get(symbol_id).ty));
                        return;
                    }
                }
                self.diagnostics.error(format!("Undeclared identifier: {}", member.lexeme), member.location.line);
            }
            Expr::MemberAssign { target, value, base_id, ty } => {
                self.analyze_expr(module_name, target);
                self.analyze_expr(module_name, value);
                if let Expr::MemberAccess { id, .. } = target.as_ref() {
                    base_id.set(id.get());
                }
                if let (Some(target_ty), Some(value_ty)) = (target.ty(), value.ty()) {
                    if target_ty != value_ty {
                        self.diagnostics.error("Type mismatch in member assignment", target.location().line);
                    } else {
                        ty.set(Some(target_ty));
                    }
                }
            }
            Expr::CallExpr { callee, call_token, args, id, ty } => {
                self.analyze_call(module_name, callee, call_token, args, id, ty);
            }
        }
    }

    fn analyze_call(&mut self, module_name: &str, callee: &Expr, call_token: &Token, args: &[Expr], id: &crate::ast::Annotation<SymbolId>, ty: &crate::ast::Annotation<TypeId>) {
        for arg in args {
            self.analyze_expr(module_name, arg);
        }

        let callee_symbol = match callee {
            Expr::Variable { name, .. } => self.resolve_name(module_name, &name.lexeme),
            Expr::MemberAccess { object, member, .. } => {
                if let Expr::Variable { name: base_name, .. } = object.as_ref() {
                    let qualified = format!("{}.{}", base_name.lexeme, member.lexeme);
                    self.symbols.lookup_global(&qualified)
                } else {
                    None
                }
            }
            _ => None,
        };

        let Some(symbol_id) = callee_symbol else {
            self.diagnostics.error("Call to undeclared symbol", call_token.location.line);
            return;
        };
        id.set(Some(symbol_id));
        let symbol = self.symbols.get(symbol_id);
        let symbol_ty = symbol.ty;

        match self.types.get(symbol_ty).clone() {
            crate::sema::types::Type::Function { return_type, params, variadic } => {
                if variadic {
                    if args.len() < params.len() {
                        self.diagnostics.error("Too few arguments", call_token.location.line);
                        return;
                    }
                } else if args.len() != params.len() {
                    self.diagnostics.error("Argument count mismatch", call_token.location.line);
                    return;
                }
                for (index, param_ty) in params.iter().enumerate() {
                    if let Some(arg_ty) = args[index].ty() {
                        if self.types.kind(arg_ty) != self.types.kind(*param_ty) {
                            self.diagnostics.error(format!("Argument {} type mismatch", index + 1), call_token.location.line);
                        }
                    }
                }
                if variadic {
                    for arg in &args[params.len()..] {
                        if let Some(arg_ty) = arg.ty() {
                            let promoted = self.promote_variadic(arg_ty);
                            arg.set_ty(promoted);
                        }
                    }
                }
                ty.set(Some(return_type));
            }
            crate::sema::types::Type::Struct { fields, .. } => {
                if args.len() != fields.len() {
                    self.diagnostics.error("Struct constructor argument count mismatch", call_token.location.line);
                    return;
                }
                for (index, (_, field_ty)) in fields.iter().enumerate() {
                    if let Some(arg_ty) = args[index].ty() {
                        if self.types.kind(arg_ty) != self.types.kind(*field_ty) {
                            self.diagnostics.error(format!("Constructor argument {} type mismatch", index + 1), call_token.location.line);
                        }
                    }
                }
                ty.set(Some(symbol_ty));
            }
            _ => {
                self.diagnostics.error("Called value is not a function or struct", call_token.location.line);
            }
        }
    }

    /// Default-argument promotion applied to variadic arguments past the
    /// fixed parameter count (spec §4.3 "variadic promotion"): bool/int
    /// collapse to `int32`, any float width collapses to `flt32`, anything
    /// else (string, struct) is left untouched.
    fn promote_variadic(&self, ty: TypeId) -> TypeId {
        match self.types.kind(ty) {
            TypeKind::Bool | TypeKind::Int => self.types.int32,
            TypeKind::Float => self.types.flt32,
            _ => ty,
        }
    }

    /// Bare-identifier resolution order (spec §4.3): walk the scope stack,
    /// then fall back to `MODULE.name` in the global table.
    fn resolve_name(&self, module_name: &str, name: &str) -> Option<SymbolId> {
        self.scopes.resolve(name).or_else(|| self.symbols.lookup_global(&Self::qualify(module_name, name)))
    }
}

fn binary_op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
    }
}

fn compare_op_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
    }
}
