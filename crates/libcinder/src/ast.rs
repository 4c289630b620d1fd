//! Abstract syntax tree for the cinder language.
//!
//! Expression and statement nodes are tagged sum types (no visitor base
//! class): each compiler pass matches on the variant it cares about. Every
//! expression and statement carries two mutable annotation slots, `ty` and
//! `id`, that start `None` after parsing and are filled in by the semantic
//! analyzer (see [`crate::sema::analyzer`]). An implementation could instead
//! keep side tables keyed by a per-node id; the annotations-on-the-node
//! approach avoids a parallel typed-AST copy.

use std::cell::Cell;

use strum_macros::EnumIs;

use crate::sema::symbol::SymbolId;
use crate::sema::types::TypeId;
use crate::token::{Literal, Location, Token};

/// Cell-based annotation slot filled in during semantic analysis.
pub type Annotation<T> = Cell<Option<T>>;

fn empty<T>() -> Annotation<T> {
    Cell::new(None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone)]
pub struct FuncArg {
    pub type_token: TypeSpec,
    pub identifier: Token,
    pub resolved_type: Annotation<TypeId>,
    /// Symbol id of the parameter binding, set by the body pass when it
    /// declares the parameter into the function's scope (spec §4.4: the
    /// emitter keys its IR binding table off this, the same way it would
    /// off any other declaration's `id`).
    pub resolved_id: Annotation<SymbolId>,
}

/// A possibly-qualified type reference, e.g. `int32` or `math.Vector2`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Primitive(Token),
    Named(Vec<Token>),
}

impl TypeSpec {
    /// Source-text form used for diagnostics (`"math.Vector2"`).
    pub fn display_name(&self) -> String {
        match self {
            TypeSpec::Primitive(tok) => tok.lexeme.clone(),
            TypeSpec::Named(parts) => parts.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>().join("."),
        }
    }

    pub fn location(&self) -> Location {
        match self {
            TypeSpec::Primitive(tok) => tok.location,
            TypeSpec::Named(parts) => parts[0].location,
        }
    }
}

/// Expression nodes. `ty`/`id` are populated by the analyzer; every
/// reachable expression in an error-free program has `ty.is_some()`, and
/// every `Variable`/`Assign`/`PreFixOp`/`MemberAccess`/`CallExpr` has
/// `id.is_some()` (spec invariant, see `crate::sema`).
#[derive(Debug, Clone, EnumIs)]
pub enum Expr {
    Literal { token: Token, value: Literal, ty: Annotation<TypeId> },
    Variable { name: Token, id: Annotation<SymbolId>, ty: Annotation<TypeId> },
    Grouping { inner: Box<Expr>, ty: Annotation<TypeId> },
    PreFixOp { op: PrefixOp, op_token: Token, name: Token, id: Annotation<SymbolId>, ty: Annotation<TypeId> },
    Binary { left: Box<Expr>, op: BinaryOp, op_token: Token, right: Box<Expr>, ty: Annotation<TypeId> },
    Conditional { left: Box<Expr>, op: CompareOp, op_token: Token, right: Box<Expr>, ty: Annotation<TypeId> },
    Assign { name: Token, value: Box<Expr>, id: Annotation<SymbolId>, ty: Annotation<TypeId> },
    MemberAccess { object: Box<Expr>, member: Token, field_index: Annotation<usize>, id: Annotation<SymbolId>, ty: Annotation<TypeId> },
    MemberAssign { target: Box<Expr>, value: Box<Expr>, base_id: Annotation<SymbolId>, ty: Annotation<TypeId> },
    CallExpr { callee: Box<Expr>, call_token: Token, args: Vec<Expr>, id: Annotation<SymbolId>, ty: Annotation<TypeId> },
}

impl Expr {
    pub fn ty(&self) -> Option<TypeId> {
        match self {
            Expr::Literal { ty, .. }
            | Expr::Variable { ty, .. }
            | Expr::Grouping { ty, .. }
            | Expr::PreFixOp { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Conditional { ty, .. }
            | Expr::Assign { ty, .. }
            | Expr::MemberAccess { ty, .. }
            | Expr::MemberAssign { ty, .. }
            | Expr::CallExpr { ty, .. } => ty.get(),
        }
    }

    pub fn set_ty(&self, value: TypeId) {
        let cell = match self {
            Expr::Literal { ty, .. }
            | Expr::Variable { ty, .. }
            | Expr::Grouping { ty, .. }
            | Expr::PreFixOp { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Conditional { ty, .. }
            | Expr::Assign { ty, .. }
            | Expr::MemberAccess { ty, .. }
            | Expr::MemberAssign { ty, .. }
            | Expr::CallExpr { ty, .. } => ty,
        };
        cell.set(Some(value));
    }

    pub fn id(&self) -> Option<SymbolId> {
        match self {
            Expr::Variable { id, .. }
            | Expr::PreFixOp { id, .. }
            | Expr::Assign { id, .. }
            | Expr::MemberAccess { id, .. }
            | Expr::CallExpr { id, .. } => id.get(),
            _ => None,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Expr::Literal { token, .. } => token.location,
            Expr::Variable { name, .. } => name.location,
            Expr::Grouping { inner, .. } => inner.location(),
            Expr::PreFixOp { op_token, .. } => op_token.location,
            Expr::Binary { op_token, .. } => op_token.location,
            Expr::Conditional { op_token, .. } => op_token.location,
            Expr::Assign { name, .. } => name.location,
            Expr::MemberAccess { member, .. } => member.location,
            Expr::MemberAssign { target, .. } => target.location(),
            Expr::CallExpr { call_token, .. } => call_token.location,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionProto {
    pub name: Token,
    pub return_type: TypeSpec,
    pub args: Vec<FuncArg>,
    pub is_variadic: bool,
    pub is_extern: bool,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: Box<Stmt>,
    /// `elif` chain: each condition/body pair, tried in order before the
    /// final `else`.
    pub elifs: Vec<(Expr, Box<Stmt>)>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Box<Stmt>,
    pub cond: Expr,
    pub step: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub type_token: TypeSpec,
    pub name: Token,
}

/// Statement nodes. `id` is only meaningfully populated for declarations
/// (functions, structs) that need a stable symbol id recorded on the node
/// itself; most statement kinds leave it `None`.
#[derive(Debug, Clone, EnumIs)]
pub enum Stmt {
    Module { name: Token, stmts: Vec<Stmt> },
    Import { module_name: Token },
    Expression { expr: Expr },
    VarDeclaration { type_token: TypeSpec, name: Token, value: Expr, id: Annotation<SymbolId> },
    FunctionProto { proto: FunctionProto, id: Annotation<SymbolId> },
    FunctionStmt { proto: FunctionProto, body: Vec<Stmt>, id: Annotation<SymbolId> },
    Return { ret_token: Token, value: Option<Expr> },
    If(IfStmt),
    For(ForStmt),
    While { cond: Expr, body: Vec<Stmt> },
    StructStmt { name: Token, fields: Vec<StructField>, id: Annotation<SymbolId> },
}

impl Stmt {
    pub fn location(&self) -> Location {
        match self {
            Stmt::Module { name, .. } => name.location,
            Stmt::Import { module_name } => module_name.location,
            Stmt::Expression { expr } => expr.location(),
            Stmt::VarDeclaration { name, .. } => name.location,
            Stmt::FunctionProto { proto, .. } => proto.name.location,
            Stmt::FunctionStmt { proto, .. } => proto.name.location,
            Stmt::Return { ret_token, .. } => ret_token.location,
            Stmt::If(if_stmt) => if_stmt.cond.location(),
            Stmt::For(for_stmt) => for_stmt.cond.location(),
            Stmt::While { cond, .. } => cond.location(),
            Stmt::StructStmt { name, .. } => name.location,
        }
    }
}

/// Root node: one parsed `.ci` file.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: Token,
    pub stmts: Vec<Stmt>,
}
