//! Recursive-descent parser: one token of lookahead, no backtracking except
//! the bounded `typeSpec ':'` lookahead used to tell a variable declaration
//! apart from an expression statement (spec §4.2).

use crate::ast::{
    BinaryOp, CompareOp, Expr, ForStmt, FuncArg, FunctionProto, IfStmt, Module, PrefixOp, Stmt, StructField, TypeSpec,
};
use crate::token::{Literal, Token, TokenKind};

const MAX_ARGS: usize = 255;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token {found:?}, expected {expected} at line {line}")]
    Unexpected { expected: String, found: TokenKind, line: u32 },
    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("invalid assignment target at line {line}")]
    InvalidAssignTarget { line: u32 },
    #[error("function has more than {MAX_ARGS} parameters at line {line}")]
    TooManyParameters { line: u32 },
    #[error("'...' must be the last parameter at line {line}")]
    VariadicNotLast { line: u32 },
}

pub fn parse(tokens: Vec<Token>) -> Result<Module, ParseError> {
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else if self.at_eof() {
            Err(ParseError::UnexpectedEof { expected: what.to_string() })
        } else {
            Err(ParseError::Unexpected { expected: what.to_string(), found: self.peek_kind(), line: self.peek().location.line })
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<Token, ParseError> {
        self.expect(TokenKind::Ident, what)
    }

    // ---- module / top level --------------------------------------------

    fn parse_module(&mut self) -> Result<Module, ParseError> {
        self.expect(TokenKind::Mod, "'mod'")?;
        let name = self.expect_ident("module name")?;
        self.expect(TokenKind::Semicolon, "';'")?;

        let mut stmts = Vec::new();
        while self.check(TokenKind::Import) {
            stmts.push(self.parse_import()?);
        }
        while !self.at_eof() {
            stmts.push(self.parse_toplevel()?);
        }
        Ok(Module { name, stmts })
    }

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Import, "'import'")?;
        let module_name = self.expect_ident("imported module name")?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::Import { module_name })
    }

    fn parse_toplevel(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Extern => {
                self.advance();
                let proto = self.parse_function_prototype(true)?;
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Stmt::FunctionProto { proto, id: Default::default() })
            }
            TokenKind::StructKw => self.parse_struct(),
            TokenKind::Def => self.parse_function_def(),
            _ => Err(ParseError::Unexpected { expected: "'extern', 'struct', or 'def'".to_string(), found: self.peek_kind(), line: self.peek().location.line }),
        }
    }

    fn parse_struct(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::StructKw, "'struct'")?;
        let name = self.expect_ident("struct name")?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::End) {
            let type_token = self.parse_type_spec()?;
            self.expect(TokenKind::Colon, "':'")?;
            let field_name = self.expect_ident("field name")?;
            self.expect(TokenKind::Semicolon, "';'")?;
            fields.push(StructField { type_token, name: field_name });
        }
        self.expect(TokenKind::End, "'end'")?;
        Ok(Stmt::StructStmt { name, fields, id: Default::default() })
    }

    fn parse_function_def(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Def, "'def'")?;
        let proto = self.parse_function_prototype(false)?;
        let mut body = Vec::new();
        while !self.check(TokenKind::End) {
            body.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::End, "'end'")?;
        Ok(Stmt::FunctionStmt { proto, body, id: Default::default() })
    }

    fn parse_function_prototype(&mut self, is_extern: bool) -> Result<FunctionProto, ParseError> {
        let name = self.expect_ident("function name")?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        let mut is_variadic = false;
        if !self.check(TokenKind::RParen) {
            loop {
                if self.check(TokenKind::Ellipsis) {
                    let dots = self.advance();
                    is_variadic = true;
                    if !self.check(TokenKind::RParen) {
                        return Err(ParseError::VariadicNotLast { line: dots.location.line });
                    }
                    break;
                }
                let type_token = self.parse_type_spec()?;
                let identifier = self.expect_ident("parameter name")?;
                if args.len() >= MAX_ARGS {
                    return Err(ParseError::TooManyParameters { line: identifier.location.line });
                }
                args.push(FuncArg { type_token, identifier, resolved_type: Default::default(), resolved_id: Default::default() });
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Arrow, "'->'")?;
        let return_type = self.parse_type_spec()?;
        Ok(FunctionProto { name, return_type, args, is_variadic, is_extern })
    }

    /// `typeSpec := primitiveKeyword | IDENT ('.' IDENT)*`.
    fn parse_type_spec(&mut self) -> Result<TypeSpec, ParseError> {
        if self.peek_kind().is_primitive_type_keyword() {
            Ok(TypeSpec::Primitive(self.advance()))
        } else {
            let mut parts = vec![self.expect_ident("type name")?];
            while self.check(TokenKind::Dot) {
                self.advance();
                parts.push(self.expect_ident("type name segment")?);
            }
            Ok(TypeSpec::Named(parts))
        }
    }

    /// Speculatively parses a `typeSpec ':'` prefix used to disambiguate a
    /// `varDecl` from an expression statement that merely starts with an
    /// identifier (e.g. an assignment or a bare call). Restores `pos` if the
    /// lookahead doesn't pan out.
    fn try_type_spec_with_colon(&mut self) -> Option<TypeSpec> {
        let checkpoint = self.pos;
        if let Ok(spec) = self.parse_type_spec() {
            if self.check(TokenKind::Colon) {
                return Some(spec);
            }
        }
        self.pos = checkpoint;
        None
    }

    // ---- statements -------------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            _ => {
                if let Some(type_token) = self.try_type_spec_with_colon() {
                    self.parse_var_declaration(type_token)
                } else {
                    self.parse_expr_stmt()
                }
            }
        }
    }

    fn parse_var_declaration(&mut self, type_token: TypeSpec) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Colon, "':'")?;
        let name = self.expect_ident("variable name")?;
        self.expect(TokenKind::Equal, "'='")?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::VarDeclaration { type_token, name, value, id: Default::default() })
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::Expression { expr })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let ret_token = self.expect(TokenKind::Return, "'return'")?;
        let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::Return { ret_token, value })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::If, "'if'")?;
        let cond = self.parse_expr()?;
        let then_branch = Box::new(self.parse_stmt()?);

        let mut elifs = Vec::new();
        while self.check(TokenKind::Elif) {
            self.advance();
            let elif_cond = self.parse_expr()?;
            let elif_body = Box::new(self.parse_stmt()?);
            elifs.push((elif_cond, elif_body));
        }

        let else_branch = if self.check(TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        self.expect(TokenKind::End, "'end'")?;
        Ok(Stmt::If(IfStmt { cond, then_branch, elifs, else_branch }))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::For, "'for'")?;
        let init = Box::new(self.parse_stmt()?);
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        let step = Some(self.parse_expr()?);
        let mut body = Vec::new();
        while !self.check(TokenKind::End) {
            body.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::End, "'end'")?;
        Ok(Stmt::For(ForStmt { init, cond, step, body }))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::While, "'while'")?;
        let cond = self.parse_expr()?;
        let mut body = Vec::new();
        while !self.check(TokenKind::End) {
            body.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::End, "'end'")?;
        Ok(Stmt::While { cond, body })
    }

    // ---- expressions (Pratt-style, lowest precedence first) --------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_comparison()?;
        if self.check(TokenKind::Equal) {
            self.advance();
            let value = Box::new(self.parse_assign()?);
            return match target {
                Expr::Variable { name, id, .. } => Ok(Expr::Assign { name, value, id, ty: Default::default() }),
                Expr::MemberAccess { .. } => Ok(Expr::MemberAssign { target: Box::new(target), value, base_id: Default::default(), ty: Default::default() }),
                other => Err(ParseError::InvalidAssignTarget { line: other.location().line }),
            };
        }
        Ok(target)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        while let Some(op) = compare_op(self.peek_kind()) {
            let op_token = self.advance();
            let right = self.parse_term()?;
            left = Expr::Conditional { left: Box::new(left), op, op_token, right: Box::new(right), ty: Default::default() };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let op_token = self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary { left: Box::new(left), op, op_token, right: Box::new(right), ty: Default::default() };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let op_token = self.advance();
            let right = self.parse_prefix()?;
            left = Expr::Binary { left: Box::new(left), op, op_token, right: Box::new(right), ty: Default::default() };
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::PlusPlus => Some(PrefixOp::Increment),
            TokenKind::MinusMinus => Some(PrefixOp::Decrement),
            _ => None,
        };
        if let Some(op) = op {
            let op_token = self.advance();
            let name = self.expect_ident("identifier after '++'/'--'")?;
            return Ok(Expr::PreFixOp { op, op_token, name, id: Default::default(), ty: Default::default() });
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let callee = self.parse_atom()?;
        if self.check(TokenKind::LParen) {
            let call_token = self.advance();
            let mut args = Vec::new();
            if !self.check(TokenKind::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if self.check(TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(Expr::CallExpr { callee: Box::new(callee), call_token, args, id: Default::default(), ty: Default::default() });
        }
        Ok(callee)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral | TokenKind::True | TokenKind::False => {
                let token = self.advance();
                let value = token.literal.clone().expect("literal token without decoded payload");
                Ok(Expr::Literal { token, value, ty: Default::default() })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::Grouping { inner: Box::new(inner), ty: Default::default() })
            }
            TokenKind::Ident => {
                let name = self.advance();
                let mut expr = Expr::Variable { name, id: Default::default(), ty: Default::default() };
                while self.check(TokenKind::Dot) {
                    self.advance();
                    let member = self.expect_ident("member name")?;
                    expr = Expr::MemberAccess { object: Box::new(expr), member, field_index: Default::default(), id: Default::default(), ty: Default::default() };
                }
                Ok(expr)
            }
            _ => Err(ParseError::Unexpected { expected: "an expression".to_string(), found: self.peek_kind(), line: self.peek().location.line }),
        }
    }
}

fn compare_op(kind: TokenKind) -> Option<CompareOp> {
    Some(match kind {
        TokenKind::Less => CompareOp::Lt,
        TokenKind::LessEqual => CompareOp::Le,
        TokenKind::Greater => CompareOp::Gt,
        TokenKind::GreaterEqual => CompareOp::Ge,
        TokenKind::EqualEqual => CompareOp::Eq,
        TokenKind::BangEqual => CompareOp::Ne,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::SourceFile;
    use crate::lexer::lex;

    fn parse_source(src: &str) -> Module {
        let file = SourceFile::new("<test>", src);
        let tokens = lex(&file).unwrap();
        parse(tokens).unwrap()
    }

    #[test]
    fn arithmetic_function() {
        let module = parse_source("mod demo;\ndef add(int32 a, int32 b) -> int32\n  return a + b;\nend\n");
        assert_eq!(module.name.lexeme, "demo");
        assert_eq!(module.stmts.len(), 1);
        match &module.stmts[0] {
            Stmt::FunctionStmt { proto, body, .. } => {
                assert_eq!(proto.name.lexeme, "add");
                assert_eq!(proto.args.len(), 2);
                assert!(!proto.is_variadic);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected FunctionStmt, got {other:?}"),
        }
    }

    #[test]
    fn var_declaration_vs_expression_statement() {
        let module = parse_source("mod demo;\ndef f() -> int32\n  int32: x = 1;\n  x = 2;\n  return x;\nend\n");
        let Stmt::FunctionStmt { body, .. } = &module.stmts[0] else { panic!("expected function") };
        assert!(matches!(body[0], Stmt::VarDeclaration { .. }));
        assert!(matches!(body[1], Stmt::Expression { expr: Expr::Assign { .. } }));
    }

    #[test]
    fn cross_module_struct_constructor_call() {
        let module = parse_source("mod main;\nimport math;\ndef main() -> int32\n  math.Vector2: p = math.Vector2(1, 2);\n  return 0;\nend\n");
        assert!(matches!(module.stmts[0], Stmt::Import { .. }));
        let Stmt::FunctionStmt { body, .. } = &module.stmts[1] else { panic!("expected function") };
        match &body[0] {
            Stmt::VarDeclaration { type_token, value, .. } => {
                assert_eq!(type_token.display_name(), "math.Vector2");
                assert!(matches!(value, Expr::CallExpr { .. }));
            }
            other => panic!("expected VarDeclaration, got {other:?}"),
        }
    }

    #[test]
    fn elif_chain() {
        let module = parse_source("mod demo;\ndef f(int32 x) -> int32\n  if x == 1 return 1; elif x == 2 return 2; else return 0; end\nend\n");
        let Stmt::FunctionStmt { body, .. } = &module.stmts[0] else { panic!("expected function") };
        match &body[0] {
            Stmt::If(if_stmt) => {
                assert_eq!(if_stmt.elifs.len(), 1);
                assert!(if_stmt.else_branch.is_some());
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn variadic_prototype() {
        let module = parse_source("mod demo;\nextern printf(str fmt, ...) -> int32;\n");
        match &module.stmts[0] {
            Stmt::FunctionProto { proto, .. } => {
                assert!(proto.is_variadic);
                assert!(proto.is_extern);
                assert_eq!(proto.args.len(), 1);
            }
            other => panic!("expected FunctionProto, got {other:?}"),
        }
    }

    #[test]
    fn too_many_parameters_is_rejected() {
        let mut src = String::from("mod demo;\ndef f(");
        for i in 0..256 {
            if i > 0 {
                src.push(',');
            }
            src.push_str(&format!("int32 a{i}"));
        }
        src.push_str(") -> void\nend\n");
        let file = SourceFile::new("<test>", src);
        let tokens = lex(&file).unwrap();
        assert!(matches!(parse(tokens), Err(ParseError::TooManyParameters { .. })));
    }
}
