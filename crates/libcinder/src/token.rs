//! Token model for the cinder language.
//!
//! The token set is fixed by the external grammar (see the language
//! reference): a closed set of operators, delimiters, keywords, type
//! keywords, and four literal forms. This module only defines the shape of
//! a token; scanning source text into a `Vec<Token>` is [`crate::lexer`]'s
//! job.

use std::fmt;

use logos::Logos;

use crate::file::SourceFile;

/// A position in a source file, 1-indexed for line/column per editor
/// convention, 0-indexed for the byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Location {
    pub const fn start() -> Self {
        Location { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The payload carried by a literal token.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Floating(f64),
    String(String),
    Boolean(bool),
}

/// The closed set of token kinds produced by the lexer.
///
/// Variants are grouped to match the grammar tables: operators, delimiters,
/// keywords, type keywords, literals, and `Eof`. `#[logos(...)]` attributes
/// drive the generated scanner in [`crate::lexer`]; anything without a
/// pattern (`Literal`, `Ident`, `Eof`) is produced by hand after the
/// callback runs.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // operators
    #[token("+")]
    Plus,
    #[token("++")]
    PlusPlus,
    #[token("-")]
    Minus,
    #[token("--")]
    MinusMinus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("!=")]
    BangEqual,
    #[token("=")]
    Equal,
    #[token("==")]
    EqualEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("->")]
    Arrow,
    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,

    // delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,

    // keywords
    #[token("mod")]
    Mod,
    #[token("import")]
    Import,
    #[token("def")]
    Def,
    #[token("end")]
    End,
    #[token("extern")]
    Extern,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // type keywords
    #[token("int32")]
    Int32,
    #[token("int64")]
    Int64,
    #[token("flt32")]
    Flt32,
    #[token("flt64")]
    Flt64,
    #[token("bool")]
    BoolKw,
    #[token("str")]
    StrKw,
    #[token("void")]
    VoidKw,
    #[token("struct")]
    StructKw,

    // literals
    #[regex(r"[0-9]+")]
    IntLiteral,
    #[regex(r"[0-9]+\.[0-9]+")]
    FloatLiteral,
    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLiteral,
    #[regex(r"[_A-Za-z][_A-Za-z0-9]*")]
    Ident,

    /// Synthetic end-of-file marker appended once after scanning completes.
    Eof,
}

impl TokenKind {
    pub fn is_primitive_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Int32
                | TokenKind::Int64
                | TokenKind::Flt32
                | TokenKind::Flt64
                | TokenKind::BoolKw
                | TokenKind::StrKw
                | TokenKind::VoidKw
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A single scanned token: its kind, exact source span, the verbatim
/// lexeme, and (for literal kinds) the decoded value.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub file: SourceFile,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?}) at {}", self.kind, self.lexeme, self.location)
    }
}
