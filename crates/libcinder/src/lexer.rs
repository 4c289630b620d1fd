//! Scans source text into a `Vec<Token>`.
//!
//! This is the collaborator the parser assumes already ran: it owns no
//! grammar knowledge beyond the token set in [`crate::token`]. Line/column
//! tracking is maintained by hand alongside `logos`'s byte spans, since
//! `logos` itself only hands back offsets.

use logos::Logos;

use crate::file::SourceFile;
use crate::token::{Literal, Location, Token, TokenKind};

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum LexError {
    #[error("invalid character {character:?} at line {line}")]
    InvalidCharacter { character: char, line: u32, offset: u32 },
    #[error("unterminated string literal starting at line {line}")]
    UnterminatedString { line: u32, offset: u32 },
}

impl LexError {
    pub fn line(&self) -> u32 {
        match self {
            LexError::InvalidCharacter { line, .. } => *line,
            LexError::UnterminatedString { line, .. } => *line,
        }
    }
}

/// Scans `file`'s source text in full and returns the token stream,
/// terminated by a single trailing `Eof` token.
pub fn lex(file: &SourceFile) -> Result<Vec<Token>, LexError> {
    let source = file.source();
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    let mut line_starts = vec![0usize];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            line_starts.push(i + 1);
        }
    }

    let locate = |offset: usize| -> Location {
        let line_idx = match line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = offset - line_starts[line_idx] + 1;
        Location { line: (line_idx + 1) as u32, column: column as u32, offset: offset as u32 }
    };

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let location = locate(span.start);
        match result {
            Ok(kind) => {
                let lexeme = lexer.slice().to_string();
                let literal = decode_literal(kind, &lexeme, location)?;
                tokens.push(Token { kind, location, lexeme, literal, file: file.clone() });
            }
            Err(()) => {
                let ch = lexer.slice().chars().next().unwrap_or('\0');
                if ch == '"' {
                    return Err(LexError::UnterminatedString { line: location.line, offset: location.offset });
                }
                return Err(LexError::InvalidCharacter { character: ch, line: location.line, offset: location.offset });
            }
        }
    }

    let eof_location = locate(source.len());
    tokens.push(Token {
        kind: TokenKind::Eof,
        location: eof_location,
        lexeme: String::new(),
        literal: None,
        file: file.clone(),
    });
    Ok(tokens)
}

fn decode_literal(kind: TokenKind, lexeme: &str, location: Location) -> Result<Option<Literal>, LexError> {
    match kind {
        TokenKind::IntLiteral => {
            let value: i64 = lexeme.parse().unwrap_or(0);
            Ok(Some(Literal::Integer(value)))
        }
        TokenKind::FloatLiteral => {
            let value: f64 = lexeme.parse().unwrap_or(0.0);
            Ok(Some(Literal::Floating(value)))
        }
        TokenKind::StringLiteral => Ok(Some(Literal::String(decode_string_escapes(lexeme, location)?))),
        TokenKind::True => Ok(Some(Literal::Boolean(true))),
        TokenKind::False => Ok(Some(Literal::Boolean(false))),
        _ => Ok(None),
    }
}

/// Decodes `\"`, `\n`, `\t` escapes inside a `"..."` literal. `lexeme`
/// includes the surrounding quotes.
fn decode_string_escapes(lexeme: &str, location: Location) -> Result<String, LexError> {
    let inner = &lexeme[1..lexeme.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => return Err(LexError::UnterminatedString { line: location.line, offset: location.offset }),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(source: &str) -> SourceFile {
        SourceFile::new("<test>", source)
    }

    #[test]
    fn locations_are_one_indexed() {
        let tokens = lex(&file("mod a;\nimport b;")).unwrap();
        assert_eq!(tokens[0].location.line, 1);
        assert_eq!(tokens[0].location.column, 1);
        let import_tok = tokens.iter().find(|t| t.kind == TokenKind::Import).unwrap();
        assert_eq!(import_tok.location.line, 2);
        assert_eq!(import_tok.location.column, 1);
    }

    #[test]
    fn string_escape_decoding() {
        let tokens = lex(&file(r#""\n\t\"""#)).unwrap();
        match &tokens[0].literal {
            Some(Literal::String(s)) => assert_eq!(s, "\n\t\""),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn line_comment_to_eof() {
        let tokens = lex(&file("mod a; // trailing comment\nimport b;")).unwrap();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Import));
    }

    #[test]
    fn invalid_character_is_an_error() {
        let err = lex(&file("mod a; $")).unwrap_err();
        assert!(matches!(err, LexError::InvalidCharacter { character: '$', .. }));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex(&file("\"abc")).unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn empty_source_yields_only_eof() {
        let tokens = lex(&file("")).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_eof());
    }
}
