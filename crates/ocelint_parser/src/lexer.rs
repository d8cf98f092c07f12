//! Indentation-aware tokenizer.
//!
//! Produces the token stream the parser consumes: names, literals,
//! operators, and the synthetic `Newline`/`Indent`/`Dedent` tokens
//! that encode Python's block structure. Newlines inside brackets are
//! suppressed (implicit line joining), comment-only and blank lines
//! are skipped entirely.

use crate::ParseError;

/// One lexical token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Line (1-indexed).
    pub line: u32,
    /// Column (0-indexed).
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(Op),
    Newline,
    Indent,
    Dedent,
    Eof,
}

/// Punctuation and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semi,
    Dot,
    Ellipsis,
    Assign,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Arrow,
    At,
}

struct Lexer<'s> {
    src: &'s [u8],
    pos: usize,
    line: u32,
    column: u32,
    paren_depth: usize,
    indents: Vec<u32>,
    tokens: Vec<Token>,
    at_line_start: bool,
}

/// Tokenizes a whole source unit.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        src: source.as_bytes(),
        pos: 0,
        line: 1,
        column: 0,
        paren_depth: 0,
        indents: vec![0],
        tokens: Vec::new(),
        at_line_start: true,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'s> Lexer<'s> {
    fn run(&mut self) -> Result<(), ParseError> {
        while self.pos < self.src.len() {
            if self.at_line_start && self.paren_depth == 0 {
                self.handle_indentation()?;
                if self.pos >= self.src.len() {
                    break;
                }
            }
            self.next_token()?;
        }

        // Terminate a trailing logical line, then unwind indentation.
        if matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(TokenKind::Name(_))
                | Some(TokenKind::Int(_))
                | Some(TokenKind::Float(_))
                | Some(TokenKind::Str(_))
                | Some(TokenKind::Op(_))
        ) {
            self.emit(TokenKind::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.emit(TokenKind::Dedent);
        }
        self.emit(TokenKind::Eof);
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 0;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn emit(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            line: self.line,
            column: self.column,
        });
    }

    fn emit_at(&mut self, kind: TokenKind, line: u32, column: u32) {
        self.tokens.push(Token { kind, line, column });
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.column)
    }

    /// Measures leading whitespace and emits Indent/Dedent tokens.
    fn handle_indentation(&mut self) -> Result<(), ParseError> {
        loop {
            let mut width = 0u32;
            while let Some(byte) = self.peek() {
                match byte {
                    b' ' => width += 1,
                    b'\t' => width = (width / 8 + 1) * 8,
                    _ => break,
                }
                self.bump();
            }
            match self.peek() {
                // Blank or comment-only line: swallow it whole.
                Some(b'\n') => {
                    self.bump();
                    continue;
                }
                Some(b'#') => {
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                    continue;
                }
                Some(b'\r') => {
                    self.bump();
                    continue;
                }
                None => {
                    self.at_line_start = false;
                    return Ok(());
                }
                Some(_) => {
                    self.at_line_start = false;
                    let current = *self.indents.last().unwrap_or(&0);
                    if width > current {
                        self.indents.push(width);
                        self.emit(TokenKind::Indent);
                    } else if width < current {
                        while *self.indents.last().unwrap_or(&0) > width {
                            self.indents.pop();
                            self.emit(TokenKind::Dedent);
                        }
                        if *self.indents.last().unwrap_or(&0) != width {
                            return Err(self.error("unindent does not match any outer level"));
                        }
                    }
                    return Ok(());
                }
            }
        }
    }

    fn next_token(&mut self) -> Result<(), ParseError> {
        let Some(byte) = self.peek() else {
            return Ok(());
        };
        let (line, column) = (self.line, self.column);

        match byte {
            b' ' | b'\t' => {
                self.bump();
            }
            b'\r' => {
                self.bump();
            }
            b'\n' => {
                self.bump();
                if self.paren_depth == 0 {
                    // Collapse consecutive newlines into one token.
                    if !matches!(
                        self.tokens.last().map(|t| &t.kind),
                        Some(TokenKind::Newline) | Some(TokenKind::Indent) | None
                    ) {
                        self.emit_at(TokenKind::Newline, line, column);
                    }
                }
            }
            b'#' => {
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.bump();
                }
            }
            b'\\' if self.peek_at(1) == Some(b'\n') => {
                // Explicit line joining.
                self.bump();
                self.bump();
            }
            b'"' | b'\'' => {
                let value = self.lex_string()?;
                self.emit_at(TokenKind::Str(value), line, column);
            }
            b'0'..=b'9' => {
                let kind = self.lex_number()?;
                self.emit_at(kind, line, column);
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let mut name = String::new();
                while let Some(b) = self.peek() {
                    if b.is_ascii_alphanumeric() || b == b'_' {
                        name.push(b as char);
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.emit_at(TokenKind::Name(name), line, column);
            }
            _ => {
                let op = self.lex_operator()?;
                match op {
                    Op::LParen | Op::LBracket | Op::LBrace => self.paren_depth += 1,
                    Op::RParen | Op::RBracket | Op::RBrace => {
                        self.paren_depth = self.paren_depth.saturating_sub(1)
                    }
                    _ => {}
                }
                self.emit_at(TokenKind::Op(op), line, column);
            }
        }
        Ok(())
    }

    fn lex_string(&mut self) -> Result<String, ParseError> {
        let quote = self.bump().expect("caller checked quote");
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut value = String::new();
        loop {
            let Some(byte) = self.peek() else {
                return Err(self.error("unterminated string literal"));
            };
            if byte == quote {
                if triple {
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.bump();
                        self.bump();
                        self.bump();
                        return Ok(value);
                    }
                    value.push(byte as char);
                    self.bump();
                } else {
                    self.bump();
                    return Ok(value);
                }
            } else if byte == b'\\' {
                self.bump();
                let Some(escaped) = self.bump() else {
                    return Err(self.error("unterminated string literal"));
                };
                match escaped {
                    b'n' => value.push('\n'),
                    b't' => value.push('\t'),
                    b'r' => value.push('\r'),
                    b'\\' => value.push('\\'),
                    b'\'' => value.push('\''),
                    b'"' => value.push('"'),
                    b'\n' => {}
                    other => {
                        value.push('\\');
                        value.push(other as char);
                    }
                }
            } else if byte == b'\n' && !triple {
                return Err(self.error("unterminated string literal"));
            } else {
                value.push(byte as char);
                self.bump();
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let mut text = String::new();
        let mut is_float = false;
        while let Some(byte) = self.peek() {
            match byte {
                b'0'..=b'9' | b'_' => {
                    if byte != b'_' {
                        text.push(byte as char);
                    }
                    self.bump();
                }
                b'.' if !is_float && matches!(self.peek_at(1), Some(b'0'..=b'9')) => {
                    is_float = true;
                    text.push('.');
                    self.bump();
                }
                b'e' | b'E'
                    if matches!(self.peek_at(1), Some(b'0'..=b'9'))
                        || (matches!(self.peek_at(1), Some(b'+') | Some(b'-'))
                            && matches!(self.peek_at(2), Some(b'0'..=b'9'))) =>
                {
                    is_float = true;
                    text.push('e');
                    self.bump();
                    if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                        text.push(self.bump().expect("sign checked") as char);
                    }
                }
                _ => break,
            }
        }
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| self.error(format!("invalid float literal `{text}`")))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| self.error(format!("invalid integer literal `{text}`")))
        }
    }

    fn lex_operator(&mut self) -> Result<Op, ParseError> {
        let byte = self.bump().expect("caller checked byte");
        let op = match byte {
            b'(' => Op::LParen,
            b')' => Op::RParen,
            b'[' => Op::LBracket,
            b']' => Op::RBracket,
            b'{' => Op::LBrace,
            b'}' => Op::RBrace,
            b',' => Op::Comma,
            b':' => Op::Colon,
            b';' => Op::Semi,
            b'@' => Op::At,
            b'.' => {
                if self.peek() == Some(b'.') && self.peek_at(1) == Some(b'.') {
                    self.bump();
                    self.bump();
                    Op::Ellipsis
                } else {
                    Op::Dot
                }
            }
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    Op::Eq
                } else {
                    Op::Assign
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    Op::NotEq
                } else {
                    return Err(self.error("unexpected character `!`"));
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    Op::LtEq
                } else {
                    Op::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    Op::GtEq
                } else {
                    Op::Gt
                }
            }
            b'+' => Op::Plus,
            b'-' => {
                if self.peek() == Some(b'>') {
                    self.bump();
                    Op::Arrow
                } else {
                    Op::Minus
                }
            }
            b'*' => {
                if self.peek() == Some(b'*') {
                    self.bump();
                    Op::DoubleStar
                } else {
                    Op::Star
                }
            }
            b'/' => {
                if self.peek() == Some(b'/') {
                    self.bump();
                    Op::DoubleSlash
                } else {
                    Op::Slash
                }
            }
            b'%' => Op::Percent,
            other => {
                return Err(self.error(format!("unexpected character `{}`", other as char)));
            }
        };
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn block_structure_emits_indent_dedent() {
        let toks = kinds("def f():\n    pass\n");
        assert!(toks.contains(&TokenKind::Indent));
        assert!(toks.contains(&TokenKind::Dedent));
    }

    #[test]
    fn newlines_inside_brackets_are_joined() {
        let toks = kinds("x = [\n    1,\n    2,\n]\n");
        let newline_count = toks
            .iter()
            .filter(|k| matches!(k, TokenKind::Newline))
            .count();
        assert_eq!(newline_count, 1);
        assert!(!toks.contains(&TokenKind::Indent));
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let toks = kinds("x = 1\n\n# comment\n\ny = 2\n");
        assert!(!toks.contains(&TokenKind::Indent));
        let names: Vec<_> = toks
            .iter()
            .filter(|k| matches!(k, TokenKind::Name(_)))
            .collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn triple_quoted_strings_span_lines() {
        let toks = kinds("s = \"\"\"a\nb\"\"\"\n");
        assert!(toks.contains(&TokenKind::Str("a\nb".into())));
    }

    #[test]
    fn numbers_keep_their_type() {
        let toks = kinds("a = 1\nb = 1.0\n");
        assert!(toks.contains(&TokenKind::Int(1)));
        assert!(toks.contains(&TokenKind::Float(1.0)));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize("x = 'oops\n").is_err());
    }

    #[test]
    fn positions_are_tracked() {
        let toks = tokenize("x = 1\n").expect("tokenize");
        assert_eq!(toks[0].line, 1);
        assert_eq!(toks[0].column, 0);
        assert_eq!(toks[2].column, 4);
    }
}
