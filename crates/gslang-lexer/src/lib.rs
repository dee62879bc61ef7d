// gslang lexer -- tokenizer for the gslang interface definition language.

mod cursor;

use cursor::Cursor;
use gslang_common::diagnostics::{Diagnostic, DiagnosticKind, Stage};
use gslang_common::position::{Pos, Span};
use gslang_common::token::{keyword_from_str, Token, TokenKind, TokenValue};

/// The gslang lexer. Converts source text into a stream of tokens.
///
/// Offers a single token of lookahead: [`Lexer::peek`] is idempotent and
/// [`Lexer::next`] consumes. Lexing errors are [`Diagnostic`] values tagged
/// with the file name the lexer was created with; per the error taxonomy
/// they are fatal for the current file, so the caller is expected to stop
/// pulling tokens after the first `Err`.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    file: String,
    peeked: Option<Token>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text, tagged with a file name.
    pub fn new(file: impl Into<String>, source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            file: file.into(),
            peeked: None,
        }
    }

    /// The file tag this lexer was created with.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token, Diagnostic> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scan_token()?);
        }
        Ok(self.peeked.clone().unwrap())
    }

    /// Consume and return the next token.
    ///
    /// Past end of input this keeps returning `Eof` tokens.
    pub fn next(&mut self) -> Result<Token, Diagnostic> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        self.scan_token()
    }

    /// Convenience: tokenize an entire source string, `Eof` token included.
    pub fn tokenize(file: &str, source: &str) -> Result<Vec<Token>, Diagnostic> {
        let mut lexer = Lexer::new(file, source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    // ── Scanning ───────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Result<Token, Diagnostic> {
        self.skip_whitespace();

        let start = self.cursor.pos();

        let Some(c) = self.cursor.peek() else {
            return Ok(Token::new(TokenKind::Eof, None, Span::point(start)));
        };

        match c {
            c if c.is_alphabetic() || c == '_' => Ok(self.scan_ident(start)),
            '0'..='9' => self.scan_number(start),
            '"' | '\'' => self.scan_string(start, c),
            '/' => self.scan_slash(start),
            '-' => {
                self.cursor.bump();
                if self.cursor.peek() == Some('>') {
                    self.cursor.bump();
                    Ok(self.token(TokenKind::Arrow, None, start))
                } else {
                    Ok(self.token(TokenKind::Minus, None, start))
                }
            }
            '+' => Ok(self.single(TokenKind::Plus, start)),
            '|' => Ok(self.single(TokenKind::Pipe, start)),
            '&' => Ok(self.single(TokenKind::Amp, start)),
            '{' => Ok(self.single(TokenKind::LBrace, start)),
            '}' => Ok(self.single(TokenKind::RBrace, start)),
            '(' => Ok(self.single(TokenKind::LParen, start)),
            ')' => Ok(self.single(TokenKind::RParen, start)),
            '[' => Ok(self.single(TokenKind::LBracket, start)),
            ']' => Ok(self.single(TokenKind::RBracket, start)),
            ';' => Ok(self.single(TokenKind::Semicolon, start)),
            ',' => Ok(self.single(TokenKind::Comma, start)),
            '.' => Ok(self.single(TokenKind::Dot, start)),
            '@' => Ok(self.single(TokenKind::At, start)),
            _ => {
                self.cursor.bump();
                Err(self.error(
                    DiagnosticKind::UnexpectedCharacter,
                    start,
                    format!("unexpected character {c:?}"),
                ))
            }
        }
    }

    /// Skip whitespace characters between tokens.
    fn skip_whitespace(&mut self) {
        self.cursor
            .eat_while(|c| c == ' ' || c == '\t' || c == '\n' || c == '\r');
    }

    /// Scan an identifier-shaped token, then classify it as keyword,
    /// boolean, label (trailing `:`) or plain identifier.
    fn scan_ident(&mut self, start: Pos) -> Token {
        self.cursor
            .eat_while(|c| c.is_alphanumeric() || c == '_');
        let end = self.cursor.pos();
        let text = self.cursor.slice(start.offset, end.offset);

        if text == "true" {
            return self.token(TokenKind::True, None, start);
        }
        if text == "false" {
            return self.token(TokenKind::False, None, start);
        }
        if let Some(keyword) = keyword_from_str(text) {
            return self.token(keyword, None, start);
        }
        if self.cursor.peek() == Some(':') {
            let value = TokenValue::Str(text.to_string());
            self.cursor.bump();
            return self.token(TokenKind::Label, Some(value), start);
        }
        let value = TokenValue::Str(text.to_string());
        self.token(TokenKind::Ident, Some(value), start)
    }

    /// Scan an integer or float literal.
    fn scan_number(&mut self, start: Pos) -> Result<Token, Diagnostic> {
        if self.cursor.peek() == Some('0')
            && matches!(self.cursor.peek_next(), Some('x') | Some('X'))
        {
            self.cursor.bump();
            self.cursor.bump();
            let digits_start = self.cursor.pos();
            self.cursor.eat_while(|c| c.is_ascii_hexdigit());
            let digits = self
                .cursor
                .slice(digits_start.offset, self.cursor.pos().offset);
            if digits.is_empty() {
                return Err(self.error(
                    DiagnosticKind::IllegalHex,
                    start,
                    "hexadecimal literal needs at least one digit",
                ));
            }
            let value = i64::from_str_radix(digits, 16).map_err(|_| {
                self.error(
                    DiagnosticKind::NumberOutOfRange,
                    start,
                    format!("hexadecimal literal 0x{digits} does not fit 64 bits"),
                )
            })?;
            return Ok(self.token(
                TokenKind::IntLiteral,
                Some(TokenValue::Int(value)),
                start,
            ));
        }

        self.cursor.eat_while(|c| c.is_ascii_digit());

        if matches!(self.cursor.peek(), Some('.') | Some('e') | Some('E')) {
            if self.cursor.peek() == Some('.') {
                self.cursor.bump();
                self.cursor.eat_while(|c| c.is_ascii_digit());
            }
            if matches!(self.cursor.peek(), Some('e') | Some('E')) {
                self.cursor.bump();
                if matches!(self.cursor.peek(), Some('+') | Some('-')) {
                    self.cursor.bump();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
            }
            let text = self
                .cursor
                .slice(start.offset, self.cursor.pos().offset);
            let value: f64 = text.parse().map_err(|_| {
                self.error(
                    DiagnosticKind::NumberOutOfRange,
                    start,
                    format!("malformed float literal {text:?}"),
                )
            })?;
            if value.is_infinite() {
                return Err(self.error(
                    DiagnosticKind::NumberOutOfRange,
                    start,
                    format!("float literal {text:?} overflows"),
                ));
            }
            return Ok(self.token(
                TokenKind::FloatLiteral,
                Some(TokenValue::Float(value)),
                start,
            ));
        }

        let text = self
            .cursor
            .slice(start.offset, self.cursor.pos().offset);
        let value: i64 = text.parse().map_err(|_| {
            self.error(
                DiagnosticKind::NumberOutOfRange,
                start,
                format!("integer literal {text} does not fit 64 bits"),
            )
        })?;
        Ok(self.token(
            TokenKind::IntLiteral,
            Some(TokenValue::Int(value)),
            start,
        ))
    }

    /// Scan a quoted string. Only the quote itself and the backslash may be
    /// escaped; a newline before the closing quote is an error.
    fn scan_string(&mut self, start: Pos, quote: char) -> Result<Token, Diagnostic> {
        self.cursor.bump();
        let mut value = String::new();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    return Err(self.error(
                        DiagnosticKind::UnterminatedString,
                        start,
                        "string literal not terminated",
                    ));
                }
                Some('\\') => {
                    self.cursor.bump();
                    match self.cursor.peek() {
                        Some(c) if c == quote || c == '\\' => {
                            value.push(c);
                            self.cursor.bump();
                        }
                        _ => {
                            return Err(self.error(
                                DiagnosticKind::IllegalEscape,
                                start,
                                "illegal character escape",
                            ));
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.cursor.bump();
                    return Ok(self.token(
                        TokenKind::StringLiteral,
                        Some(TokenValue::Str(value)),
                        start,
                    ));
                }
                Some(c) => {
                    value.push(c);
                    self.cursor.bump();
                }
            }
        }
    }

    /// Scan `//` and `/* */` comments. A bare `/` is not a gslang token.
    fn scan_slash(&mut self, start: Pos) -> Result<Token, Diagnostic> {
        self.cursor.bump();
        match self.cursor.peek() {
            Some('/') => {
                self.cursor.bump();
                let text_start = self.cursor.pos();
                self.cursor.eat_while(|c| c != '\n');
                let text = self
                    .cursor
                    .slice(text_start.offset, self.cursor.pos().offset);
                Ok(self.token(
                    TokenKind::Comment,
                    Some(TokenValue::Str(text.to_string())),
                    start,
                ))
            }
            Some('*') => {
                self.cursor.bump();
                let mut value = String::new();
                // Block comments nest through matching open/close pairs.
                let mut depth = 1u32;
                loop {
                    match self.cursor.peek() {
                        None => {
                            return Err(self.error(
                                DiagnosticKind::UnterminatedComment,
                                start,
                                "block comment not terminated",
                            ));
                        }
                        Some('*') if self.cursor.peek_next() == Some('/') => {
                            self.cursor.bump();
                            self.cursor.bump();
                            depth -= 1;
                            if depth == 0 {
                                return Ok(self.token(
                                    TokenKind::Comment,
                                    Some(TokenValue::Str(value)),
                                    start,
                                ));
                            }
                            value.push_str("*/");
                        }
                        Some('/') if self.cursor.peek_next() == Some('*') => {
                            self.cursor.bump();
                            self.cursor.bump();
                            depth += 1;
                            value.push_str("/*");
                        }
                        Some(c) => {
                            value.push(c);
                            self.cursor.bump();
                        }
                    }
                }
            }
            _ => Err(self.error(
                DiagnosticKind::UnexpectedCharacter,
                start,
                "unexpected character '/'",
            )),
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    /// Consume one character and build its token.
    fn single(&mut self, kind: TokenKind, start: Pos) -> Token {
        self.cursor.bump();
        self.token(kind, None, start)
    }

    fn token(&self, kind: TokenKind, value: Option<TokenValue>, start: Pos) -> Token {
        Token::new(kind, value, Span::new(start, self.cursor.pos()))
    }

    fn error(
        &self,
        kind: DiagnosticKind,
        start: Pos,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic::new(
            Stage::Lexing,
            kind,
            self.file.clone(),
            Some(Span::new(start, self.cursor.pos())),
            message,
        )
    }
}
