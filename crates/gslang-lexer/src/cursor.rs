use gslang_common::position::Pos;

/// Character-level source iterator for the gslang lexer.
///
/// Wraps a source string and provides character-by-character iteration with
/// full position tracking: byte offset plus 1-based line and column. A
/// newline advances the line counter and resets the column.
pub struct Cursor<'src> {
    source: &'src str,
    chars: std::str::Chars<'src>,
    offset: u32,
    line: u32,
    column: u32,
}

impl<'src> Cursor<'src> {
    /// Create a new cursor at the start of the source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.chars(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Look at the current character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Look at the character after the current one without consuming anything.
    pub fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    /// Consume the current character and advance the position.
    ///
    /// Returns the consumed character, or `None` at end of input.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8() as u32;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Current position in the source text.
    pub fn pos(&self) -> Pos {
        Pos {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    /// Whether there are no more characters to consume.
    pub fn is_eof(&self) -> bool {
        self.peek().is_none()
    }

    /// Advance while the predicate holds for the current character.
    pub fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Extract a slice of the source text by byte offsets.
    pub fn slice(&self, start: u32, end: u32) -> &'src str {
        &self.source[start as usize..end as usize]
    }
}
