// Pared-down take on `rustc_lexer`'s cursor.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

/// Peekable iterator over a char sequence.
pub struct Cursor<'a> {
    src: &'a str,
    chars: Chars<'a>,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Cursor<'a> {
        Cursor {
            src,
            chars: src.chars(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Peek at the next character without consuming it. `'\0'` at end of input.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or('\0')
    }

    /// Consume and return the next character.
    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Byte offset of the cursor from the start of the source.
    pub fn pos(&self) -> usize {
        self.src.len() - self.chars.as_str().len()
    }

    /// Consume characters while `pred` holds.
    pub fn take_while(&mut self, mut pred: impl FnMut(char) -> bool) {
        while !self.is_eof() && pred(self.first()) {
            self.bump();
        }
    }
}
