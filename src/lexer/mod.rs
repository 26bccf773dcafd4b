use miette::Result;

use crate::error;
use crate::lexer::cursor::Cursor;
use crate::memory::Cell;
use crate::ops::OpCode;
use crate::span::{Span, SrcOffset};

pub mod cursor;

/// A single source "word" with its location.
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Name with the `&` or `:` marker stripped, for table lookups.
    pub fn name<'a>(&self, src: &'a str) -> &'a str {
        let lexeme = &src[self.span.range()];
        match self.kind {
            TokenKind::Ref => &lexeme[1..],
            TokenKind::LabelDecl => &lexeme[..lexeme.len() - 1],
            _ => lexeme,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Plain name, used as a label operand.
    Ident,
    /// `&name`: the address of a `let` binding.
    Ref,
    /// `name:`: pins the next code position.
    LabelDecl,
    /// The `let` keyword.
    Let,
    /// Operation mnemonic.
    Op(OpCode),
    /// Numeric literal, parsed at lex time.
    Lit(Cell),
    Comma,
    OpenBracket,
    CloseBracket,
}

/// Characters that may start a name.
fn is_id_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_' | '&')
}

/// Characters that may continue one. `:` only matters when it ends the lexeme.
fn is_id_continue(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '&' | ':')
}

/// Split source into tokens. Comments and unrecognised characters are
/// dropped; the only fatal findings at this stage are number literals that
/// do not parse and references without a name.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut cursor = Cursor::new(src);
    let mut toks = Vec::new();
    while let Some(tok) = cursor.next_token(src)? {
        toks.push(tok);
    }
    Ok(toks)
}

impl Cursor<'_> {
    fn next_token(&mut self, src: &str) -> Result<Option<Token>> {
        loop {
            let start = self.pos();
            let Some(c) = self.bump() else {
                return Ok(None);
            };
            let kind = match c {
                ';' => {
                    self.take_while(|c| c != '\n');
                    continue;
                }
                ',' => TokenKind::Comma,
                '[' => TokenKind::OpenBracket,
                ']' => TokenKind::CloseBracket,
                c if c.is_ascii_digit() => {
                    self.number(c, start, src)?
                }
                c if is_id_start(c) => {
                    self.word(start, src)?
                }
                // Whitespace and anything unrecognised.
                _ => continue,
            };
            let span = Span::new(SrcOffset(start), self.pos() - start);
            return Ok(Some(Token { kind, span }));
        }
    }

    /// Scan a numeric literal. The whole alphanumeric blob is taken first so
    /// that junk like `12monkeys` errors instead of splitting in two.
    fn number(&mut self, c: char, start: usize, src: &str) -> Result<TokenKind> {
        let radix = if c == '0' && matches!(self.first(), 'x' | 'X') {
            self.bump();
            16
        } else {
            10
        };
        self.take_while(|c| c.is_ascii_alphanumeric());
        let span = Span::new(SrcOffset(start), self.pos() - start);
        let lexeme = &src[span.range()];
        let digits = if radix == 16 { &lexeme[2..] } else { lexeme };
        match Cell::from_str_radix(digits, radix) {
            Ok(value) => Ok(TokenKind::Lit(value)),
            Err(e) => Err(error::lex_invalid_lit(span, src, e)),
        }
    }

    /// Scan a name and classify it by its markers, then by keyword, then by
    /// mnemonic. Anything left is a plain identifier.
    fn word(&mut self, start: usize, src: &str) -> Result<TokenKind> {
        self.take_while(is_id_continue);
        let span = Span::new(SrcOffset(start), self.pos() - start);
        let lexeme = &src[span.range()];
        if let Some(name) = lexeme.strip_prefix('&') {
            if name.is_empty() {
                return Err(error::lex_empty_ref(span, src));
            }
            return Ok(TokenKind::Ref);
        }
        if lexeme.ends_with(':') {
            return Ok(TokenKind::LabelDecl);
        }
        if lexeme.eq_ignore_ascii_case("let") {
            return Ok(TokenKind::Let);
        }
        if let Some(op) = OpCode::from_mnemonic(lexeme) {
            return Ok(TokenKind::Op(op));
        }
        Ok(TokenKind::Ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn classifies_a_full_statement() {
        let src = "let x, [1, 0x2F]\nstart: pushm &x ; climb";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::OpenBracket,
                TokenKind::Lit(1),
                TokenKind::Comma,
                TokenKind::Lit(0x2F),
                TokenKind::CloseBracket,
                TokenKind::LabelDecl,
                TokenKind::Op(OpCode::PushM),
                TokenKind::Ref,
            ]
        );
    }

    #[test]
    fn names_are_stripped_of_markers() {
        let src = "start: &x plain";
        let toks = tokenize(src).unwrap();
        assert_eq!(toks[0].name(src), "start");
        assert_eq!(toks[1].name(src), "x");
        assert_eq!(toks[2].name(src), "plain");
    }

    #[test]
    fn spans_cover_the_lexeme() {
        let src = "  putp 0x10";
        let toks = tokenize(src).unwrap();
        assert_eq!(&src[toks[0].span.range()], "putp");
        assert_eq!(&src[toks[1].span.range()], "0x10");
    }

    #[test]
    fn keywords_and_mnemonics_ignore_case() {
        assert_eq!(kinds("LET"), vec![TokenKind::Let]);
        assert_eq!(kinds("PuTp"), vec![TokenKind::Op(OpCode::PutP)]);
    }

    #[test]
    fn mnemonic_with_colon_is_a_label() {
        let src = "add: add";
        assert_eq!(
            kinds(src),
            vec![TokenKind::LabelDecl, TokenKind::Op(OpCode::Add)]
        );
    }

    #[test]
    fn noise_is_dropped() {
        assert_eq!(
            kinds("@ ) push ; to the end\n5"),
            vec![TokenKind::Op(OpCode::Push), TokenKind::Lit(5)]
        );
    }

    #[test]
    fn hex_and_decimal_literals() {
        assert_eq!(
            kinds("10 0x10 0X10 4294967295"),
            vec![
                TokenKind::Lit(10),
                TokenKind::Lit(16),
                TokenKind::Lit(16),
                TokenKind::Lit(Cell::MAX),
            ]
        );
    }

    #[test]
    fn bad_literals_are_fatal() {
        assert!(tokenize("0xzz").is_err());
        assert!(tokenize("12monkeys").is_err());
        assert!(tokenize("4294967296").is_err());
        assert!(tokenize("0x").is_err());
    }

    #[test]
    fn bare_ampersand_is_fatal() {
        assert!(tokenize("&").is_err());
        assert!(tokenize("push & 5").is_err());
    }
}
