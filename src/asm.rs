use std::iter::Peekable;
use std::vec::IntoIter;

use miette::Result;

use crate::error;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::memory::{Cell, DATA, PROGRAM};
use crate::program::{Program, SymbolTable};
use crate::span::Span;

/// Compile assembly source into a loadable [`Program`].
///
/// Three walks over the token stream: `let` declarations build the data
/// image and reference table, label declarations pin instruction-stream
/// offsets, and the encoder resolves every remaining token into one cell.
/// The first two produce filtered copies rather than deleting in place, so
/// positions never shift under the walker. Any error aborts compilation
/// before a program exists.
pub fn assemble(src: &str) -> Result<Program> {
    let toks = tokenize(src)?;
    let mut pass = DataPass::new(src, toks);
    let toks = pass.run()?;
    let (data, refs) = (pass.image, pass.refs);
    let (toks, labels) = resolve_labels(src, toks)?;
    let code = Encoder::new(src, toks, &labels, &refs).run()?;
    Ok(Program { code, data, labels, refs })
}

/// First pass: collect `let` bindings into the data image, excising every
/// token they consume.
struct DataPass<'a> {
    src: &'a str,
    toks: Peekable<IntoIter<Token>>,
    image: Vec<Cell>,
    refs: SymbolTable,
}

impl<'a> DataPass<'a> {
    fn new(src: &'a str, toks: Vec<Token>) -> Self {
        DataPass {
            src,
            toks: toks.into_iter().peekable(),
            image: Vec::new(),
            refs: SymbolTable::default(),
        }
    }

    fn run(&mut self) -> Result<Vec<Token>> {
        let mut kept = Vec::new();
        while let Some(tok) = self.toks.next() {
            if tok.kind == TokenKind::Let {
                self.declaration()?;
            } else {
                kept.push(tok);
            }
        }
        Ok(kept)
    }

    /// `let name`, `let name, N`, or `let name, [a, b, c]`, starting after
    /// the keyword.
    fn declaration(&mut self) -> Result<()> {
        let name = match self.toks.next() {
            Some(tok) if tok.kind == TokenKind::Ident => tok,
            Some(tok) => return Err(error::asm_expected_name(tok.span, self.src)),
            None => return Err(error::asm_eof(self.src)),
        };
        if self.refs.contains_key(name.name(self.src)) {
            return Err(error::asm_duplicate(name.span, self.src, "binding"));
        }
        let addr = self.image.len() as Cell;

        match self.toks.peek() {
            Some(tok) if tok.kind == TokenKind::Comma => {
                self.toks.next();
                match self.toks.next() {
                    Some(tok) => match tok.kind {
                        TokenKind::Lit(value) => self.push_cell(value, name.span)?,
                        TokenKind::OpenBracket => self.list(name.span)?,
                        _ => return Err(error::asm_expected_value(tok.span, self.src)),
                    },
                    None => return Err(error::asm_eof(self.src)),
                }
            }
            // Bare `let name` reserves one zeroed cell.
            _ => self.push_cell(0, name.span)?,
        }

        self.refs.insert(name.name(self.src).to_string(), addr);
        Ok(())
    }

    /// Cells between `[` and `]`, starting after the open bracket.
    fn list(&mut self, decl: Span) -> Result<()> {
        let mut wrote = false;
        loop {
            match self.toks.next() {
                Some(tok) => match tok.kind {
                    TokenKind::Lit(value) => {
                        self.push_cell(value, tok.span)?;
                        wrote = true;
                        // A value is followed by `,` or the closing bracket.
                        match self.toks.next() {
                            Some(next) if next.kind == TokenKind::Comma => continue,
                            Some(next) if next.kind == TokenKind::CloseBracket => break,
                            Some(next) => {
                                return Err(error::asm_bad_list(next.span, self.src))
                            }
                            None => return Err(error::asm_unterminated_list(self.src)),
                        }
                    }
                    TokenKind::CloseBracket if !wrote => {
                        return Err(error::asm_empty_list(decl, self.src))
                    }
                    _ => return Err(error::asm_bad_list(tok.span, self.src)),
                },
                None => return Err(error::asm_unterminated_list(self.src)),
            }
        }
        Ok(())
    }

    fn push_cell(&mut self, value: Cell, span: Span) -> Result<()> {
        if self.image.len() == DATA.len {
            return Err(error::asm_data_overflow(
                span,
                self.src,
                self.image.len() + 1,
                DATA.len,
            ));
        }
        self.image.push(value);
        Ok(())
    }
}

/// Second pass: record the instruction-stream offset of every `name:` and
/// drop the declaration tokens. Every other token becomes exactly one cell
/// of output, so counting them here yields the final offsets before any
/// encoding happens; forward and backward references cost the same.
fn resolve_labels(src: &str, toks: Vec<Token>) -> Result<(Vec<Token>, SymbolTable)> {
    let mut labels = SymbolTable::default();
    let mut kept = Vec::with_capacity(toks.len());
    let mut pos: Cell = 0;
    for tok in toks {
        match tok.kind {
            TokenKind::LabelDecl => {
                let name = tok.name(src);
                if labels.contains_key(name) {
                    return Err(error::asm_duplicate(tok.span, src, "label"));
                }
                labels.insert(name.to_string(), pos);
            }
            TokenKind::Comma => kept.push(tok),
            _ => {
                pos += 1;
                kept.push(tok);
            }
        }
    }
    Ok((kept, labels))
}

/// Final pass: emit one cell per opcode and per resolved atom.
struct Encoder<'a> {
    src: &'a str,
    toks: Peekable<IntoIter<Token>>,
    labels: &'a SymbolTable,
    refs: &'a SymbolTable,
    out: Vec<Cell>,
}

impl<'a> Encoder<'a> {
    fn new(src: &'a str, toks: Vec<Token>, labels: &'a SymbolTable, refs: &'a SymbolTable) -> Self {
        Encoder {
            src,
            toks: toks.into_iter().peekable(),
            labels,
            refs,
            out: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Cell>> {
        while let Some(tok) = self.toks.next() {
            let TokenKind::Op(op) = tok.kind else {
                return Err(error::asm_expected_op(tok.span, self.src));
            };
            self.emit(op as Cell, tok.span)?;
            // Greedy trailing atoms, then comma-continued ones. Arity is
            // deliberately not checked against the opcode; a malformed
            // instruction mis-consumes atoms and fails at runtime instead.
            while self.at_atom() {
                let tok = self.toks.next().unwrap();
                let cell = self.atom(&tok)?;
                self.emit(cell, tok.span)?;
            }
            while matches!(self.toks.peek(), Some(t) if t.kind == TokenKind::Comma) {
                self.toks.next();
                match self.toks.next() {
                    Some(tok) => {
                        let cell = self.atom(&tok)?;
                        self.emit(cell, tok.span)?;
                    }
                    None => return Err(error::asm_eof(self.src)),
                }
            }
        }
        Ok(self.out)
    }

    fn at_atom(&mut self) -> bool {
        matches!(
            self.toks.peek().map(|t| t.kind),
            Some(TokenKind::Ident | TokenKind::Ref | TokenKind::Lit(_))
        )
    }

    /// Resolve one operand token to its cell.
    fn atom(&self, tok: &Token) -> Result<Cell> {
        match tok.kind {
            TokenKind::Lit(value) => Ok(value),
            TokenKind::Ident => match self.labels.get(tok.name(self.src)) {
                Some(&addr) => Ok(addr),
                None => Err(error::asm_unknown_label(tok.span, self.src)),
            },
            TokenKind::Ref => match self.refs.get(tok.name(self.src)) {
                Some(&addr) => Ok(addr),
                None => Err(error::asm_unknown_ref(tok.span, self.src)),
            },
            _ => Err(error::asm_expected_operand(tok.span, self.src)),
        }
    }

    fn emit(&mut self, cell: Cell, span: Span) -> Result<()> {
        if self.out.len() == PROGRAM.len {
            return Err(error::asm_program_overflow(span, self.src, PROGRAM.len));
        }
        self.out.push(cell);
        Ok(())
    }
}
