pub mod error;
mod expression;
pub mod lexer;
mod statement;

use std::ops::Range;

pub use error::ParseError;

/// Deepest nesting of blocks and sub-expressions the parser accepts.
pub const MAX_NESTING: usize = 64;

use crate::Program;
use crate::parser::lexer::{Spanned, Token};

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source text into a complete Program.
    ///
    /// Lexing stops at the first bad character; statement parsing recovers at
    /// the next `;` or `}` so several errors can be reported at once.
    pub fn parse(&self) -> Result<Program, Vec<ParseError>> {
        let tokens = lexer::tokenize(&self.source, self.file_id).map_err(|e| vec![e])?;
        let mut stream = TokenStream::new(tokens, self.source.len(), self.file_id);
        let statements = stream.parse_program()?;
        Ok(Program {
            statements,
            source_id: self.file_id,
        })
    }
}

/// Cursor over the token list shared by the statement and expression parsers.
pub(crate) struct TokenStream {
    tokens: Vec<Spanned>,
    pos: usize,
    source_len: usize,
    file_id: usize,
    nesting: usize,
    /// Set once `MAX_NESTING` is exceeded; parsing stops there.
    too_deep: bool,
}

impl TokenStream {
    fn new(tokens: Vec<Spanned>, source_len: usize, file_id: usize) -> Self {
        TokenStream {
            tokens,
            pos: 0,
            source_len,
            file_id,
            nesting: 0,
            too_deep: false,
        }
    }

    /// Run `parse` one nesting level deeper, failing past `MAX_NESTING`.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.nesting >= MAX_NESTING {
            self.too_deep = true;
            return Err(self.error_here(format!("nested more than {} levels deep", MAX_NESTING)));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Span of the next token, or an empty span at end of input.
    fn current_span(&self) -> Range<usize> {
        match self.tokens.get(self.pos) {
            Some(s) => s.span.clone(),
            None => self.source_len..self.source_len,
        }
    }

    /// End offset of the most recently consumed token.
    fn previous_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|s| s.span.end)
            .unwrap_or(0)
    }

    fn expect(&mut self, token: Token) -> Result<Range<usize>, ParseError> {
        match self.tokens.get(self.pos) {
            Some(s) if s.token == token => {
                self.pos += 1;
                Ok(s.span.clone())
            }
            Some(s) => Err(ParseError::expected(
                &token.describe(),
                &s.token.describe(),
                s.span.clone(),
                self.file_id,
            )),
            None => Err(ParseError::expected(
                &token.describe(),
                "end of input",
                self.current_span(),
                self.file_id,
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Range<usize>), ParseError> {
        match self.advance() {
            Some(Spanned {
                token: Token::Ident(name),
                span,
            }) => Ok((name, span)),
            Some(other) => Err(ParseError::expected(
                "identifier",
                &other.token.describe(),
                other.span,
                self.file_id,
            )),
            None => Err(ParseError::expected(
                "identifier",
                "end of input",
                self.current_span(),
                self.file_id,
            )),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::error(message, self.current_span(), self.file_id)
    }
}
