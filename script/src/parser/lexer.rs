use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

use crate::parser::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    StringLit(String),
    True,
    False,

    Ident(String),

    // Keywords
    Let,
    If,
    Else,
    While,
    For,
    Break,

    // Operators
    Plus,
    PlusPlus,
    PlusEq,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,     // =
    EqEq,   // ==
    BangEq, // !=
    Gt,
    Lt,
    GtEq,
    LtEq,
    AmpAmp,   // &&
    PipePipe, // ||
    Bang,     // !

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
}

impl Token {
    /// Short human-readable description used in "expected X, found Y" errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number `{}`", n),
            Token::StringLit(_) => "string literal".to_string(),
            Token::Ident(name) => format!("identifier `{}`", name),
            Token::True => "`true`".to_string(),
            Token::False => "`false`".to_string(),
            Token::Let => "`let`".to_string(),
            Token::If => "`if`".to_string(),
            Token::Else => "`else`".to_string(),
            Token::While => "`while`".to_string(),
            Token::For => "`for`".to_string(),
            Token::Break => "`break`".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Plus => "+",
            Token::PlusPlus => "++",
            Token::PlusEq => "+=",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Eq => "=",
            Token::EqEq => "==",
            Token::BangEq => "!=",
            Token::Gt => ">",
            Token::Lt => "<",
            Token::GtEq => ">=",
            Token::LtEq => "<=",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::Bang => "!",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Semicolon => ";",
            _ => "?",
        }
    }
}

/// A token together with its byte range in the source.
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

pub fn tokenize(source: &str, file_id: usize) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer {
        source,
        chars: source.char_indices().peekable(),
        file_id,
    };
    let mut tokens = Vec::new();
    while let Some(spanned) = lexer.next_token()? {
        tokens.push(spanned);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    file_id: usize,
}

impl<'a> Lexer<'a> {
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len())
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().map(|(_, c)| *c) == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, ParseError> {
        self.skip_trivia();

        let Some((start, c)) = self.chars.next() else {
            return Ok(None);
        };

        let token = match c {
            '"' => Token::StringLit(self.string_literal(start)?),
            '0'..='9' => self.number(start),
            'a'..='z' | 'A'..='Z' | '_' | '$' => self.ident_or_keyword(start),

            '+' => {
                if self.eat('+') {
                    Token::PlusPlus
                } else if self.eat('=') {
                    Token::PlusEq
                } else {
                    Token::Plus
                }
            }
            '=' => {
                if self.eat('=') { Token::EqEq } else { Token::Eq }
            }
            '!' => {
                if self.eat('=') { Token::BangEq } else { Token::Bang }
            }
            '>' => {
                if self.eat('=') { Token::GtEq } else { Token::Gt }
            }
            '<' => {
                if self.eat('=') { Token::LtEq } else { Token::Lt }
            }
            '&' if self.eat('&') => Token::AmpAmp,
            '|' if self.eat('|') => Token::PipePipe,

            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ';' => Token::Semicolon,

            other => {
                let end = start + other.len_utf8();
                return Err(ParseError::error(
                    format!("unexpected character `{}`", other),
                    start..end,
                    self.file_id,
                ));
            }
        };

        let end = self.offset();
        Ok(Some(Spanned {
            token,
            span: start..end,
        }))
    }

    /// Skip whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek().map(|(_, c)| *c) {
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('/') => {
                    let offset = self.offset();
                    if self.source[offset..].starts_with("//") {
                        while let Some((_, c)) = self.chars.next() {
                            if c == '\n' {
                                break;
                            }
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn number(&mut self, start: usize) -> Token {
        while let Some((_, c)) = self.chars.peek() {
            if c.is_ascii_digit() || *c == '.' {
                self.chars.next();
            } else {
                break;
            }
        }
        let end = self.offset();
        // A stray second '.' makes the literal unparseable; NaN mirrors the host's numeric coercion.
        Token::Number(self.source[start..end].parse::<f64>().unwrap_or(f64::NAN))
    }

    fn ident_or_keyword(&mut self, start: usize) -> Token {
        while let Some((_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || *c == '_' || *c == '$' {
                self.chars.next();
            } else {
                break;
            }
        }
        let end = self.offset();
        match &self.source[start..end] {
            "let" => Token::Let,
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "for" => Token::For,
            "break" => Token::Break,
            "true" => Token::True,
            "false" => Token::False,
            ident => Token::Ident(ident.to_string()),
        }
    }

    /// Read a double-quoted literal using JSON escape rules. The opening quote is consumed.
    fn string_literal(&mut self, start: usize) -> Result<String, ParseError> {
        let mut value = String::new();
        loop {
            let Some((i, c)) = self.chars.next() else {
                return Err(ParseError::error(
                    "unterminated string literal",
                    start..self.source.len(),
                    self.file_id,
                ));
            };
            match c {
                '"' => return Ok(value),
                '\\' => value.push(self.escape(i)?),
                c => value.push(c),
            }
        }
    }

    fn escape(&mut self, backslash: usize) -> Result<char, ParseError> {
        let bad = |lexer: &mut Self, msg: &str| {
            let end = lexer.offset();
            ParseError::error(msg.to_string(), backslash..end, lexer.file_id)
        };
        let Some((_, c)) = self.chars.next() else {
            return Err(bad(self, "unterminated escape sequence"));
        };
        Ok(match c {
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => {
                let high = self.hex4().ok_or_else(|| bad(self, "invalid \\u escape"))?;
                if (0xD800..0xDC00).contains(&high) {
                    if !(self.eat('\\') && self.eat('u')) {
                        return Err(bad(self, "unpaired surrogate in \\u escape"));
                    }
                    let low = self.hex4().ok_or_else(|| bad(self, "invalid \\u escape"))?;
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
                    char::from_u32(code).ok_or_else(|| bad(self, "invalid surrogate pair"))?
                } else {
                    char::from_u32(high).ok_or_else(|| bad(self, "invalid \\u escape"))?
                }
            }
            _ => return Err(bad(self, "unknown escape sequence")),
        })
    }

    fn hex4(&mut self) -> Option<u32> {
        let mut code = 0;
        for _ in 0..4 {
            let (_, c) = self.chars.next()?;
            code = code * 16 + c.to_digit(16)?;
        }
        Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src, 0)
            .expect("tokenize failed")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            kinds("i0++ x += 1 a == b != c <= d >= e && f || !g"),
            vec![
                Token::Ident("i0".into()),
                Token::PlusPlus,
                Token::Ident("x".into()),
                Token::PlusEq,
                Token::Number(1.0),
                Token::Ident("a".into()),
                Token::EqEq,
                Token::Ident("b".into()),
                Token::BangEq,
                Token::Ident("c".into()),
                Token::LtEq,
                Token::Ident("d".into()),
                Token::GtEq,
                Token::Ident("e".into()),
                Token::AmpAmp,
                Token::Ident("f".into()),
                Token::PipePipe,
                Token::Bang,
                Token::Ident("g".into()),
            ]
        );
    }

    #[test]
    fn json_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"\né😀""#),
            vec![Token::StringLit("say \"hi\"\n\u{e9}\u{1F600}".into())]
        );
    }

    #[test]
    fn spans_are_byte_offsets() {
        let tokens = tokenize("let é = \"x\";", 0).unwrap_err();
        // `é` is not an identifier start in block script
        assert_eq!(tokens.span, 4..6);
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(
            kinds("// comment\nbreak; // trailing"),
            vec![Token::Break, Token::Semicolon]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("print(\"oops", 3).unwrap_err();
        assert_eq!(err.file_id, 3);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn keywords_and_literals() {
        assert_eq!(
            kinds("while (true) { if (false) {} else {} }"),
            vec![
                Token::While,
                Token::LParen,
                Token::True,
                Token::RParen,
                Token::LBrace,
                Token::If,
                Token::LParen,
                Token::False,
                Token::RParen,
                Token::LBrace,
                Token::RBrace,
                Token::Else,
                Token::LBrace,
                Token::RBrace,
                Token::RBrace,
            ]
        );
    }
}
