pub mod expression;
pub mod parser;
pub mod statement;

use crate::statement::Statement;

/// A parsed block script program.
#[derive(Debug, Clone)]
pub struct Program {
    /// Top-level statements, executed in order.
    pub statements: Vec<Statement>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Program {
    /// Parse `source` as a complete program.
    pub fn parse(source: &str, source_id: usize) -> Result<Program, Vec<parser::ParseError>> {
        parser::Parser::new(source.to_string(), source_id).parse()
    }
}
