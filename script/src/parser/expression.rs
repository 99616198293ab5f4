use crate::expression::{BinaryOperator, Expression, UnaryOperator};
use crate::parser::TokenStream;
use crate::parser::error::ParseError;
use crate::parser::lexer::Token;

// Binding powers (precedence). Higher = tighter binding.
// All binary operators are left-associative: right bp = left bp + 1.
const BP_OR: u8 = 4; // ||
const BP_AND: u8 = 6; // &&
const BP_EQUALITY: u8 = 8; // == !=
const BP_COMPARISON: u8 = 10; // < > <= >=
const BP_ADDITIVE: u8 = 12; // + -
const BP_MULTIPLICATIVE: u8 = 14; // * / %
const BP_UNARY: u8 = 16; // ! -

/// Infix binding powers: returns (left_bp, right_bp, operator) or None if not infix.
fn infix(token: &Token) -> Option<(u8, u8, BinaryOperator)> {
    let (bp, op) = match token {
        Token::PipePipe => (BP_OR, BinaryOperator::LogicalOr),
        Token::AmpAmp => (BP_AND, BinaryOperator::LogicalAnd),
        Token::EqEq => (BP_EQUALITY, BinaryOperator::Equality),
        Token::BangEq => (BP_EQUALITY, BinaryOperator::Inequality),
        Token::Gt => (BP_COMPARISON, BinaryOperator::GreaterThan),
        Token::Lt => (BP_COMPARISON, BinaryOperator::LessThan),
        Token::GtEq => (BP_COMPARISON, BinaryOperator::GreaterThanOrEqual),
        Token::LtEq => (BP_COMPARISON, BinaryOperator::LessThanOrEqual),
        Token::Plus => (BP_ADDITIVE, BinaryOperator::Addition),
        Token::Minus => (BP_ADDITIVE, BinaryOperator::Subtraction),
        Token::Star => (BP_MULTIPLICATIVE, BinaryOperator::Multiplication),
        Token::Slash => (BP_MULTIPLICATIVE, BinaryOperator::Division),
        Token::Percent => (BP_MULTIPLICATIVE, BinaryOperator::Modulo),
        _ => return None,
    };
    Some((bp, bp + 1, op))
}

impl TokenStream {
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_expr(0)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expression, ParseError> {
        self.nested(|stream| stream.parse_expr_inner(min_bp))
    }

    fn parse_expr_inner(&mut self, min_bp: u8) -> Result<Expression, ParseError> {
        let start = self.current_span().start;
        let mut left = self.parse_prefix()?;

        while let Some((l_bp, r_bp, operator)) = self.peek().and_then(infix) {
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let right = self.parse_expr(r_bp)?;
            left = Expression::BinaryOperation {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                span: start..self.previous_end(),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        let Some(spanned) = self.advance() else {
            return Err(self.error_here("unexpected end of expression"));
        };

        match spanned.token {
            Token::Number(n) => Ok(Expression::NumberLiteral(n)),
            Token::StringLit(s) => Ok(Expression::StringLiteral(s)),
            Token::True => Ok(Expression::BooleanLiteral(true)),
            Token::False => Ok(Expression::BooleanLiteral(false)),

            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let arguments = self.parse_arguments()?;
                    Ok(Expression::Call {
                        function: name,
                        arguments,
                        span: spanned.span.start..self.previous_end(),
                    })
                } else {
                    Ok(Expression::Variable(name, spanned.span))
                }
            }

            Token::Bang => {
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expression::UnaryOperation {
                    operator: UnaryOperator::LogicalNot,
                    operand: Box::new(operand),
                })
            }
            Token::Minus => {
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expression::UnaryOperation {
                    operator: UnaryOperator::Negation,
                    operand: Box::new(operand),
                })
            }

            Token::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }

            other => Err(ParseError::expected(
                "expression",
                &other.describe(),
                spanned.span,
                self.file_id,
            )),
        }
    }

    /// Comma-separated call arguments; the opening paren is already consumed.
    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut arguments = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expr(0)?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(arguments);
        }
    }
}
