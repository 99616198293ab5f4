use crate::parser::TokenStream;
use crate::parser::error::ParseError;
use crate::parser::lexer::Token;
use crate::statement::{AssignmentKind, Statement};

impl TokenStream {
    /// Parse statements until end of input, collecting every error.
    pub(crate) fn parse_program(&mut self) -> Result<Vec<Statement>, Vec<ParseError>> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while !self.at_end() {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    errors.push(error);
                    if self.too_deep {
                        break;
                    }
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            Ok(statements)
        } else {
            Err(errors)
        }
    }

    /// Skip to just past the next `;` or `}` after an error.
    fn synchronize(&mut self) {
        while let Some(spanned) = self.advance() {
            if matches!(spanned.token, Token::Semicolon | Token::RBrace) {
                return;
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span().start;
        match self.peek() {
            Some(Token::LBrace) => {
                let statements = self.parse_braced_block()?;
                Ok(Statement::Block {
                    statements,
                    span: start..self.previous_end(),
                })
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => {
                self.advance();
                self.expect(Token::LParen)?;
                let condition = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = self.parse_braced_block()?;
                Ok(Statement::While {
                    condition,
                    body,
                    span: start..self.previous_end(),
                })
            }
            Some(Token::For) => self.parse_for(),
            Some(Token::Break) => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(Statement::Break {
                    span: start..self.previous_end(),
                })
            }
            _ => {
                let statement = self.parse_simple_statement()?;
                self.expect(Token::Semicolon)?;
                Ok(statement)
            }
        }
    }

    /// Statements that may appear in a `for` header: declarations,
    /// assignments, increments and bare expressions. No trailing `;`.
    fn parse_simple_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span().start;

        if self.eat(&Token::Let) {
            let (variable, _) = self.expect_ident()?;
            self.expect(Token::Eq)?;
            let value = self.parse_expression()?;
            return Ok(Statement::Let {
                variable,
                value,
                span: start..self.previous_end(),
            });
        }

        if let Some(Token::Ident(name)) = self.peek() {
            let name = name.clone();
            match self.peek_at(1) {
                Some(Token::PlusPlus) => {
                    self.advance();
                    self.advance();
                    return Ok(Statement::Increment {
                        variable: name,
                        span: start..self.previous_end(),
                    });
                }
                Some(Token::Eq) | Some(Token::PlusEq) => {
                    self.advance();
                    let kind = match self.advance().map(|s| s.token) {
                        Some(Token::PlusEq) => AssignmentKind::Add,
                        _ => AssignmentKind::Replace,
                    };
                    let value = self.parse_expression()?;
                    return Ok(Statement::Assignment {
                        variable: name,
                        kind,
                        value,
                        span: start..self.previous_end(),
                    });
                }
                _ => {}
            }
        }

        let value = self.parse_expression()?;
        Ok(Statement::Expression {
            value,
            span: start..self.previous_end(),
        })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span().start;
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let then_branch = self.parse_braced_block()?;

        let else_branch = if self.eat(&Token::Else) {
            if self.check(&Token::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_braced_block()?)
            }
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            span: start..self.previous_end(),
        })
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span().start;
        self.expect(Token::For)?;
        self.expect(Token::LParen)?;

        let init = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(Token::Semicolon)?;

        let condition = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Token::Semicolon)?;

        let update = if self.check(&Token::RParen) {
            None
        } else {
            let update = self.parse_simple_statement()?;
            if matches!(update, Statement::Let { .. }) {
                return Err(ParseError::error(
                    "declarations are not allowed in a for-loop update",
                    update.span().clone(),
                    self.file_id,
                ));
            }
            Some(Box::new(update))
        };
        self.expect(Token::RParen)?;

        let body = self.parse_braced_block()?;
        Ok(Statement::For {
            init,
            condition,
            update,
            body,
            span: start..self.previous_end(),
        })
    }

    fn parse_braced_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.nested(Self::parse_braced_block_inner)
    }

    fn parse_braced_block_inner(&mut self) -> Result<Vec<Statement>, ParseError> {
        let open = self.expect(Token::LBrace)?;
        let mut statements = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(statements);
            }
            if self.at_end() {
                return Err(ParseError::error("unclosed `{`", open, self.file_id)
                    .with_note("block opened here is never closed"));
            }
            statements.push(self.parse_statement()?);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Program;
    use crate::expression::{BinaryOperator, Expression};
    use crate::statement::{AssignmentKind, Statement};

    fn parse(src: &str) -> Vec<Statement> {
        Program::parse(src, 0).expect("parse failed").statements
    }

    #[test]
    fn let_and_call() {
        let statements = parse("let __loop_guard = 0;\nprint(\"Hello World!\");");
        assert_eq!(statements.len(), 2);
        assert!(matches!(&statements[0], Statement::Let { variable, .. } if variable == "__loop_guard"));
        match &statements[1] {
            Statement::Expression {
                value: Expression::Call { function, arguments, .. },
                ..
            } => {
                assert_eq!(function, "print");
                assert!(matches!(&arguments[0], Expression::StringLiteral(s) if s == "Hello World!"));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn for_loop_header() {
        let statements = parse("for (let i0 = 0; i0 < 3; i0++) { }");
        match &statements[0] {
            Statement::For {
                init: Some(init),
                condition: Some(Expression::BinaryOperation { operator, .. }),
                update: Some(update),
                body,
                ..
            } => {
                assert!(matches!(**init, Statement::Let { .. }));
                assert_eq!(*operator, BinaryOperator::LessThan);
                assert!(matches!(**update, Statement::Increment { .. }));
                assert!(body.is_empty());
            }
            other => panic!("expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn compound_assignment() {
        let statements = parse("x += 2;");
        assert!(matches!(
            &statements[0],
            Statement::Assignment { kind: AssignmentKind::Add, .. }
        ));
    }

    #[test]
    fn precedence_follows_binding_power() {
        let statements = parse("x = 1 + 2 * 3 > 4 && true;");
        let Statement::Assignment { value, .. } = &statements[0] else {
            panic!("expected assignment");
        };
        let Expression::BinaryOperation { operator, left, .. } = value else {
            panic!("expected binary operation");
        };
        assert_eq!(*operator, BinaryOperator::LogicalAnd);
        let Expression::BinaryOperation { operator, left, .. } = &**left else {
            panic!("expected comparison");
        };
        assert_eq!(*operator, BinaryOperator::GreaterThan);
        assert!(matches!(
            &**left,
            Expression::BinaryOperation { operator: BinaryOperator::Addition, .. }
        ));
    }

    #[test]
    fn else_if_chains() {
        let statements = parse("if (a) { } else if (b) { x = 1; } else { }");
        let Statement::If { else_branch: Some(branch), .. } = &statements[0] else {
            panic!("expected if");
        };
        assert!(matches!(&branch[0], Statement::If { else_branch: Some(_), .. }));
    }

    #[test]
    fn reports_multiple_errors() {
        let errors = Program::parse("print(1 2);\nlet = 3;\nprint(\"ok\");", 0).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn nesting_depth_is_limited() {
        let source = format!("{}{}", "{ ".repeat(400), "} ".repeat(400));
        let errors = Program::parse(&source, 0).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("levels deep"), "{}", errors[0].message);
        assert_eq!(errors[0].span, 128..129);

        let parens = format!("x = {}1{};", "(".repeat(200), ")".repeat(200));
        assert!(Program::parse(&parens, 0).is_err());

        let source = format!("{}{}", "{ ".repeat(40), "} ".repeat(40));
        assert_eq!(parse(&source).len(), 1);
    }

    #[test]
    fn unclosed_block_points_at_opening_brace() {
        let errors = Program::parse("while (true) {\n  print(1);", 0).unwrap_err();
        assert_eq!(errors[0].span, 13..14);
        assert!(errors[0].message.contains("unclosed"));
    }
}
