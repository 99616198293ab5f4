use std::ops::Range;

use crate::expression::Expression;

/// How an assignment statement combines the new value with the old one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignmentKind {
    /// `x = e`
    Replace,
    /// `x += e`
    Add,
}

/// A single executable statement.
#[derive(Debug, Clone)]
pub enum Statement {
    /// Variable declaration in the current scope: `let name = value;`
    Let {
        variable: String,
        value: Expression,
        span: Range<usize>,
    },
    /// Assignment to an existing variable: `name = value;` / `name += value;`
    Assignment {
        variable: String,
        kind: AssignmentKind,
        value: Expression,
        span: Range<usize>,
    },
    /// Postfix increment: `name++;`
    Increment { variable: String, span: Range<usize> },
    /// Expression evaluation (side effects only, result discarded).
    Expression {
        value: Expression,
        span: Range<usize>,
    },
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
        span: Range<usize>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
        span: Range<usize>,
    },
    /// `for (init; condition; update) { body }`. The loop has its own scope
    /// holding whatever `init` declares.
    For {
        init: Option<Box<Statement>>,
        condition: Option<Expression>,
        update: Option<Box<Statement>>,
        body: Vec<Statement>,
        span: Range<usize>,
    },
    Break { span: Range<usize> },
    /// Bare `{ ... }` scope.
    Block {
        statements: Vec<Statement>,
        span: Range<usize>,
    },
}

impl Statement {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Statement::Let { span, .. } => span,
            Statement::Assignment { span, .. } => span,
            Statement::Increment { span, .. } => span,
            Statement::Expression { span, .. } => span,
            Statement::If { span, .. } => span,
            Statement::While { span, .. } => span,
            Statement::For { span, .. } => span,
            Statement::Break { span } => span,
            Statement::Block { span, .. } => span,
        }
    }
}
