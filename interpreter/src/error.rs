use std::fmt;
use std::ops::Range;

#[derive(Debug)]
pub enum RuntimeError {
    UndefinedVariable(String),
    UndefinedFunction(String),
    BreakOutsideLoop,
    IoError(String),
    StackOverflow,
    Custom(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable(name) => write!(f, "{} is not defined", name),
            RuntimeError::UndefinedFunction(name) => write!(f, "{} is not a function", name),
            RuntimeError::BreakOutsideLoop => write!(f, "`break` outside of a loop"),
            RuntimeError::IoError(msg) => write!(f, "I/O error: {}", msg),
            RuntimeError::StackOverflow => write!(f, "nesting too deep"),
            RuntimeError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<std::io::Error> for RuntimeError {
    fn from(error: std::io::Error) -> Self {
        RuntimeError::IoError(error.to_string())
    }
}

/// A runtime error or warning enriched with source location information.
#[derive(Debug)]
pub struct DiagnosticError {
    pub error: RuntimeError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
    pub is_warning: bool,
}

impl DiagnosticError {
    /// Create a warning diagnostic with a source span.
    pub fn warning(message: String, span: Range<usize>, source_id: usize) -> Self {
        DiagnosticError {
            error: RuntimeError::Custom(message),
            span: Some(span),
            source_id,
            is_warning: true,
        }
    }

    /// Attach a span, keeping any span that is already more specific.
    pub fn at(mut self, span: &Range<usize>, source_id: usize) -> Self {
        if self.span.is_none() {
            self.span = Some(span.clone());
            self.source_id = source_id;
        }
        self
    }
}

impl From<RuntimeError> for DiagnosticError {
    fn from(error: RuntimeError) -> Self {
        DiagnosticError {
            error,
            span: None,
            source_id: 0,
            is_warning: false,
        }
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for DiagnosticError {}
