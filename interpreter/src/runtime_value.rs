use std::fmt;

/// A runtime value produced by evaluating an expression.
///
/// Coercions follow the host page's scripting rules: `+` concatenates when
/// either side is a string, other arithmetic coerces to numbers, and
/// equality is strict (no cross-type equality).
#[derive(Debug, Clone)]
pub enum RuntimeValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Undefined,
}

impl RuntimeValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::Number(n) => *n != 0.0 && !n.is_nan(),
            RuntimeValue::Boolean(b) => *b,
            RuntimeValue::String(s) => !s.is_empty(),
            RuntimeValue::Undefined => false,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            RuntimeValue::Number(n) => *n,
            RuntimeValue::Boolean(true) => 1.0,
            RuntimeValue::Boolean(false) => 0.0,
            RuntimeValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            RuntimeValue::Undefined => f64::NAN,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Number(_) => "number",
            RuntimeValue::Boolean(_) => "boolean",
            RuntimeValue::String(_) => "string",
            RuntimeValue::Undefined => "undefined",
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Number(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
                } else if *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            RuntimeValue::Boolean(b) => write!(f, "{}", b),
            RuntimeValue::String(s) => write!(f, "{}", s),
            RuntimeValue::Undefined => write!(f, "undefined"),
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => a == b, // NaN != NaN per IEEE 754
            (RuntimeValue::Boolean(a), RuntimeValue::Boolean(b)) => a == b,
            (RuntimeValue::String(a), RuntimeValue::String(b)) => a == b,
            (RuntimeValue::Undefined, RuntimeValue::Undefined) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RuntimeValue;

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(RuntimeValue::Number(5.0).to_string(), "5");
        assert_eq!(RuntimeValue::Number(2.5).to_string(), "2.5");
        assert_eq!(RuntimeValue::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(RuntimeValue::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn truthiness() {
        assert!(!RuntimeValue::String(String::new()).is_truthy());
        assert!(RuntimeValue::String("0".into()).is_truthy());
        assert!(!RuntimeValue::Number(0.0).is_truthy());
        assert!(!RuntimeValue::Number(f64::NAN).is_truthy());
        assert!(!RuntimeValue::Undefined.is_truthy());
    }

    #[test]
    fn string_to_number() {
        assert_eq!(RuntimeValue::String(" 42 ".into()).to_number(), 42.0);
        assert_eq!(RuntimeValue::String("".into()).to_number(), 0.0);
        assert!(RuntimeValue::String("abc".into()).to_number().is_nan());
    }
}
