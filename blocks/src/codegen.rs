//! Text emitters shared by the block definitions.

use tracing::warn;

use crate::compiler::Fragment;

/// Variable holding the loop work done so far in a run.
pub const LOOP_GUARD_VARIABLE: &str = "__loop_guard";
/// Loop iterations allowed per run, across all roots.
pub const LOOP_GUARD_LIMIT: u64 = 5000;

const INDENT: &str = "  ";

/// Program prelude declaring the shared loop-guard counter.
pub fn loop_guard_prelude() -> String {
    format!("let {} = 0;", LOOP_GUARD_VARIABLE)
}

/// Encode `value` as a block script string literal.
pub fn quote(value: &str) -> String {
    // JSON string escapes are exactly what the block script lexer accepts.
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

/// `name("value");` for both fragments.
pub fn call_statement(function: &str, value: &str) -> Fragment {
    let code = format!("{}({});", function, quote(value));
    Fragment {
        executable: code.clone(),
        display: code,
    }
}

pub fn draw_sprite(costume: &str) -> Fragment {
    Fragment {
        executable: format!("draw_sprite({});", quote(costume)),
        display: format!("Draw sprite \"{}\" on canvas", costume),
    }
}

/// Parse a loop count the way a leading-integer parse would: optional sign,
/// then leading digits; anything after them is ignored. `None` when there
/// are no leading digits.
pub fn parse_count(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Resolve a repeat count, falling back to the declared default (and then
/// to zero) when the literal is not a number.
pub fn repeat_count(input: &str, fallback: &str) -> i64 {
    if let Some(count) = parse_count(input) {
        return count;
    }
    warn!(target: "blocks", input, fallback, "repeat count is not a number, using default");
    parse_count(fallback).unwrap_or(0)
}

/// Loop body prologue: count this iteration, bail out past the ceiling.
fn guard_lines(block_name: &str) -> Vec<String> {
    vec![
        format!("{}++;", LOOP_GUARD_VARIABLE),
        format!("if ({} > {}) {{", LOOP_GUARD_VARIABLE, LOOP_GUARD_LIMIT),
        format!(
            "{}warn({});",
            INDENT,
            quote(&format!("Loop guard tripped in {}", block_name))
        ),
        format!("{}break;", INDENT),
        "}".to_string(),
    ]
}

fn indent(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines().map(|line| {
        if line.is_empty() {
            String::new()
        } else {
            format!("{}{}", INDENT, line)
        }
    })
}

/// `header {` + guard + children + `}`, with the display fragment built from
/// the children's display fragments and no guard.
fn wrap_loop(header: String, block_name: &str, children: &[Fragment]) -> Fragment {
    let mut executable = vec![format!("{} {{", header)];
    for line in guard_lines(block_name) {
        executable.push(format!("{}{}", INDENT, line));
    }
    let mut display = vec![format!("{} {{", header)];

    for child in children {
        executable.extend(indent(&child.executable));
        display.extend(indent(&child.display));
    }

    executable.push("}".to_string());
    display.push("}".to_string());
    Fragment {
        executable: executable.join("\n"),
        display: display.join("\n"),
    }
}

pub fn repeat_loop(count: i64, children: &[Fragment], depth: usize) -> Fragment {
    let var = loop_variable(depth);
    let header = format!("for (let {v} = 0; {v} < {count}; {v}++)", v = var, count = count);
    wrap_loop(header, "repeat", children)
}

pub fn forever_loop(children: &[Fragment]) -> Fragment {
    wrap_loop("while (true)".to_string(), "forever", children)
}

/// Loop counter name for a container at `depth`; distinct per nesting level.
pub fn loop_variable(depth: usize) -> String {
    format!("i{}", depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_parse_leading_integers() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count(" 12 "), Some(12));
        assert_eq!(parse_count("3abc"), Some(3));
        assert_eq!(parse_count("2.9"), Some(2));
        assert_eq!(parse_count("-1"), Some(-1));
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("-"), None);
        assert_eq!(parse_count("99999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn unparseable_count_uses_fallback() {
        assert_eq!(repeat_count("lots", "3"), 3);
        assert_eq!(repeat_count("lots", "nope"), 0);
    }

    #[test]
    fn quoting_escapes_quotes_and_newlines() {
        assert_eq!(quote("say \"hi\"\nbye"), r#""say \"hi\"\nbye""#);
    }

    #[test]
    fn empty_loop_has_guard_and_closing_brace() {
        let fragment = repeat_loop(3, &[], 0);
        assert_eq!(
            fragment.executable,
            "for (let i0 = 0; i0 < 3; i0++) {\n  __loop_guard++;\n  if (__loop_guard > 5000) {\n    warn(\"Loop guard tripped in repeat\");\n    break;\n  }\n}"
        );
        assert_eq!(fragment.display, "for (let i0 = 0; i0 < 3; i0++) {\n}");
    }

    #[test]
    fn children_are_indented() {
        let child = call_statement("print", "x");
        let fragment = forever_loop(&[child]);
        assert!(fragment.executable.ends_with("\n  print(\"x\");\n}"));
        assert_eq!(fragment.display, "while (true) {\n  print(\"x\");\n}");
    }
}
