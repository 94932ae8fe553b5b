//! Safe arithmetic and boolean expression evaluation.
//!
//! Administrator-authored formulas are untrusted input. This module parses
//! and evaluates them directly, with hard limits on length and recursion
//! depth and a deny-list of identifiers associated with code execution,
//! reflection, process control, and I/O. No expression text ever reaches a
//! dynamic evaluation facility.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use policy_engine::eval::expression;
//! use policy_engine::eval::FieldValue;
//!
//! let mut vars = HashMap::new();
//! vars.insert("count".to_string(), FieldValue::Number(3.0));
//! let result = expression::evaluate_math("count * 50 + 10", &vars).unwrap();
//! assert_eq!(result, 160.0);
//! ```

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::eval::FieldValue;

/// Maximum accepted expression length in characters.
pub const MAX_EXPRESSION_LENGTH: usize = 1000;

/// Maximum parser recursion depth.
pub const MAX_DEPTH: usize = 50;

/// Largest magnitude a result may have (2^53, exact in f64).
const MAX_SAFE_VALUE: f64 = 9_007_199_254_740_992.0;

/// Identifiers that must never appear in an expression. Matched against
/// whole identifiers, case-insensitively.
const DENIED_TOKENS: &[&str] = &[
    "eval",
    "exec",
    "function",
    "constructor",
    "prototype",
    "__proto__",
    "require",
    "import",
    "module",
    "process",
    "child_process",
    "spawn",
    "global",
    "globalthis",
    "this",
    "window",
    "document",
    "settimeout",
    "setinterval",
    "setimmediate",
    "fetch",
    "xmlhttprequest",
    "websocket",
    "fs",
    "readfile",
    "writefile",
    "buffer",
    "new",
    "delete",
    "while",
    "for",
    "return",
    "yield",
    "await",
    "async",
    "class",
    "throw",
];

/// Characters with no legitimate use in a formula.
const DENIED_CHARS: &[char] = &['`', '\'', '"', ';', '\\', '[', ']', '{', '}', '$', '@', '#', '?'];

const FUNCTION_NAMES: &[&str] = &[
    "MAX", "MIN", "ABS", "ROUND", "FLOOR", "CEIL", "SQRT", "POW", "LOG",
];

/// Words that are part of the expression language itself and therefore
/// never treated as context variables.
pub const RESERVED_WORDS: &[&str] = &[
    "MAX", "MIN", "ABS", "ROUND", "FLOOR", "CEIL", "SQRT", "POW", "LOG", "AND", "OR", "NOT",
    "TRUE", "FALSE", "EQUALS", "NOT_EQUALS", "GREATER_THAN", "LESS_THAN",
    "GREATER_THAN_OR_EQUAL", "LESS_THAN_OR_EQUAL", "CONTAINS", "IN", "BETWEEN", "true", "false",
];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Checks an expression against the safety rules without evaluating it:
/// length cap, balanced parentheses, no denied characters, no denied
/// identifiers.
pub fn validate(expression: &str) -> EngineResult<()> {
    if expression.trim().is_empty() {
        return Err(EngineError::parse(expression, "expression is empty"));
    }
    if expression.chars().count() > MAX_EXPRESSION_LENGTH {
        return Err(EngineError::UnsafeExpression {
            message: format!(
                "expression exceeds {} characters",
                MAX_EXPRESSION_LENGTH
            ),
        });
    }
    if let Some(c) = expression.chars().find(|c| DENIED_CHARS.contains(c)) {
        return Err(EngineError::UnsafeExpression {
            message: format!("disallowed character '{}'", c),
        });
    }

    let mut depth: i64 = 0;
    for c in expression.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(EngineError::parse(expression, "unbalanced parentheses"));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(EngineError::parse(expression, "unbalanced parentheses"));
    }

    for token in identifiers(expression) {
        let lowered = token.to_lowercase();
        if DENIED_TOKENS.contains(&lowered.as_str()) {
            return Err(EngineError::UnsafeExpression {
                message: format!("disallowed token '{}'", token),
            });
        }
    }
    Ok(())
}

/// Yields every identifier-shaped token in the expression, in order.
fn identifiers(expression: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in expression.chars() {
        if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else {
            if !current.is_empty() && !current.chars().all(|c| c.is_ascii_digit()) {
                tokens.push(std::mem::take(&mut current));
            }
            current.clear();
        }
    }
    if !current.is_empty() && !current.chars().all(|c| c.is_ascii_digit()) {
        tokens.push(current);
    }
    tokens
}

// ---------------------------------------------------------------------------
// Variable substitution
// ---------------------------------------------------------------------------

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Replaces whole-word occurrences of `word` with `replacement`.
/// Boundaries are any characters that cannot appear in a variable name.
fn replace_word(text: &str, word: &str, replacement: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let needle: Vec<char> = word.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let matches_here = i + needle.len() <= chars.len()
            && chars[i..i + needle.len()] == needle[..]
            && (i == 0 || !is_name_char(chars[i - 1]))
            && (i + needle.len() == chars.len() || !is_name_char(chars[i + needle.len()]));
        if matches_here {
            out.push_str(replacement);
            i += needle.len();
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Substitutes variables into the expression, longest name first so a
/// short name never clobbers part of a longer one.
fn substitute(expression: &str, variables: &HashMap<String, FieldValue>) -> String {
    let mut names: Vec<&String> = variables.keys().collect();
    names.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

    let mut result = expression.to_string();
    for name in names {
        let replacement = match &variables[name] {
            FieldValue::Number(n) => format!("({})", format_number(*n)),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(_) => continue,
        };
        result = replace_word(&result, name, &replacement);
    }
    result
}

fn format_number(value: f64) -> String {
    if value == value.trunc() && value.abs() < MAX_SAFE_VALUE {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ---------------------------------------------------------------------------
// Function calls
// ---------------------------------------------------------------------------

/// Locates the next function call, returning (name, name start, paren index).
fn find_function(expression: &str) -> Option<(String, usize, usize)> {
    let chars: Vec<char> = expression.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_alphabetic() || chars[i] == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let mut j = i;
            while j < chars.len() && chars[j] == ' ' {
                j += 1;
            }
            if j < chars.len()
                && chars[j] == '('
                && FUNCTION_NAMES.contains(&name.to_uppercase().as_str())
            {
                return Some((name, start, j));
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Index of the ')' matching the '(' at `open`, in char positions.
fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in chars.iter().enumerate().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level_commas(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    for c in args.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn apply_function(name: &str, args: &[f64], expression: &str) -> EngineResult<f64> {
    let arity_error = |expected: &str| {
        EngineError::parse(
            expression,
            format!("{} expects {} argument(s), got {}", name, expected, args.len()),
        )
    };
    match name.to_uppercase().as_str() {
        "MAX" => {
            if args.is_empty() {
                return Err(arity_error("at least 1"));
            }
            Ok(args.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
        }
        "MIN" => {
            if args.is_empty() {
                return Err(arity_error("at least 1"));
            }
            Ok(args.iter().cloned().fold(f64::INFINITY, f64::min))
        }
        "ABS" => match args {
            [x] => Ok(x.abs()),
            _ => Err(arity_error("1")),
        },
        "ROUND" => match args {
            [x] => Ok(x.round()),
            _ => Err(arity_error("1")),
        },
        "FLOOR" => match args {
            [x] => Ok(x.floor()),
            _ => Err(arity_error("1")),
        },
        "CEIL" => match args {
            [x] => Ok(x.ceil()),
            _ => Err(arity_error("1")),
        },
        "SQRT" => match args {
            [x] if *x >= 0.0 => Ok(x.sqrt()),
            [_] => Err(EngineError::NumericOverflow {
                message: "SQRT of a negative number".to_string(),
            }),
            _ => Err(arity_error("1")),
        },
        "POW" => match args {
            [base, exp] => Ok(base.powf(*exp)),
            _ => Err(arity_error("2")),
        },
        "LOG" => match args {
            [x] if *x > 0.0 => Ok(x.ln()),
            [_] => Err(EngineError::NumericOverflow {
                message: "LOG of a non-positive number".to_string(),
            }),
            _ => Err(arity_error("1")),
        },
        other => Err(EngineError::parse(
            expression,
            format!("unknown function '{}'", other),
        )),
    }
}

/// Evaluates every function call in the expression, innermost first,
/// replacing each with its numeric result.
fn process_functions(expression: &str, depth: usize, original: &str) -> EngineResult<String> {
    if depth > MAX_DEPTH {
        return Err(EngineError::parse(original, "expression nests too deeply"));
    }
    let mut current = expression.to_string();
    while let Some((name, name_start, paren)) = find_function(&current) {
        let chars: Vec<char> = current.chars().collect();
        let close = matching_paren(&chars, paren)
            .ok_or_else(|| EngineError::parse(original, "unbalanced parentheses"))?;
        let inner: String = chars[paren + 1..close].iter().collect();
        let inner = process_functions(&inner, depth + 1, original)?;
        let args = split_top_level_commas(&inner)
            .iter()
            .map(|part| eval_arithmetic(part, depth + 1, original))
            .collect::<EngineResult<Vec<f64>>>()?;
        let value = apply_function(&name, &args, original)?;

        let prefix: String = chars[..name_start].iter().collect();
        let suffix: String = chars[close + 1..].iter().collect();
        current = format!("{}({}){}", prefix, format_number(value), suffix);
    }
    Ok(current)
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

fn is_unary_sign(chars: &[char], index: usize) -> bool {
    let mut i = index;
    while i > 0 {
        i -= 1;
        let c = chars[i];
        if c == ' ' {
            continue;
        }
        return matches!(c, '+' | '-' | '*' | '/' | '%' | '(');
    }
    true
}

/// Right-to-left scan for the split point of the lowest-precedence
/// operator level present outside parentheses.
fn find_split(chars: &[char]) -> Option<(usize, usize, &'static str)> {
    // additive level
    let mut depth = 0;
    for i in (0..chars.len()).rev() {
        match chars[i] {
            ')' => depth += 1,
            '(' => depth -= 1,
            '+' | '-' if depth == 0 => {
                if !is_unary_sign(chars, i) {
                    let op = if chars[i] == '+' { "+" } else { "-" };
                    return Some((i, i + 1, op));
                }
            }
            _ => {}
        }
    }
    // multiplicative level, skipping '*' that belongs to '**'
    depth = 0;
    for i in (0..chars.len()).rev() {
        match chars[i] {
            ')' => depth += 1,
            '(' => depth -= 1,
            '*' if depth == 0 => {
                let part_of_power = (i > 0 && chars[i - 1] == '*')
                    || (i + 1 < chars.len() && chars[i + 1] == '*');
                if !part_of_power {
                    return Some((i, i + 1, "*"));
                }
            }
            '/' if depth == 0 => return Some((i, i + 1, "/")),
            '%' if depth == 0 => return Some((i, i + 1, "%")),
            _ => {}
        }
    }
    // power level; right-most split keeps the operator left-associative
    depth = 0;
    for i in (0..chars.len().saturating_sub(1)).rev() {
        match chars[i] {
            ')' => depth += 1,
            '(' => depth -= 1,
            '*' if depth == 0 && chars[i + 1] == '*' => {
                return Some((i, i + 2, "**"));
            }
            _ => {}
        }
    }
    None
}

/// True when the expression is fully wrapped in one pair of parentheses.
fn fully_parenthesized(chars: &[char]) -> bool {
    if chars.first() != Some(&'(') || chars.last() != Some(&')') {
        return false;
    }
    let mut depth = 0;
    for (i, c) in chars.iter().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != chars.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

fn parse_number(text: &str, original: &str) -> EngineResult<f64> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    let valid = !unsigned.is_empty()
        && unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        && unsigned.chars().filter(|c| *c == '.').count() <= 1;
    if !valid {
        return Err(EngineError::parse(
            original,
            format!("cannot parse '{}' as a number", trimmed),
        ));
    }
    trimmed.parse::<f64>().map_err(|_| {
        EngineError::parse(original, format!("cannot parse '{}' as a number", trimmed))
    })
}

fn eval_arithmetic(expression: &str, depth: usize, original: &str) -> EngineResult<f64> {
    if depth > MAX_DEPTH {
        return Err(EngineError::parse(original, "expression nests too deeply"));
    }
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(EngineError::parse(original, "empty sub-expression"));
    }
    let chars: Vec<char> = trimmed.chars().collect();
    if fully_parenthesized(&chars) {
        let inner: String = chars[1..chars.len() - 1].iter().collect();
        return eval_arithmetic(&inner, depth + 1, original);
    }

    if let Some((start, end, op)) = find_split(&chars) {
        let left: String = chars[..start].iter().collect();
        let right: String = chars[end..].iter().collect();

        // a leading '-' with an empty left side is a negation
        if left.trim().is_empty() && op == "-" {
            return Ok(-eval_arithmetic(&right, depth + 1, original)?);
        }
        if left.trim().is_empty() && op == "+" {
            return eval_arithmetic(&right, depth + 1, original);
        }

        let lhs = eval_arithmetic(&left, depth + 1, original)?;
        let rhs = eval_arithmetic(&right, depth + 1, original)?;
        return match op {
            "+" => Ok(lhs + rhs),
            "-" => Ok(lhs - rhs),
            "*" => Ok(lhs * rhs),
            "/" => {
                if rhs == 0.0 {
                    Err(EngineError::DivisionByZero {
                        expression: original.to_string(),
                    })
                } else {
                    Ok(lhs / rhs)
                }
            }
            "%" => {
                if rhs == 0.0 {
                    Err(EngineError::DivisionByZero {
                        expression: original.to_string(),
                    })
                } else {
                    Ok(lhs % rhs)
                }
            }
            "**" => Ok(lhs.powf(rhs)),
            _ => unreachable!("find_split only returns supported operators"),
        };
    }

    parse_number(trimmed, original)
}

fn check_result(value: f64, original: &str) -> EngineResult<f64> {
    if !value.is_finite() {
        return Err(EngineError::NumericOverflow {
            message: format!("result of '{}' is not finite", original),
        });
    }
    if value.abs() > MAX_SAFE_VALUE {
        return Err(EngineError::NumericOverflow {
            message: format!("result of '{}' exceeds the safe range", original),
        });
    }
    // suppress floating-point noise
    Ok((value * 1e10).round() / 1e10)
}

/// Evaluates an arithmetic expression against a variable map.
///
/// Unmatched variables are a parse error. The result is range-checked
/// and rounded to 10 decimal places.
pub fn evaluate_math(
    expression: &str,
    variables: &HashMap<String, FieldValue>,
) -> EngineResult<f64> {
    validate(expression)?;
    let substituted = substitute(expression, variables);
    let without_functions = process_functions(&substituted, 0, expression)?;
    let value = eval_arithmetic(&without_functions, 0, expression)?;
    check_result(value, expression)
}

// ---------------------------------------------------------------------------
// Boolean expressions
// ---------------------------------------------------------------------------

/// Word aliases normalized to symbols before boolean parsing. Longest
/// first so compound names win.
const WORD_ALIASES: &[(&str, &str)] = &[
    ("GREATER_THAN_OR_EQUAL", ">="),
    ("LESS_THAN_OR_EQUAL", "<="),
    ("GREATER_THAN", ">"),
    ("LESS_THAN", "<"),
    ("NOT_EQUALS", "!="),
    ("EQUALS", "=="),
    ("AND", "&&"),
    ("OR", "||"),
    ("NOT", "!"),
    ("TRUE", "true"),
    ("FALSE", "false"),
];

fn normalize_aliases(expression: &str) -> String {
    let mut result = expression.to_string();
    for (word, symbol) in WORD_ALIASES {
        result = replace_word(&result, word, symbol);
    }
    result
}

const COMPARISON_OPS: &[&str] = &[">=", "<=", "===", "!==", "==", "!=", ">", "<"];

/// Finds the first top-level occurrence of a two-char token.
fn find_token(chars: &[char], token: &str) -> Option<usize> {
    let needle: Vec<char> = token.chars().collect();
    let mut depth = 0;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && i + needle.len() <= chars.len() && chars[i..i + needle.len()] == needle[..]
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Finds a comparison operator outside parentheses, preferring longer
/// operators so `>=` is never split as `>` then `=`.
fn find_comparison(chars: &[char]) -> Option<(usize, &'static str)> {
    for op in COMPARISON_OPS {
        let needle: Vec<char> = op.chars().collect();
        let mut depth = 0;
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth == 0 && i + needle.len() <= chars.len() {
                let window = &chars[i..i + needle.len()];
                if window == needle.as_slice() {
                    // '>' must not shadow '>='; '==' must not shadow '==='
                    let next = chars.get(i + needle.len());
                    let extends = matches!(next, Some('=')) && (*op == ">" || *op == "<" || *op == "==" || *op == "!=");
                    if !extends {
                        return Some((i, op));
                    }
                }
            }
            i += 1;
        }
    }
    None
}

struct BoolEval<'a> {
    original: &'a str,
    lenient: bool,
}

impl BoolEval<'_> {
    fn eval(&self, expression: &str, depth: usize) -> EngineResult<bool> {
        if depth > MAX_DEPTH {
            return Err(EngineError::parse(self.original, "expression nests too deeply"));
        }
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(EngineError::parse(self.original, "empty sub-expression"));
        }
        let chars: Vec<char> = trimmed.chars().collect();
        if fully_parenthesized(&chars) {
            let inner: String = chars[1..chars.len() - 1].iter().collect();
            return self.eval(&inner, depth + 1);
        }

        if let Some(i) = find_token(&chars, "||") {
            let left: String = chars[..i].iter().collect();
            let right: String = chars[i + 2..].iter().collect();
            return Ok(self.eval(&left, depth + 1)? || self.eval(&right, depth + 1)?);
        }
        if let Some(i) = find_token(&chars, "&&") {
            let left: String = chars[..i].iter().collect();
            let right: String = chars[i + 2..].iter().collect();
            return Ok(self.eval(&left, depth + 1)? && self.eval(&right, depth + 1)?);
        }
        if chars[0] == '!' && chars.get(1) != Some(&'=') {
            let rest: String = chars[1..].iter().collect();
            return Ok(!self.eval(&rest, depth + 1)?);
        }

        if let Some((i, op)) = find_comparison(&chars) {
            let left: String = chars[..i].iter().collect();
            let right: String = chars[i + op.chars().count()..].iter().collect();
            return self.compare(left.trim(), op, right.trim());
        }

        match trimmed {
            "true" => Ok(true),
            "false" => Ok(false),
            other => {
                if let Ok(n) = eval_arithmetic(other, depth + 1, self.original) {
                    Ok(n != 0.0)
                } else if self.lenient {
                    Ok(false)
                } else {
                    Err(EngineError::parse(
                        self.original,
                        format!("cannot interpret '{}' as a boolean", other),
                    ))
                }
            }
        }
    }

    fn compare(&self, left: &str, op: &str, right: &str) -> EngineResult<bool> {
        let left_num = eval_arithmetic(left, 0, self.original).ok();
        let right_num = eval_arithmetic(right, 0, self.original).ok();

        if let (Some(a), Some(b)) = (left_num, right_num) {
            return Ok(match op {
                ">" => a > b,
                ">=" => a >= b,
                "<" => a < b,
                "<=" => a <= b,
                "==" | "===" => a == b,
                "!=" | "!==" => a != b,
                _ => unreachable!("find_comparison only returns supported operators"),
            });
        }

        // non-numeric equality compares text case-insensitively;
        // boolean literals compare as text too ("true" == "true")
        match op {
            "==" | "===" => Ok(left.eq_ignore_ascii_case(right)),
            "!=" | "!==" => Ok(!left.eq_ignore_ascii_case(right)),
            _ if self.lenient => Ok(false),
            _ => Err(EngineError::FieldUnresolved {
                field: if left_num.is_none() { left } else { right }.to_string(),
            }),
        }
    }
}

/// Evaluates a boolean expression against a variable map.
///
/// Word aliases (`AND`, `GREATER_THAN`, ...) normalize to symbols first.
/// With `lenient` set, a comparison whose operand cannot be resolved
/// numerically evaluates to `false` instead of failing.
pub fn evaluate_boolean(
    expression: &str,
    variables: &HashMap<String, FieldValue>,
    lenient: bool,
) -> EngineResult<bool> {
    validate(expression)?;
    let normalized = normalize_aliases(expression);
    let substituted = substitute(&normalized, variables);
    BoolEval {
        original: expression,
        lenient,
    }
    .eval(&substituted, 0)
}

// ---------------------------------------------------------------------------
// Direct value comparison
// ---------------------------------------------------------------------------

/// Compares two values directly, without the expression parser.
///
/// Numeric when both sides coerce to numbers; otherwise case-insensitive
/// text comparison with `CONTAINS`, `STARTS_WITH`, `ENDS_WITH`, and `IN`
/// support. Operator word aliases are accepted.
pub fn evaluate_comparison(
    left: &FieldValue,
    operator: &str,
    right: &FieldValue,
) -> EngineResult<bool> {
    let op = match operator {
        "GREATER_THAN" => ">",
        "GREATER_THAN_OR_EQUAL" => ">=",
        "LESS_THAN" => "<",
        "LESS_THAN_OR_EQUAL" => "<=",
        "EQUALS" | "=" | "===" => "==",
        "NOT_EQUALS" | "!==" => "!=",
        other => other,
    };

    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        match op {
            ">" => return Ok(a > b),
            ">=" => return Ok(a >= b),
            "<" => return Ok(a < b),
            "<=" => return Ok(a <= b),
            "==" => return Ok(a == b),
            "!=" => return Ok(a != b),
            _ => {}
        }
    }

    let left_text = left.to_string().to_lowercase();
    let right_text = right.to_string().to_lowercase();
    match op {
        "==" => Ok(left_text == right_text),
        "!=" => Ok(left_text != right_text),
        "CONTAINS" => Ok(left_text.contains(&right_text)),
        "STARTS_WITH" => Ok(left_text.starts_with(&right_text)),
        "ENDS_WITH" => Ok(left_text.ends_with(&right_text)),
        "IN" => match right {
            FieldValue::List(items) => Ok(items
                .iter()
                .any(|item| item.to_string().to_lowercase() == left_text)),
            FieldValue::Text(csv) => Ok(csv
                .split(',')
                .any(|item| item.trim().to_lowercase() == left_text)),
            _ => Ok(false),
        },
        other => Err(EngineError::parse(
            other,
            "unsupported comparison operator",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_vars() -> HashMap<String, FieldValue> {
        HashMap::new()
    }

    fn vars(pairs: &[(&str, FieldValue)]) -> HashMap<String, FieldValue> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Arithmetic
    // -----------------------------------------------------------------------

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(evaluate_math("(2+3)*4", &no_vars()).unwrap(), 20.0);
        assert_eq!(evaluate_math("10 - 2 - 3", &no_vars()).unwrap(), 5.0);
        assert_eq!(evaluate_math("2 + 3 * 4", &no_vars()).unwrap(), 14.0);
        assert_eq!(evaluate_math("100 / 4 / 5", &no_vars()).unwrap(), 5.0);
        assert_eq!(evaluate_math("10 % 3", &no_vars()).unwrap(), 1.0);
        assert_eq!(evaluate_math("2 ** 10", &no_vars()).unwrap(), 1024.0);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(evaluate_math("-5 + 10", &no_vars()).unwrap(), 5.0);
        assert_eq!(evaluate_math("3 * -2", &no_vars()).unwrap(), -6.0);
        assert_eq!(evaluate_math("-(2 + 3)", &no_vars()).unwrap(), -5.0);
    }

    #[test]
    fn test_power_is_left_associative() {
        assert_eq!(evaluate_math("2 ** 3 ** 2", &no_vars()).unwrap(), 64.0);
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert!(matches!(
            evaluate_math("1/0", &no_vars()),
            Err(EngineError::DivisionByZero { .. })
        ));
        assert!(matches!(
            evaluate_math("5 % 0", &no_vars()),
            Err(EngineError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_variable_substitution() {
        let variables = vars(&[
            ("salary", FieldValue::Number(3000.0)),
            ("days", FieldValue::Number(3.0)),
        ]);
        assert_eq!(
            evaluate_math("salary / 30 * days", &variables).unwrap(),
            300.0
        );
    }

    #[test]
    fn test_longest_name_substitutes_first() {
        let variables = vars(&[
            ("rate", FieldValue::Number(2.0)),
            ("rateExtra", FieldValue::Number(10.0)),
        ]);
        assert_eq!(evaluate_math("rateExtra + rate", &variables).unwrap(), 12.0);
    }

    #[test]
    fn test_unmatched_variable_is_an_error() {
        assert!(evaluate_math("missing + 1", &no_vars()).is_err());
    }

    #[test]
    fn test_functions() {
        assert_eq!(evaluate_math("MAX(1, 5, 3)", &no_vars()).unwrap(), 5.0);
        assert_eq!(evaluate_math("MIN(4, 2)", &no_vars()).unwrap(), 2.0);
        assert_eq!(evaluate_math("ABS(-7)", &no_vars()).unwrap(), 7.0);
        assert_eq!(evaluate_math("ROUND(2.6)", &no_vars()).unwrap(), 3.0);
        assert_eq!(evaluate_math("FLOOR(2.9)", &no_vars()).unwrap(), 2.0);
        assert_eq!(evaluate_math("CEIL(2.1)", &no_vars()).unwrap(), 3.0);
        assert_eq!(evaluate_math("SQRT(49)", &no_vars()).unwrap(), 7.0);
        assert_eq!(evaluate_math("POW(2, 8)", &no_vars()).unwrap(), 256.0);
    }

    #[test]
    fn test_functions_are_case_insensitive_and_nest() {
        assert_eq!(
            evaluate_math("max(MIN(10, 4), abs(-3))", &no_vars()).unwrap(),
            4.0
        );
        assert_eq!(
            evaluate_math("ROUND(SQRT(2) * 100)", &no_vars()).unwrap(),
            141.0
        );
    }

    #[test]
    fn test_result_rounded_to_ten_decimals() {
        assert_eq!(evaluate_math("0.1 + 0.2", &no_vars()).unwrap(), 0.3);
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            evaluate_math("9999999999 * 9999999999", &no_vars()),
            Err(EngineError::NumericOverflow { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Safety
    // -----------------------------------------------------------------------

    #[test]
    fn test_deny_list_rejects_code_execution_tokens() {
        for expr in [
            "eval(1)",
            "require(1)",
            "process + 1",
            "constructor",
            "__proto__ + 2",
            "EVAL(2)",
            "fetch(1)",
        ] {
            assert!(
                matches!(
                    evaluate_math(expr, &no_vars()),
                    Err(EngineError::UnsafeExpression { .. })
                ),
                "expected rejection of {:?}",
                expr
            );
        }
    }

    #[test]
    fn test_deny_list_is_whole_word() {
        // "evaluation" contains "eval" but is a distinct identifier
        let variables = vars(&[("evaluation", FieldValue::Number(2.0))]);
        assert_eq!(evaluate_math("evaluation * 3", &variables).unwrap(), 6.0);
    }

    #[test]
    fn test_denied_characters_rejected() {
        assert!(evaluate_math("`1`", &no_vars()).is_err());
        assert!(evaluate_math("1; 2", &no_vars()).is_err());
        assert!(evaluate_math("a['b']", &no_vars()).is_err());
    }

    #[test]
    fn test_length_cap() {
        let long = "1+".repeat(600) + "1";
        assert!(matches!(
            evaluate_math(&long, &no_vars()),
            Err(EngineError::UnsafeExpression { .. })
        ));
    }

    #[test]
    fn test_unbalanced_parens_rejected() {
        assert!(evaluate_math("(1 + 2", &no_vars()).is_err());
        assert!(evaluate_math("1 + 2)", &no_vars()).is_err());
        assert!(evaluate_math(")(", &no_vars()).is_err());
    }

    #[test]
    fn test_depth_cap() {
        let nested = "(".repeat(60) + "1" + &")".repeat(60);
        assert!(evaluate_math(&nested, &no_vars()).is_err());
    }

    // -----------------------------------------------------------------------
    // Boolean
    // -----------------------------------------------------------------------

    #[test]
    fn test_boolean_examples() {
        let met = vars(&[("a", FieldValue::Number(5.0)), ("b", FieldValue::Bool(true))]);
        assert!(evaluate_boolean("a > 3 && b == true", &met, false).unwrap());

        let unmet = vars(&[("a", FieldValue::Number(2.0)), ("b", FieldValue::Bool(true))]);
        assert!(!evaluate_boolean("a > 3 && b == true", &unmet, false).unwrap());
    }

    #[test]
    fn test_boolean_or_and_not() {
        let variables = vars(&[("x", FieldValue::Number(1.0))]);
        assert!(evaluate_boolean("x == 2 || x == 1", &variables, false).unwrap());
        assert!(evaluate_boolean("!(x > 5)", &variables, false).unwrap());
        assert!(!evaluate_boolean("x != 1", &variables, false).unwrap());
    }

    #[test]
    fn test_boolean_word_aliases() {
        let variables = vars(&[("late", FieldValue::Number(4.0))]);
        assert!(evaluate_boolean("late GREATER_THAN 3 AND TRUE", &variables, false).unwrap());
        assert!(evaluate_boolean("NOT (late LESS_THAN 2)", &variables, false).unwrap());
        assert!(evaluate_boolean("late EQUALS 4 OR FALSE", &variables, false).unwrap());
    }

    #[test]
    fn test_boolean_triple_equals() {
        let variables = vars(&[("a", FieldValue::Number(3.0))]);
        assert!(evaluate_boolean("a === 3", &variables, false).unwrap());
        assert!(evaluate_boolean("a !== 4", &variables, false).unwrap());
    }

    #[test]
    fn test_boolean_arithmetic_operands() {
        assert!(evaluate_boolean("2 + 3 > 4", &no_vars(), false).unwrap());
        assert!(!evaluate_boolean("10 / 2 >= 6", &no_vars(), false).unwrap());
    }

    #[test]
    fn test_lenient_mode_resolves_unknowns_to_false() {
        assert!(!evaluate_boolean("unknownField > 3", &no_vars(), true).unwrap());
        assert!(evaluate_boolean("unknownField > 3", &no_vars(), false).is_err());
    }

    // -----------------------------------------------------------------------
    // Direct comparison
    // -----------------------------------------------------------------------

    #[test]
    fn test_comparison_numeric() {
        let five = FieldValue::Number(5.0);
        let three = FieldValue::Number(3.0);
        assert!(evaluate_comparison(&five, ">", &three).unwrap());
        assert!(evaluate_comparison(&three, "LESS_THAN_OR_EQUAL", &three).unwrap());
        assert!(!evaluate_comparison(&five, "==", &three).unwrap());
    }

    #[test]
    fn test_comparison_text_is_case_insensitive() {
        let left = FieldValue::Text("Sales".to_string());
        let right = FieldValue::Text("sales".to_string());
        assert!(evaluate_comparison(&left, "==", &right).unwrap());
        assert!(evaluate_comparison(&left, "CONTAINS", &FieldValue::Text("ale".into())).unwrap());
        assert!(evaluate_comparison(&left, "STARTS_WITH", &FieldValue::Text("sa".into())).unwrap());
        assert!(evaluate_comparison(&left, "ENDS_WITH", &FieldValue::Text("LES".into())).unwrap());
    }

    #[test]
    fn test_comparison_in_list_and_csv() {
        let left = FieldValue::Text("manager".to_string());
        let list = FieldValue::List(vec![
            FieldValue::Text("clerk".into()),
            FieldValue::Text("Manager".into()),
        ]);
        assert!(evaluate_comparison(&left, "IN", &list).unwrap());
        let csv = FieldValue::Text("clerk, manager, director".to_string());
        assert!(evaluate_comparison(&left, "IN", &csv).unwrap());
        assert!(!evaluate_comparison(&FieldValue::Text("intern".into()), "IN", &csv).unwrap());
    }
}
