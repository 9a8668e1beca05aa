//! Minimal expression handling for the debugger
//!
//! Expressions are single tokens: a number, `true`/`false`, a quoted string
//! or a variable name. Anything else is kept as a raw string. This is a
//! preview interpreter, not an expression language.

use serde_json::{Number, Value};
use std::collections::HashMap;

/// Largest integer a double represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Resolve an assignment expression to a value
///
/// Priority: numeric literal, boolean literal, quoted string (all quotes
/// stripped), defined variable, raw text. Blank text is the number 0.
pub fn resolve_value(expression: &str, variables: &HashMap<String, Value>) -> Value {
    if let Some(number) = parse_number(expression) {
        return number_value(number);
    }
    match expression {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if expression.starts_with('"') {
        return Value::String(expression.replace('"', ""));
    }
    match variables.get(expression) {
        Some(value) if !value.is_null() => value.clone(),
        _ => Value::String(expression.to_string()),
    }
}

/// Evaluate a branch condition
///
/// True only for the literal `true` or the name of a truthy variable.
pub fn evaluate_condition(expression: &str, variables: &HashMap<String, Value>) -> bool {
    expression == "true" || variables.get(expression).is_some_and(is_truthy)
}

/// Truthiness as the editor's users expect it from scripting languages
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a value for a log line
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "undefined".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Store integral numbers as JSON integers so `5` stays `5`, not `5.0`
fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        Value::from(number as i64)
    } else {
        Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
