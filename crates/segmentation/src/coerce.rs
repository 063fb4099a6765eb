//! Loose value coercions used by predicate evaluation.
//!
//! Record fields and predicate operands carry no declared types, so
//! operators compare through loose coercions: truthiness, string form and
//! numeric form. Every function here is total.

use crm_core::FieldValue;
use serde_json::{Number, Value};

/// Falsy values: missing, `null`, `false`, `0` and `""`.
pub fn is_truthy(value: FieldValue<'_>) -> bool {
    match value {
        FieldValue::Missing => false,
        FieldValue::Present(value) => match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        },
    }
}

/// String form of a present value.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        // Array joins render null elements as empty strings.
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Numeric form of a field; `NaN` when there is none.
pub fn to_number(value: FieldValue<'_>) -> f64 {
    match value {
        FieldValue::Missing => f64::NAN,
        FieldValue::Present(value) => match value {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            Value::String(s) => parse_number(s),
            Value::Array(_) => parse_number(&to_text(value)),
            Value::Object(_) => f64::NAN,
        },
    }
}

/// Strict equality: same type and same value, no coercion.
pub fn strict_equals(actual: FieldValue<'_>, expected: &Value) -> bool {
    let FieldValue::Present(actual) = actual else {
        return false;
    };
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::String(a), Value::String(b)) => a == b,
        // Arrays and objects compare by identity, and a predicate operand
        // is never the same instance as a record field.
        _ => false,
    }
}

/// Parse a string the way a loose numeric cast does.
///
/// Surrounding whitespace is ignored and the empty string is `0`. Accepts
/// decimal and exponent notation, signed `Infinity`, and unsigned `0x`,
/// `0o`, `0b` integer literals. Anything else is `NaN`.
pub fn parse_number(input: &str) -> f64 {
    let s = input.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return parse_radix(digits, radix);
        }
    }
    // f64's parser also takes "inf" and "nan" spellings; reject anything
    // outside plain decimal notation first.
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut acc = 0.0_f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => acc = acc * f64::from(radix) + f64::from(d),
            None => return f64::NAN,
        }
    }
    acc
}

fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) => float_text(f),
        None => n.to_string(),
    }
}

/// Render a float without a trailing `.0` for integral values. Magnitudes
/// from `1e21` up and below `1e-6` use exponent notation with an explicit
/// exponent sign (`1e+21`, `1.5e-7`).
pub(crate) fn float_text(f: f64) -> String {
    if f == 0.0 {
        "0".to_string()
    } else if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if f.abs() >= 1e21 || f.abs() < 1e-6 {
        let text = format!("{f:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        }
    } else {
        // Display already drops the fractional part of integral floats.
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(FieldValue::Present(&falsy)), "{falsy} should be falsy");
        }
        assert!(!is_truthy(FieldValue::Missing));
        for truthy in [json!(true), json!(-1), json!("0"), json!(" "), json!([]), json!({})] {
            assert!(is_truthy(FieldValue::Present(&truthy)), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_text_form() {
        assert_eq!(to_text(&json!(null)), "null");
        assert_eq!(to_text(&json!(true)), "true");
        assert_eq!(to_text(&json!(42)), "42");
        assert_eq!(to_text(&json!(42.0)), "42");
        assert_eq!(to_text(&json!(2.5)), "2.5");
        assert_eq!(to_text(&json!([1, null, "a"])), "1,,a");
        assert_eq!(to_text(&json!({"a": 1})), "[object Object]");
    }

    #[test]
    fn test_exponent_text_form() {
        assert_eq!(float_text(1e21), "1e+21");
        assert_eq!(float_text(1.23e22), "1.23e+22");
        assert_eq!(float_text(-2e30), "-2e+30");
        assert_eq!(float_text(1e-7), "1e-7");
        assert_eq!(float_text(1.5e-7), "1.5e-7");
        assert_eq!(float_text(1e20), "100000000000000000000");
        assert_eq!(float_text(0.000001), "0.000001");
        assert_eq!(to_text(&json!(1e21)), "1e+21");
    }

    #[test]
    fn test_number_form() {
        assert!(to_number(FieldValue::Missing).is_nan());
        assert_eq!(to_number(FieldValue::Present(&json!(null))), 0.0);
        assert_eq!(to_number(FieldValue::Present(&json!(true))), 1.0);
        assert_eq!(to_number(FieldValue::Present(&json!(" 12.5 "))), 12.5);
        assert_eq!(to_number(FieldValue::Present(&json!(""))), 0.0);
        assert_eq!(to_number(FieldValue::Present(&json!([]))), 0.0);
        assert_eq!(to_number(FieldValue::Present(&json!(["7"]))), 7.0);
        assert!(to_number(FieldValue::Present(&json!([1, 2]))).is_nan());
        assert!(to_number(FieldValue::Present(&json!({}))).is_nan());
    }

    #[test]
    fn test_parse_number_edge_cases() {
        assert_eq!(parse_number("1e3"), 1000.0);
        assert_eq!(parse_number(".5"), 0.5);
        assert_eq!(parse_number("-7"), -7.0);
        assert_eq!(parse_number("0x1A"), 26.0);
        assert_eq!(parse_number("0b101"), 5.0);
        assert_eq!(parse_number("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_number("abc").is_nan());
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("NaN").is_nan());
        assert!(parse_number("12px").is_nan());
        assert!(parse_number("0x").is_nan());
        assert!(parse_number("2024-01-15").is_nan());
    }

    #[test]
    fn test_strict_equality() {
        let thirty = json!(30);
        assert!(strict_equals(FieldValue::Present(&thirty), &json!(30.0)));
        assert!(!strict_equals(FieldValue::Present(&thirty), &json!("30")));
        assert!(strict_equals(FieldValue::Present(&json!(null)), &json!(null)));
        assert!(!strict_equals(FieldValue::Missing, &json!(null)));
        assert!(!strict_equals(FieldValue::Present(&json!([1])), &json!([1])));
    }
}
