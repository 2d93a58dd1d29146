use serde_json::Value;

/// Largest float magnitude below which every whole number is exact.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Render a request value as the string sent to the engine.
///
/// `null` becomes the empty string, strings are used as-is, arrays and
/// objects use their serialized JSON form, and numbers and booleans use their
/// usual textual form. Whole-number floats drop the fractional part, so
/// `1.0` renders as `"1"`.
pub fn to_input_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
                #[allow(clippy::cast_possible_truncation)]
                let whole = f as i64;
                whole.to_string()
            }
            _ => n.to_string(),
        },
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_is_empty() {
        assert_eq!(to_input_string(&Value::Null), "");
    }

    #[test]
    fn strings_are_not_quoted() {
        assert_eq!(to_input_string(&json!("hello")), "hello");
    }

    #[test]
    fn scalars_use_natural_form() {
        assert_eq!(to_input_string(&json!(42)), "42");
        assert_eq!(to_input_string(&json!(1.5)), "1.5");
        assert_eq!(to_input_string(&json!(true)), "true");
    }

    #[test]
    fn whole_floats_render_without_fraction() {
        assert_eq!(to_input_string(&json!(1.0)), "1");
        assert_eq!(to_input_string(&json!(-3.0)), "-3");
        assert_eq!(to_input_string(&json!(-0.0)), "0");
        assert_eq!(to_input_string(&json!(2.5)), "2.5");
        assert_eq!(to_input_string(&json!(1e300)), "1e300");
    }

    #[test]
    fn structured_values_are_serialized() {
        assert_eq!(to_input_string(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(to_input_string(&json!([1, "x"])), r#"[1,"x"]"#);
    }
}
