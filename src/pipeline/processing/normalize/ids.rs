/// Coerces a raw identifier cell to an integer.
///
/// Accepts plain integers and integral floats such as `"862.0"`. Anything
/// else, including dates that leak into id columns, yields `None`.
pub fn coerce_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Coerces a raw numeric cell; non-numeric and non-finite values are `None`.
pub fn coerce_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer coercion for identifiers embedded in parsed list items.
pub fn json_id(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|v| v.is_finite() && v.fract() == 0.0)
                .map(|v| v as i64)
        }),
        serde_json::Value::String(s) => coerce_id(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_id_accepts_integral_forms() {
        assert_eq!(coerce_id("862"), Some(862));
        assert_eq!(coerce_id(" 862.0 "), Some(862));
        assert_eq!(coerce_id("1e3"), Some(1000));
    }

    #[test]
    fn test_coerce_id_rejects_non_integral_values() {
        assert_eq!(coerce_id("1997-08-20"), None);
        assert_eq!(coerce_id("12.5"), None);
        assert_eq!(coerce_id(""), None);
        assert_eq!(coerce_id("NaN"), None);
    }

    #[test]
    fn test_coerce_f64_drops_non_finite() {
        assert_eq!(coerce_f64("30000000"), Some(30_000_000.0));
        assert_eq!(coerce_f64("inf"), None);
        assert_eq!(coerce_f64("/ff9qCepilowshEtG2GYWwzt2bs4.jpg"), None);
    }

    #[test]
    fn test_json_id_handles_numbers_and_strings() {
        assert_eq!(json_id(&json!(31)), Some(31));
        assert_eq!(json_id(&json!(31.0)), Some(31));
        assert_eq!(json_id(&json!("31")), Some(31));
        assert_eq!(json_id(&json!(null)), None);
    }
}
