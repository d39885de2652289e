//! 외부 소스 숫자 값 정규화.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

/// f64를 Decimal로 변환 후 소수점 4자리로 반올림.
///
/// NUMERIC(18, 4) 컬럼에 맞춥니다. NaN/무한대는 None.
pub fn round_decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(|d| d.round_dp(4))
}

/// 반올림된 i64 변환. 범위를 벗어나거나 유한하지 않으면 None.
pub fn round_i64_from_f64(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

/// 재무제표 표기 문자열 파싱.
///
/// 천 단위 쉼표를 제거하고 `(1,234)`처럼 괄호로 감싼 값은 음수로 읽습니다.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    let negative = s.len() >= 2 && s.starts_with('(') && s.ends_with(')');
    if negative {
        s = &s[1..s.len() - 1];
    }
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// JSON 값에서 f64 추출 (숫자 또는 숫자 문자열).
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn value_as_decimal(value: &Value) -> Option<Decimal> {
    value_as_f64(value).and_then(round_decimal_from_f64)
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(round_i64_from_f64)),
        _ => value_as_f64(value).and_then(round_i64_from_f64),
    }
}

pub fn value_as_i32(value: &Value) -> Option<i32> {
    value_as_i64(value).and_then(|v| i32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number("(1,234.5)"), Some(-1234.5));
        assert_eq!(parse_number("  42 "), Some(42.0));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_round_decimal() {
        assert_eq!(round_decimal_from_f64(1.234567), Some(dec!(1.2346)));
        assert_eq!(round_decimal_from_f64(f64::NAN), None);
        assert_eq!(round_decimal_from_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(value_as_i64(&json!(164000)), Some(164000));
        assert_eq!(value_as_i64(&json!(2.6)), Some(3));
        assert_eq!(value_as_i64(&json!("(1,000)")), Some(-1000));
        assert_eq!(value_as_i32(&json!(10_000_000_000i64)), None);
        assert_eq!(value_as_decimal(&json!(28.123456)), Some(dec!(28.1235)));
        assert_eq!(value_as_f64(&json!(null)), None);
        assert_eq!(value_as_f64(&json!({"raw": 1})), None);
    }
}
