//! Tolerant scalar coercion for feed payloads.
//!
//! Bookmakers send numbers as JSON numbers, numeric strings, or not at all.
//! Anything that does not parse becomes zero instead of failing the event.
//! The `de_*` functions plug into `#[serde(deserialize_with)]`; a field that
//! is absent or `null` stays `None` so partial updates leave it untouched.
//! [`fold_keys`] collapses the several spellings a field arrives under onto
//! one key before any of that runs.

use casino_feed_core::BookmakerId;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::str::FromStr;

pub fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => Decimal::ZERO,
    }
}

/// Non-negative integer; fractions are truncated.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn count(value: &Value) -> u32 {
    let n = number(value);
    if n <= 0.0 {
        return 0;
    }
    n.min(f64::from(u32::MAX)) as u32
}

/// String or number rendered as an identifier. Blank strings count as missing.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn bookmaker(value: &Value) -> Option<BookmakerId> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).map(BookmakerId),
        Value::String(s) => s.trim().parse::<u32>().ok().map(BookmakerId),
        _ => None,
    }
}

/// RFC 3339 strings or epoch milliseconds.
pub fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| s.trim().parse::<i64>().ok().and_then(from_millis)),
        Value::Number(n) => n.as_i64().and_then(from_millis),
        _ => None,
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

fn parse_decimal(s: &str) -> Decimal {
    // ".48" -> "0.48"
    let normalized = if s.starts_with('.') {
        format!("0{s}")
    } else {
        s.to_string()
    };
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .unwrap_or(Decimal::ZERO)
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.filter(|v| !v.is_null()))
}

pub fn de_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(present(deserializer)?.as_ref().map(number))
}

pub fn de_opt_decimal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error> {
    Ok(present(deserializer)?.as_ref().map(decimal))
}

pub fn de_opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(present(deserializer)?.as_ref().map(count))
}

pub fn de_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(present(deserializer)?.as_ref().and_then(text))
}

pub fn de_opt_bookmaker<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BookmakerId>, D::Error> {
    Ok(present(deserializer)?.as_ref().and_then(bookmaker))
}

pub fn de_opt_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(present(deserializer)?.as_ref().and_then(timestamp))
}

/// Missing or unparsable numbers become 0.
pub fn de_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(de_opt_f64(deserializer)?.unwrap_or(0.0))
}

/// A canonical key and the other spellings the same field is sent under.
pub type Spellings = (&'static str, &'static [&'static str]);

/// Rewrites an object so each field of `keys` appears once, under its
/// canonical key.
///
/// The first non-null value among the canonical key and its spellings, in
/// that order, is kept and every other spelling is removed. Non-objects and
/// objects using no alternative spelling are returned as they are.
pub fn fold_keys<'a>(value: &'a Value, keys: &[Spellings]) -> Cow<'a, Value> {
    let Value::Object(map) = value else {
        return Cow::Borrowed(value);
    };
    let uses_alternative = keys
        .iter()
        .any(|(_, others)| others.iter().any(|key| map.contains_key(*key)));
    if !uses_alternative {
        return Cow::Borrowed(value);
    }

    let mut folded: Map<String, Value> = map.clone();
    for (key, others) in keys {
        let spellings = || std::iter::once(*key).chain(others.iter().copied());
        let kept = spellings().find_map(|k| folded.get(k).filter(|v| !v.is_null()).cloned());
        for spelling in spellings() {
            folded.remove(spelling);
        }
        if let Some(kept) = kept {
            folded.insert((*key).to_string(), kept);
        }
    }
    Cow::Owned(Value::Object(folded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_number_coercion() {
        assert_eq!(number(&json!(2.5)), 2.5);
        assert_eq!(number(&json!("3.75")), 3.75);
        assert_eq!(number(&json!(" 7 ")), 7.0);
        assert_eq!(number(&json!("abc")), 0.0);
        assert_eq!(number(&json!(null)), 0.0);
        assert_eq!(number(&json!({"x": 1})), 0.0);
    }

    #[test]
    fn test_decimal_coercion() {
        assert_eq!(decimal(&json!("1520.75")), dec!(1520.75));
        assert_eq!(decimal(&json!(300)), dec!(300));
        assert_eq!(decimal(&json!(".48")), dec!(0.48));
        assert_eq!(decimal(&json!("n/a")), Decimal::ZERO);
    }

    #[test]
    fn test_count_truncates_and_clamps() {
        assert_eq!(count(&json!(12)), 12);
        assert_eq!(count(&json!("40")), 40);
        assert_eq!(count(&json!(3.9)), 3);
        assert_eq!(count(&json!(-5)), 0);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(text(&json!("r-1")), Some("r-1".to_string()));
        assert_eq!(text(&json!(991)), Some("991".to_string()));
        assert_eq!(text(&json!("  ")), None);
        assert_eq!(bookmaker(&json!("7")), Some(BookmakerId(7)));
        assert_eq!(bookmaker(&json!(7)), Some(BookmakerId(7)));
        assert_eq!(bookmaker(&json!(-1)), None);
    }

    #[test]
    fn test_timestamps() {
        let parsed = timestamp(&json!("2024-05-01T10:00:00Z")).unwrap();
        assert_eq!(parsed.timestamp(), 1_714_557_600);
        let millis = timestamp(&json!(1_714_557_600_000_i64)).unwrap();
        assert_eq!(millis, parsed);
        assert!(timestamp(&json!("yesterday")).is_none());
    }

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "de_opt_f64")]
        present: Option<f64>,
        #[serde(default, deserialize_with = "de_opt_f64")]
        missing: Option<f64>,
        #[serde(default, deserialize_with = "de_opt_f64")]
        null: Option<f64>,
    }

    #[test]
    fn test_optional_fields_distinguish_absent_from_garbage() {
        let sample: Sample =
            serde_json::from_value(json!({"present": "oops", "null": null})).unwrap();
        assert_eq!(sample.present, Some(0.0));
        assert_eq!(sample.missing, None);
        assert_eq!(sample.null, None);
    }

    const ROUND_KEYS: &[Spellings] = &[
        ("round_id", &["roundId", "game_id"]),
        ("max_multiplier", &["maxMultiplier"]),
    ];

    #[test]
    fn test_fold_keys_keeps_first_present_spelling() {
        let payload =
            json!({"game_id": "g-2", "roundId": "g-1", "maxMultiplier": 2.5, "other": 1});
        let folded = fold_keys(&payload, ROUND_KEYS);
        assert_eq!(*folded, json!({"round_id": "g-1", "max_multiplier": 2.5, "other": 1}));
    }

    #[test]
    fn test_fold_keys_with_both_casings_present() {
        let payload =
            json!({"round_id": "a", "roundId": "b", "max_multiplier": null, "maxMultiplier": 3});
        let folded = fold_keys(&payload, ROUND_KEYS);
        assert_eq!(*folded, json!({"round_id": "a", "max_multiplier": 3}));
    }

    #[test]
    fn test_fold_keys_borrows_when_nothing_to_fold() {
        let payload = json!({"round_id": "a"});
        assert!(matches!(fold_keys(&payload, ROUND_KEYS), Cow::Borrowed(_)));
        let bare = json!(1.5);
        assert!(matches!(fold_keys(&bare, ROUND_KEYS), Cow::Borrowed(_)));
    }
}
