//! Coercion helpers shared by the per-source normalizers.
//!
//! Upstream catalogs disagree on the shape of prices (numbers vs. decimal
//! strings, sometimes with a currency symbol), ratings (`{rate, count}`
//! objects vs. bare numbers) and image fields. Each source module maps its
//! raw response onto [`pricewise_core::Product`] and leans on these helpers
//! for the fiddly parts.

use pricewise_core::{Product, Rating};
use serde_json::Value;

/// Coerces a JSON price into a non-negative finite number.
///
/// Accepts numbers and strings such as `"12.99"`, `"$1,299.00"` or
/// `" 7 "`. Returns `None` for anything else, including negative values.
#[must_use]
pub fn coerce_price(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price_str(s),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

/// Parses a price string by keeping only digits and the first decimal point.
fn parse_price_str(raw: &str) -> Option<f64> {
    let mut cleaned = String::with_capacity(raw.len());
    let mut seen_dot = false;
    for c in raw.trim().chars() {
        match c {
            '0'..='9' => cleaned.push(c),
            '.' if !seen_dot => {
                seen_dot = true;
                cleaned.push(c);
            }
            ',' | '$' | '€' | '£' | ' ' => {}
            _ => return None,
        }
    }
    if cleaned.is_empty() || cleaned == "." {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Unifies the rating shapes seen upstream into a [`Rating`].
///
/// - `{"rate": 3.9, "count": 120}` → `Rating { rate: 3.9, count: 120 }`
/// - `4.5` or `"4.5"` → `Rating { rate: 4.5, count: fallback_count }`
/// - missing / anything else → `Rating { rate: 0.0, count: 0 }`
#[must_use]
pub fn coerce_rating(value: Option<&Value>, fallback_count: u32) -> Rating {
    match value {
        Some(Value::Object(map)) => {
            let rate = map.get("rate").and_then(coerce_number).unwrap_or(0.0);
            let count = map
                .get("count")
                .and_then(coerce_number)
                .map_or(0, count_from_f64);
            Rating::new(rate, count)
        }
        Some(other) => coerce_number(other)
            .map_or_else(Rating::default, |rate| Rating::new(rate, fallback_count)),
        None => Rating::default(),
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_from_f64(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Stringifies an upstream id that may arrive as a JSON number or string.
/// Returns an empty string for anything else.
#[must_use]
pub fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Cleans an image URL that some catalogs return wrapped as a JSON-encoded
/// array string, e.g. `"[\"https://i.imgur.com/a.jpeg\"]"`.
#[must_use]
pub fn clean_image_url(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .trim_matches('"')
        .to_string()
}

/// Keeps the products matching `query` and returns at most `limit` of them,
/// preserving upstream order.
#[must_use]
pub fn select_matching(products: Vec<Product>, query: &str, limit: usize) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| p.matches_query(query))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn coerce_price_accepts_numbers() {
        assert_eq!(coerce_price(&json!(109.95)), Some(109.95));
        assert_eq!(coerce_price(&json!(7)), Some(7.0));
    }

    #[test]
    fn coerce_price_parses_decorated_strings() {
        assert_eq!(coerce_price(&json!("12.99")), Some(12.99));
        assert_eq!(coerce_price(&json!("$1,299.00")), Some(1299.0));
        assert_eq!(coerce_price(&json!(" 7 ")), Some(7.0));
    }

    #[test]
    fn coerce_price_rejects_garbage_and_negatives() {
        assert_eq!(coerce_price(&json!("free")), None);
        assert_eq!(coerce_price(&json!("-3.00")), None);
        assert_eq!(coerce_price(&json!(-3.0)), None);
        assert_eq!(coerce_price(&json!(null)), None);
        assert_eq!(coerce_price(&json!("")), None);
        assert_eq!(coerce_price(&json!("1.2.3")), None);
    }

    #[test]
    fn coerce_rating_from_object() {
        let rating = coerce_rating(Some(&json!({"rate": 3.9, "count": 120})), 0);
        assert!((rating.rate - 3.9).abs() < f64::EPSILON);
        assert_eq!(rating.count, 120);
    }

    #[test]
    fn coerce_rating_from_bare_number_uses_fallback_count() {
        let rating = coerce_rating(Some(&json!(4.56)), 7);
        assert!((rating.rate - 4.56).abs() < f64::EPSILON);
        assert_eq!(rating.count, 7);
    }

    #[test]
    fn coerce_rating_from_string_object_fields() {
        let rating = coerce_rating(Some(&json!({"rate": "4.1", "count": "33"})), 0);
        assert!((rating.rate - 4.1).abs() < f64::EPSILON);
        assert_eq!(rating.count, 33);
    }

    #[test]
    fn coerce_rating_missing_is_zero() {
        assert_eq!(coerce_rating(None, 10), Rating::default());
        assert_eq!(coerce_rating(Some(&json!([1, 2])), 10), Rating::default());
    }

    #[test]
    fn clean_image_url_unwraps_json_array_strings() {
        assert_eq!(
            clean_image_url("[\"https://i.imgur.com/QkIa5tT.jpeg\""),
            "https://i.imgur.com/QkIa5tT.jpeg"
        );
        assert_eq!(
            clean_image_url("https://i.imgur.com/QkIa5tT.jpeg"),
            "https://i.imgur.com/QkIa5tT.jpeg"
        );
    }
}
