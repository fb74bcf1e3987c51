//! Decoding of language-model replies into typed results.

use chrono::NaiveDate;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use pantry_core::{MealSuggestion, ReceiptData, ReceiptItem, SuggestedIngredient};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response did not contain a JSON payload")]
    NoPayload,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

fn invalid(message: impl Into<String>) -> DecodeError {
    DecodeError::Invalid(message.into())
}

fn fenced_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim());
        }
    }

    let start = text.find("```")?;
    let rest = &text[start + 3..];
    let body = &rest[rest.find('\n')? + 1..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn delimited(text: &str, open: char, close: char) -> Option<&str> {
    let first = text.find(open)?;
    let last = text.rfind(close)?;
    (first < last).then(|| &text[first..=last])
}

/// Candidate JSON slices of a reply, most specific first: a fenced block,
/// then an object, then an array. Brackets in prose around an object do not
/// win over the object.
fn json_candidates(text: &str) -> impl Iterator<Item = &str> {
    let trimmed = text.trim();
    fenced_block(trimmed)
        .into_iter()
        .chain(delimited(trimmed, '{', '}'))
        .chain(delimited(trimmed, '[', ']'))
}

/// Pull the JSON document out of a model reply.
///
/// Handles fenced code blocks and prose around a bare object or array.
/// Returns the first candidate slice that is valid JSON.
pub fn extract_json_payload(text: &str) -> Option<&str> {
    json_candidates(text).find(|candidate| serde_json::from_str::<IgnoredAny>(candidate).is_ok())
}

fn payload_value(text: &str) -> Result<Value, DecodeError> {
    let mut failure = None;
    for candidate in json_candidates(text) {
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(err) => {
                failure.get_or_insert(err);
            }
        }
    }
    Err(failure.map_or(DecodeError::NoPayload, DecodeError::Json))
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WireReceipt {
    #[serde(default)]
    store_name: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    total_amount: Option<Value>,
    #[serde(default)]
    items: Option<Vec<WireItem>>,
}

#[derive(Deserialize)]
struct WireItem {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    unit_price: Option<Value>,
    #[serde(default)]
    total_price: Option<Value>,
    #[serde(default)]
    category: Option<String>,
}

/// Resolve thousands and decimal separators in a digits-only amount.
///
/// With both `,` and `.` present the right-most one is the decimal point. A
/// lone `,` is decimal only when it is the last separator followed by one or
/// two digits ("4,99"); otherwise it groups thousands ("1,299").
fn normalize_separators(cleaned: &str) -> String {
    match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = cleaned.len() - comma - 1;
            if cleaned.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned.to_string(),
    }
}

/// Read an amount given as a number or as text like "$4.99", "4,99" or "$1,299.00".
fn amount(value: Option<&Value>, field: &str) -> Result<Option<f64>, DecodeError> {
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            normalize_separators(&cleaned).parse::<f64>().ok()
        }
        Some(_) => None,
    };
    match number {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
        Some(n) => Err(invalid(format!("{field} must be a non-negative number, got {n}"))),
        None => Err(invalid(format!("{field} is not a number"))),
    }
}

fn item(index: usize, wire: WireItem) -> Result<ReceiptItem, DecodeError> {
    let name = wire
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid(format!("items[{index}].name is missing")))?;

    let quantity = amount(wire.quantity.as_ref(), &format!("items[{index}].quantity"))?
        .unwrap_or(1.0);
    let unit = amount(wire.unit_price.as_ref(), &format!("items[{index}].unit_price"))?;
    let total = amount(wire.total_price.as_ref(), &format!("items[{index}].total_price"))?;

    let (unit_price, total_price) = match (unit, total) {
        (Some(unit), Some(total)) => (unit, total),
        (Some(unit), None) => (unit, unit * quantity),
        (None, Some(total)) if quantity > 0.0 => (total / quantity, total),
        _ => {
            return Err(invalid(format!(
                "items[{index}] needs unit_price or total_price"
            )))
        }
    };

    Ok(ReceiptItem {
        name,
        quantity,
        unit_price,
        total_price,
        category: wire.category.filter(|c| !c.trim().is_empty()),
    })
}

/// Decode and validate a receipt reply.
///
/// Dates must be ISO `YYYY-MM-DD`; amounts must be non-negative.
pub fn decode_receipt(text: &str) -> Result<ReceiptData, DecodeError> {
    let value = payload_value(text)?;
    if !value.is_object() {
        return Err(invalid("expected a JSON object at the top level"));
    }
    let wire: WireReceipt = serde_json::from_value(value)?;

    let date = match wire.date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| invalid(format!("date must be YYYY-MM-DD, got {raw:?}")))?,
        ),
    };

    let items = wire
        .items
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, wire)| item(index, wire))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReceiptData {
        store_name: wire.store_name.filter(|s| !s.trim().is_empty()),
        date,
        total_amount: amount(wire.total_amount.as_ref(), "total_amount")?,
        items,
    })
}

// ---------------------------------------------------------------------------
// Meal suggestions
// ---------------------------------------------------------------------------

const LIST_KEYS: &[&str] = &["meals", "meal_suggestions", "suggestions", "recipes"];

fn first_str(object: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(steps) => {
            let lines: Vec<&str> = steps.iter().filter_map(Value::as_str).collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => None,
    })
}

fn ingredient(value: &Value, available: &[String]) -> Option<SuggestedIngredient> {
    let on_hand = |name: &str| available.iter().any(|a| a.eq_ignore_ascii_case(name));
    match value {
        Value::String(name) => Some(SuggestedIngredient {
            available: on_hand(name),
            name: name.clone(),
        }),
        Value::Object(object) => {
            let name = first_str(object, &["name", "ingredient"])?;
            let available = object
                .get("available")
                .and_then(Value::as_bool)
                .unwrap_or_else(|| on_hand(&name));
            Some(SuggestedIngredient { name, available })
        }
        _ => None,
    }
}

fn meal(value: &Value, available: &[String]) -> Option<MealSuggestion> {
    let object = value.as_object()?;
    let name = first_str(object, &["name", "recipe_name", "recipe", "title"])?;
    let ingredients = object
        .get("ingredients")
        .or_else(|| object.get("ingredients_needed"))
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(|i| ingredient(i, available)).collect())
        .unwrap_or_default();

    Some(MealSuggestion {
        name,
        ingredients,
        prep_time: first_str(object, &["prep_time", "preparation_time"]),
        difficulty: first_str(object, &["difficulty", "difficulty_level"]),
        instructions: first_str(object, &["instructions", "brief_instructions"]),
    })
}

/// Best-effort decode of a meal-suggestion reply.
///
/// Returns `None` when nothing usable is found. Ingredients given as plain
/// strings are marked available when they appear in `available`.
pub fn decode_meals(text: &str, available: &[String]) -> Option<Vec<MealSuggestion>> {
    let value = payload_value(text).ok()?;
    let list = match &value {
        Value::Array(list) => list.as_slice(),
        Value::Object(object) => LIST_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(std::slice::from_ref(&value)),
        _ => return None,
    };

    let meals: Vec<MealSuggestion> = list.iter().filter_map(|m| meal(m, available)).collect();
    (!meals.is_empty()).then_some(meals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_from_fenced_block() {
        let text = "Here you go:\n```json\n{\"store_name\": \"Aldi\"}\n```\nEnjoy";
        assert_eq!(extract_json_payload(text), Some("{\"store_name\": \"Aldi\"}"));
    }

    #[test]
    fn payload_from_bare_fence_and_prose() {
        assert_eq!(extract_json_payload("```\n[1, 2]\n```"), Some("[1, 2]"));
        assert_eq!(extract_json_payload("Sure! {\"a\": 1} hope that helps"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_payload("no json here"), None);
    }

    #[test]
    fn object_wins_over_brackets_in_prose() {
        let text = r#"[note] Here is the receipt: {"store_name":"Aldi","items":[]}"#;
        assert_eq!(
            extract_json_payload(text),
            Some(r#"{"store_name":"Aldi","items":[]}"#)
        );
        let receipt = decode_receipt(text).unwrap();
        assert_eq!(receipt.store_name.as_deref(), Some("Aldi"));
        assert!(receipt.items.is_empty());
    }

    #[test]
    fn bare_array_of_objects_is_found() {
        let text = r#"Ideas: [{"name":"Soup"},{"name":"Salad"}] enjoy"#;
        assert_eq!(
            extract_json_payload(text),
            Some(r#"[{"name":"Soup"},{"name":"Salad"}]"#)
        );
        assert_eq!(decode_meals(text, &[]).unwrap().len(), 2);
    }

    #[test]
    fn grouped_and_decimal_separators() {
        let cases = [
            ("$1,299", 1299.0),
            ("1,299.00", 1299.0),
            ("1.299,00", 1299.0),
            ("4,99", 4.99),
            ("$1,234,567.89", 1_234_567.89),
            ("12.5", 12.5),
        ];
        for (raw, expected) in cases {
            let value = Value::String(raw.to_string());
            assert_eq!(amount(Some(&value), "total_amount").unwrap(), Some(expected), "{raw}");
        }
    }

    #[test]
    fn thousands_total_decodes_in_full() {
        let receipt = decode_receipt(
            r#"{"total_amount":"$1,299.00","items":[{"name":"Laptop","total_price":"$1,299"}]}"#,
        )
        .unwrap();
        assert_eq!(receipt.total_amount, Some(1299.0));
        assert_eq!(receipt.items[0].unit_price, 1299.0);
    }

    #[test]
    fn decodes_a_clean_receipt() {
        let receipt = decode_receipt(
            r#"{"store_name":"Corner Market","date":"2024-03-09","total_amount":12.5,
                "items":[{"name":"Eggs","quantity":1,"unit_price":4.5,"total_price":4.5}]}"#,
        )
        .unwrap();
        assert_eq!(receipt.store_name.as_deref(), Some("Corner Market"));
        assert_eq!(receipt.date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(receipt.total_amount, Some(12.5));
        assert_eq!(receipt.items[0].name, "Eggs");
    }

    #[test]
    fn accepts_priced_strings_and_fills_missing_prices() {
        let receipt = decode_receipt(
            r#"{"total_amount":"$7.00","items":[
                {"name":"Milk","quantity":2,"unit_price":"$1.50"},
                {"name":"Bread","total_price":"4,00"}]}"#,
        )
        .unwrap();
        assert_eq!(receipt.total_amount, Some(7.0));
        assert_eq!(receipt.items[0].total_price, 3.0);
        assert_eq!(receipt.items[1].quantity, 1.0);
        assert_eq!(receipt.items[1].unit_price, 4.0);
    }

    #[test]
    fn rejects_bad_dates_and_negative_amounts() {
        let err = decode_receipt(r#"{"date":"03/09/2024"}"#).unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));

        let err = decode_receipt(r#"{"total_amount":-3}"#).unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn rejects_non_objects_and_prose() {
        assert!(matches!(decode_receipt("I could not read it"), Err(DecodeError::NoPayload)));
        assert!(decode_receipt("[1,2,3]").is_err());
        assert!(decode_receipt(r#"{"items":[{"quantity":1}]}"#).is_err());
    }

    #[test]
    fn decodes_meals_with_wire_aliases() {
        let available = vec!["eggs".to_string(), "spinach".to_string()];
        let meals = decode_meals(
            r#"{"meals":[{"recipe_name":"Omelette","ingredients":["Eggs","butter"],
                "preparation_time":10,"difficulty":"easy","instructions":["Whisk","Cook"]}]}"#,
            &available,
        )
        .unwrap();
        assert_eq!(meals[0].name, "Omelette");
        assert!(meals[0].ingredients[0].available);
        assert!(!meals[0].ingredients[1].available);
        assert_eq!(meals[0].prep_time.as_deref(), Some("10"));
        assert_eq!(meals[0].instructions.as_deref(), Some("Whisk\nCook"));
    }

    #[test]
    fn meals_decode_is_optional() {
        assert!(decode_meals("Try an omelette!", &[]).is_none());
        assert!(decode_meals("[]", &[]).is_none());
    }
}
