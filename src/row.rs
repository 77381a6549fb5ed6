//! Row model shared by the engine and the loaders.
//!
//! A row is a JSON object: field name to string, number, boolean, null or a
//! nested object for relations (`{"company": {"name": "Acme"}}`).

use serde_json::{Map, Number, Value};

pub type Row = Map<String, Value>;

/// Looks up a dotted path (`company.name`) in a row.
///
/// Every segment but the last must resolve to an object, otherwise `None`.
pub fn lookup<'a>(row: &'a Row, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = row.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Inserts `value` at a dotted path, creating intermediate objects on the way.
/// A non-object value sitting on the path is replaced.
pub fn insert_path(row: &mut Row, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            row.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = row
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Replaces relation objects whose fields are all null with a plain null,
/// so `{"company": {"name": null}}` reads the same as `{"company": null}`.
pub fn collapse_empty_relations(row: &mut Row) {
    for value in row.values_mut() {
        if let Value::Object(child) = value {
            collapse_empty_relations(child);
            if child.values().all(Value::is_null) {
                *value = Value::Null;
            }
        }
    }
}

/// String form of a value as used for matching and plain text output.
/// Null has no text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>()
            .join(", "),
        Value::Object(map) => ["name", "username", "title"]
            .iter()
            .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
            .map(value_text)
            .unwrap_or_else(|| scalar_text(map)),
    }
}

// Scalar fields of a relation without a display field, in field order.
fn scalar_text(map: &Map<String, Value>) -> String {
    map.values()
        .filter(|v| !v.is_object() && !v.is_array())
        .map(value_text)
        .filter(|s| !s.is_empty())
        .collect::<Vec<String>>()
        .join(" ")
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Best effort numeric view of a value, used for sorting.
/// Text such as `nan` or `inf` stays text.
pub fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn lookup_follows_nested_objects() {
        let r = row(json!({"company": {"name": "Acme"}, "id": 4}));
        assert_eq!(lookup(&r, "company.name"), Some(&json!("Acme")));
        assert_eq!(lookup(&r, "id"), Some(&json!(4)));
        assert_eq!(lookup(&r, "company.city"), None);
        assert_eq!(lookup(&r, "id.name"), None);
    }

    #[test]
    fn lookup_through_null_relation_is_none() {
        let r = row(json!({"company": null}));
        assert_eq!(lookup(&r, "company.name"), None);
    }

    #[test]
    fn insert_path_builds_relations() {
        let mut r = Row::new();
        insert_path(&mut r, "company.name", json!("Acme"));
        insert_path(&mut r, "company.id", json!(1));
        insert_path(&mut r, "tag", json!("x"));
        assert_eq!(Value::Object(r), json!({"company": {"name": "Acme", "id": 1}, "tag": "x"}));
    }

    #[test]
    fn empty_relations_collapse_to_null() {
        let mut r = row(json!({"company": {"name": null, "id": null}, "user": {"username": "kim"}}));
        collapse_empty_relations(&mut r);
        assert_eq!(r["company"], Value::Null);
        assert_eq!(r["user"], json!({"username": "kim"}));
    }

    #[test]
    fn text_of_values() {
        assert_eq!(value_text(&Value::Null), "");
        assert_eq!(value_text(&json!(true)), "true");
        assert_eq!(value_text(&json!(12)), "12");
        assert_eq!(value_text(&json!(2.0)), "2");
        assert_eq!(value_text(&json!(2.5)), "2.5");
        assert_eq!(value_text(&json!(["a", null, "b"])), "a, b");
        assert_eq!(value_text(&json!({"name": "Acme"})), "Acme");
        assert_eq!(
            value_text(&json!({"first_name": "Ada", "last_name": "Lovelace", "tags": ["x"]})),
            "Ada Lovelace"
        );
        assert_eq!(value_text(&json!({"name": null, "code": null})), "");
    }

    #[test]
    fn numbers_from_text() {
        assert_eq!(value_number(&json!(" 42 ")), Some(42.0));
        assert_eq!(value_number(&json!("abc")), None);
        assert_eq!(value_number(&json!(1.5)), Some(1.5));
        assert_eq!(value_number(&Value::Null), None);
        assert_eq!(value_number(&json!("nan")), None);
        assert_eq!(value_number(&json!("-Infinity")), None);
    }
}
