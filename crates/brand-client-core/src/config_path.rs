//! Dotted-path reads and copy-on-write updates over a brand config document.
//!
//! Config writes replace the whole `config` field on the server, so every
//! edit goes through [`set`] or [`remove`] on the current document and the
//! full result is submitted.

use serde_json::{Map, Value};

fn segments(path: &str) -> std::str::Split<'_, char> {
    path.split('.')
}

/// Value at `path`, or `None` once a key is missing or an intermediate value
/// is not an object.
#[must_use]
pub fn get<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut keys = segments(path);
    let first = keys.next()?;
    let mut current = document.get(first)?;
    for key in keys {
        current = match current {
            Value::Object(map) => map.get(key)?,
            _ => return None,
        };
    }
    Some(current)
}

/// String value at `path`.
#[must_use]
pub fn get_str<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a str> {
    get(document, path).and_then(Value::as_str)
}

/// Text form of a scalar at `path`: strings as-is, numbers and booleans
/// printed. Null, arrays and objects read as absent.
#[must_use]
pub fn get_display(document: &Map<String, Value>, path: &str) -> Option<String> {
    match get(document, path)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// A copy of `document` with the leaf at `path` set to `value`. Missing or
/// non-object intermediates become empty objects; siblings at every level
/// are kept.
#[must_use]
pub fn set(document: &Map<String, Value>, path: &str, value: Value) -> Map<String, Value> {
    let keys = segments(path).collect::<Vec<_>>();
    set_in(document, &keys, value)
}

fn set_in(document: &Map<String, Value>, keys: &[&str], value: Value) -> Map<String, Value> {
    let mut next = document.clone();
    match keys {
        [] => {}
        [leaf] => {
            next.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let empty = Map::new();
            let child = match document.get(*head) {
                Some(Value::Object(map)) => map,
                _ => &empty,
            };
            next.insert((*head).to_string(), Value::Object(set_in(child, rest, value)));
        }
    }
    next
}

/// A copy of `document` without the leaf at `path`. Unreachable paths leave
/// the copy unchanged.
#[must_use]
pub fn remove(document: &Map<String, Value>, path: &str) -> Map<String, Value> {
    let keys = segments(path).collect::<Vec<_>>();
    remove_in(document, &keys)
}

fn remove_in(document: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    let mut next = document.clone();
    match keys {
        [] => {}
        [leaf] => {
            next.remove(*leaf);
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(child)) = document.get(*head) {
                next.insert((*head).to_string(), Value::Object(remove_in(child, rest)));
            }
        }
    }
    next
}
