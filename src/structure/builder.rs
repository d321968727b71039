//! Structure builder.
//!
//! Matches a decoded [`Value`] against a [`Structure`] and produces a named,
//! typed `serde_json::Value`:
//!
//! - objects become maps keyed by property name, in schema order
//! - numeric leaves become JSON numbers (blank -> `null`)
//! - repeating groups become arrays
//! - elided properties are consumed positionally but never stored
//!
//! Any mismatch fails the whole build with [`D3Error::Schema`].

use serde_json::{Map, Number, Value as Json};

use super::schema::{Shape, Structure};
use crate::codec::Value;
use crate::error::{D3Error, Result};

/// Build `data` against `structure`.
///
/// # Example
///
/// ```
/// use d3_connector::codec::Value;
/// use d3_connector::structure::{build, Structure};
///
/// let schema = Structure::object(
///     "customer",
///     vec![Structure::scalar("name"), Structure::numeric("balance")],
/// );
/// let built = build(&Value::from(vec!["ACME", "12.5"]), &schema).unwrap();
/// assert_eq!(built, serde_json::json!({"name": "ACME", "balance": 12.5}));
/// ```
pub fn build(data: &Value, structure: &Structure) -> Result<Json> {
    Ok(build_node(data, structure)?.unwrap_or(Json::Null))
}

/// Build `data` against `structure` and wrap it as `{ structure.name: built }`.
pub fn build_with_first_level(data: &Value, structure: &Structure) -> Result<Json> {
    let mut map = Map::new();
    map.insert(structure.name().to_string(), build(data, structure)?);
    Ok(Json::Object(map))
}

/// Returns `None` when the node is elided.
fn build_node(data: &Value, structure: &Structure) -> Result<Option<Json>> {
    if !structure.is_multiple() {
        return parse(data, structure);
    }

    let group = match data {
        Value::List(items) => {
            let mut group = Vec::with_capacity(items.len());
            for item in items {
                if structure.is_object() {
                    if let Some(built) = parse(item, structure)? {
                        group.push(built);
                    }
                } else {
                    group.push(item.to_json());
                }
            }
            group
        }
        scalar if scalar.is_blank() => Vec::new(),
        scalar => parse(scalar, structure)?.into_iter().collect(),
    };

    Ok(Some(Json::Array(group)))
}

fn parse(data: &Value, structure: &Structure) -> Result<Option<Json>> {
    match structure.shape() {
        Shape::Elided => Ok(None),
        Shape::Scalar { numeric } => match data {
            Value::List(_) => Err(D3Error::Schema(format!(
                "array received where a scalar was expected for property \"{}\"",
                structure.name()
            ))),
            Value::Null => Ok(Some(Json::Null)),
            Value::Str(text) if *numeric => parse_number(text, structure).map(Some),
            Value::Str(text) => Ok(Some(Json::String(text.clone()))),
        },
        Shape::Object { properties } => match data {
            Value::List(items) => build_object(items, structure, properties).map(Some),
            scalar => {
                // A one-property object may arrive as a bare scalar: the
                // property is still checked, but the scalar is kept as is.
                build_object(std::slice::from_ref(scalar), structure, properties)?;
                Ok(Some(scalar.to_json()))
            }
        },
    }
}

fn build_object(items: &[Value], structure: &Structure, properties: &[Structure]) -> Result<Json> {
    if items.len() != properties.len() {
        return Err(D3Error::Schema(format!(
            "received {} values but structure \"{}\" expects {}",
            items.len(),
            structure.name(),
            properties.len()
        )));
    }

    let mut object = Map::new();
    for (item, property) in items.iter().zip(properties) {
        if property.is_elided() {
            continue;
        }
        if let Some(built) = build_node(item, property)? {
            object.insert(property.name().to_string(), built);
        }
    }
    Ok(Json::Object(object))
}

fn parse_number(text: &str, structure: &Structure) -> Result<Json> {
    if text.is_empty() {
        return Ok(Json::Null);
    }

    let not_numeric = || {
        D3Error::Schema(format!(
            "expected a numeric value for property \"{}\", got {:?}",
            structure.name(),
            text
        ))
    };

    let trimmed = text.trim();
    if !is_decimal(trimmed) {
        return Err(not_numeric());
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Json::Number)
        .ok_or_else(not_numeric)
}

/// `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn is_decimal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}
