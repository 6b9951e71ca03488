//! Case-insensitive typed lookups on a resource.
//!
//! Attribute names are case-insensitive on the wire, so these getters match `id` against
//! keys ignoring case. Callers that want a fallback instead of an error can chain
//! `.unwrap_or_default()`.

use crate::error::Error;
use crate::resource::Resource;
use crate::value::Value;

fn not_found(id: &str) -> Error {
    Error::AttributeNotFound { id: id.to_string() }
}

fn invalid(id: &str, expected: &'static str) -> Error {
    Error::InvalidAttribute {
        id: id.to_string(),
        expected,
    }
}

/// Finds the value whose key matches `id` ignoring case.
pub fn contains<'a>(id: &str, resource: &'a Resource) -> Option<&'a Value> {
    let id = id.to_lowercase();
    resource
        .iter()
        .find(|(k, _)| k.to_lowercase() == id)
        .map(|(_, v)| v)
}

pub fn get_bool(id: &str, resource: &Resource) -> Result<bool, Error> {
    contains(id, resource)
        .ok_or_else(|| not_found(id))?
        .as_bool()
        .ok_or_else(|| invalid(id, "bool"))
}

/// Reads a float. Integers are accepted and widened.
pub fn get_float(id: &str, resource: &Resource) -> Result<f64, Error> {
    contains(id, resource)
        .ok_or_else(|| not_found(id))?
        .as_f64()
        .ok_or_else(|| invalid(id, "float"))
}

/// Reads a float and converts it to an integer; fails if it has a fractional part.
pub fn get_float_as_int(id: &str, resource: &Resource) -> Result<i64, Error> {
    let f = get_float(id, resource)?;
    if f.fract() != 0.0 || !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(invalid(id, "integer"));
    }
    Ok(f as i64)
}

pub fn get_map<'a>(id: &str, resource: &'a Resource) -> Result<&'a Resource, Error> {
    contains(id, resource)
        .ok_or_else(|| not_found(id))?
        .as_map()
        .ok_or_else(|| invalid(id, "map"))
}

pub fn get_string<'a>(id: &str, resource: &'a Resource) -> Result<&'a str, Error> {
    contains(id, resource)
        .ok_or_else(|| not_found(id))?
        .as_str()
        .ok_or_else(|| invalid(id, "string"))
}

/// Reads the string `sub_id` inside the complex attribute `map_id`.
pub fn get_string_in_sub_map<'a>(
    map_id: &str,
    sub_id: &str,
    resource: &'a Resource,
) -> Result<&'a str, Error> {
    get_string(sub_id, get_map(map_id, resource)?)
}
