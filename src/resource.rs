//! The attribute tree: a string-keyed map of [`Value`]s with collision-free keys.
//!
//! Sibling keys are unique and may not differ only by case ("x" and "X" can not live in
//! the same map). Every operation that may create a key checks that. The `ensure_*`
//! helpers replace a value of the wrong shape under an existing key.
//!
//! Keys keep insertion order, so an encoded record lists its attributes in field order.
//! Equality ignores order.

use crate::error::Error;
use crate::value::Value;
use indexmap::map::{self, IndexMap};

/// A SCIM resource, or a complex attribute inside one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    attributes: IndexMap<String, Value>,
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Exact (case-sensitive) lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.attributes.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Removes `key`, keeping the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.shift_remove(key)
    }

    pub fn iter(&self) -> map::Iter<'_, String, Value> {
        self.attributes.iter()
    }

    pub fn keys(&self) -> map::Keys<'_, String, Value> {
        self.attributes.keys()
    }

    /// Returns a sibling key equal to `key` under case folding but not identical to it.
    fn colliding_key(&self, key: &str) -> Option<&str> {
        self.attributes
            .keys()
            .find(|k| k.as_str() != key && k.to_lowercase() == key.to_lowercase())
            .map(String::as_str)
    }

    fn check_key(&self, key: &str) -> Result<(), Error> {
        match self.colliding_key(key) {
            Some(existing) => Err(Error::CaseCollision {
                existing: existing.to_string(),
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// True if `key` could be inserted without a duplicate or a case collision.
    pub fn accepts(&self, key: &str) -> bool {
        !self.contains_key(key) && self.colliding_key(key).is_none()
    }

    /// Stores `value` under a new `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
        let key = key.into();
        self.check_key(&key)?;
        if self.contains_key(&key) {
            return Err(Error::DuplicateKey { key });
        }
        self.attributes.insert(key, value.into());
        Ok(())
    }

    /// Stores `value` under `key`, overwriting a value already stored under the identical key.
    /// Case collisions are still rejected.
    pub fn replace(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>, Error> {
        let key = key.into();
        self.check_key(&key)?;
        Ok(self.attributes.insert(key, value.into()))
    }

    /// Returns the complex attribute at `key`, creating it (or overwriting a non-map value).
    pub fn ensure_map(&mut self, key: &str) -> Result<&mut Resource, Error> {
        self.check_key(key)?;
        let slot = self.attributes.entry(key.to_string()).or_default();
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(Resource::new());
        }
        match slot {
            Value::Map(m) => Ok(m),
            _ => unreachable!("slot holds a map"),
        }
    }

    /// Returns the simple multi-valued attribute at `key`, padded with `Null` up to `min_len`
    /// entries. A missing value, or one that is not a list of scalars, is replaced.
    pub fn ensure_list(&mut self, key: &str, min_len: usize) -> Result<&mut Vec<Value>, Error> {
        self.ensure_list_with(key, min_len, false)
    }

    /// Returns the complex multi-valued attribute at `key`, padded with empty maps up to
    /// `min_len` entries. A missing value, or one that is not a list of maps, is replaced.
    pub fn ensure_complex_list(&mut self, key: &str, min_len: usize) -> Result<&mut Vec<Value>, Error> {
        self.ensure_list_with(key, min_len, true)
    }

    fn ensure_list_with(&mut self, key: &str, min_len: usize, complex: bool) -> Result<&mut Vec<Value>, Error> {
        self.check_key(key)?;
        let placeholder = || if complex { Value::Map(Resource::new()) } else { Value::Null };
        let slot = self.attributes.entry(key.to_string()).or_default();
        let keep = match slot {
            Value::List(items) if complex => items.iter().all(|v| matches!(v, Value::Map(_))),
            Value::List(items) => items.iter().all(|v| !matches!(v, Value::Map(_))),
            _ => false,
        };
        if !keep {
            *slot = Value::List(Vec::new());
        }
        match slot {
            Value::List(items) => {
                while items.len() < min_len {
                    items.push(placeholder());
                }
                Ok(items)
            }
            _ => unreachable!("slot holds a list"),
        }
    }

    fn list_mut(&mut self, key: &str) -> Result<&mut Vec<Value>, Error> {
        self.check_key(key)?;
        match self.attributes.get_mut(key) {
            None => Err(Error::KeyNotFound { key: key.to_string() }),
            Some(Value::List(items)) => Ok(items),
            Some(_) => Err(Error::NotAList { key: key.to_string() }),
        }
    }

    fn complex_list_mut(&mut self, key: &str) -> Result<&mut Vec<Value>, Error> {
        let items = self.list_mut(key).map_err(|e| match e {
            Error::NotAList { key } => Error::NotAComplexList { key },
            other => other,
        })?;
        if items.iter().any(|v| !matches!(v, Value::Map(_))) {
            return Err(Error::NotAComplexList { key: key.to_string() });
        }
        Ok(items)
    }

    /// Adds a scalar to the simple multi-valued attribute at `key`, filling the first
    /// `Null` slot before appending. All non-null elements must share one kind.
    pub fn append_scalar(&mut self, key: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        let items = self.list_mut(key)?;
        if let Some(first) = items.iter().find(|v| !v.is_null()) {
            if first.kind() != value.kind() {
                return Err(Error::TypeMismatch {
                    field: key.to_string(),
                    found: value.kind(),
                    expected: first.kind(),
                });
            }
        }
        match items.iter_mut().find(|v| v.is_null()) {
            Some(slot) => *slot = value,
            None => items.push(value),
        }
        Ok(())
    }

    /// Merges sub-attributes into the group at `key`.
    ///
    /// Each pair goes into the first entry that does not hold that sub-key yet; a pair that
    /// fits nowhere starts a new entry of its own.
    pub fn append_group(&mut self, key: &str, sub_values: Resource) -> Result<(), Error> {
        let entries = self.complex_list_mut(key)?;
        for (sub, value) in sub_values {
            let free = entries
                .iter_mut()
                .filter_map(Value::as_map_mut)
                .find(|entry| entry.accepts(&sub));
            match free {
                Some(entry) => {
                    entry.attributes.insert(sub, value);
                }
                None => {
                    let mut entry = Resource::new();
                    entry.attributes.insert(sub, value);
                    entries.push(Value::Map(entry));
                }
            }
        }
        Ok(())
    }

    /// Adds a whole entry to the group at `key`, taking the first empty entry if there is one.
    pub fn append_entry(&mut self, key: &str, entry: Resource) -> Result<(), Error> {
        let entries = self.complex_list_mut(key)?;
        match entries
            .iter_mut()
            .find(|v| v.as_map().is_some_and(Resource::is_empty))
        {
            Some(slot) => *slot = Value::Map(entry),
            None => entries.push(Value::Map(entry)),
        }
        Ok(())
    }

    /// 1 + the deepest nesting of maps below this one, including maps inside lists.
    pub fn depth(&self) -> usize {
        1 + self.attributes.values().map(Value::depth).max().unwrap_or(0)
    }

    /// True if `key` is present. A case collision with `key` also counts as present.
    pub fn exists(&self, key: &str) -> bool {
        self.colliding_key(key).is_some() || self.contains_key(key)
    }
}

impl IntoIterator for Resource {
    type Item = (String, Value);
    type IntoIter = map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_iter()
    }
}

impl<'a> IntoIterator for &'a Resource {
    type Item = (&'a String, &'a Value);
    type IntoIter = map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

/// Unchecked construction: later pairs overwrite earlier ones and case collisions are not
/// detected. Use [`Resource::insert`] where the key invariants matter.
impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Resource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Resource {
            attributes: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Resource {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_duplicates_and_case_collisions() {
        let mut r = Resource::new();
        r.insert("x", 1).expect("insert x");
        assert_eq!(
            r.insert("x", 2),
            Err(Error::DuplicateKey { key: "x".to_string() })
        );
        assert_eq!(
            r.insert("X", 2),
            Err(Error::CaseCollision {
                existing: "x".to_string(),
                key: "X".to_string()
            })
        );
        r.insert("y", 3).expect("insert y");
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn exists_is_case_insensitive() {
        let r = Resource::from([("userName", "alice")]);
        assert!(r.exists("userName"));
        assert!(r.exists("USERNAME"));
        assert!(!r.exists("name"));
    }

    #[test]
    fn exists_reports_colliding_key() {
        let r = Resource::from([("x", 1)]);
        assert!(r.exists("X"));
        assert!(!r.accepts("X"));
        assert!(!r.accepts("x"));
        assert!(r.accepts("y"));
    }

    #[test]
    fn ensure_rejects_case_collisions() {
        let mut r = Resource::from([("Name", "alice"), ("Tags", "a")]);
        assert_eq!(
            r.ensure_map("name").map(|_| ()),
            Err(Error::CaseCollision {
                existing: "Name".to_string(),
                key: "name".to_string()
            })
        );
        assert!(matches!(
            r.ensure_list("tags", 1),
            Err(Error::CaseCollision { .. })
        ));
        assert!(matches!(
            r.ensure_complex_list("TAGS", 0),
            Err(Error::CaseCollision { .. })
        ));
        assert_eq!(r.keys().collect::<Vec<_>>(), ["Name", "Tags"]);
    }

    #[test]
    fn ensure_map_replaces_scalars() {
        let mut r = Resource::from([("name", "alice")]);
        r.ensure_map("name")
            .expect("map")
            .insert("givenName", "Alice")
            .expect("insert");
        assert_eq!(
            r.ensure_map("name").expect("map").get("givenName"),
            Some(&Value::from("Alice"))
        );
    }

    #[test]
    fn ensure_list_pads_with_nulls() {
        let mut r = Resource::new();
        assert_eq!(r.ensure_list("tags", 3).expect("list"), &vec![Value::Null; 3]);
        r.append_scalar("tags", "a").expect("append");
        assert_eq!(r.ensure_list("tags", 1).expect("list").len(), 3);
        assert_eq!(r.ensure_list("tags", 4).expect("list")[0], Value::from("a"));
    }

    #[test]
    fn ensure_complex_list_pads_with_empty_maps() {
        let mut r = Resource::from([("emails", Value::from(vec!["a"]))]);
        let entries = r.ensure_complex_list("emails", 2).expect("list");
        assert_eq!(entries, &vec![Value::Map(Resource::new()); 2]);
    }

    #[test]
    fn append_scalar_preconditions() {
        let mut r = Resource::from([("name", "alice")]);
        assert_eq!(
            r.append_scalar("tags", "a"),
            Err(Error::KeyNotFound { key: "tags".to_string() })
        );
        assert_eq!(
            r.append_scalar("name", "a"),
            Err(Error::NotAList { key: "name".to_string() })
        );
        r.ensure_list("tags", 0).expect("list");
        r.append_scalar("tags", "a").expect("first");
        assert!(matches!(
            r.append_scalar("tags", 1),
            Err(Error::TypeMismatch { found: "integer", expected: "string", .. })
        ));
    }

    #[test]
    fn append_scalar_fills_gaps_first() {
        let mut r = Resource::new();
        r.ensure_list("xs", 0).expect("list");
        r.append_scalar("xs", "a").expect("append");
        r.ensure_list("xs", 3).expect("list");
        r.append_scalar("xs", "b").expect("append");
        assert_eq!(r.get("xs"), Some(&Value::from(vec![Value::from("a"), Value::from("b"), Value::Null])));
    }

    #[test]
    fn append_group_first_fit() {
        let mut r = Resource::new();
        r.ensure_complex_list("emails", 0).expect("list");
        for v in ["a@x.com", "b@x.com"] {
            r.append_group("emails", Resource::from([("value", v)])).expect("value");
        }
        for t in ["work", "home"] {
            r.append_group("emails", Resource::from([("type", t)])).expect("type");
        }
        let entries = r.get("emails").and_then(Value::as_list).expect("list");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], Value::Map(Resource::from([("value", "a@x.com"), ("type", "work")])));
        assert_eq!(entries[1], Value::Map(Resource::from([("value", "b@x.com"), ("type", "home")])));
    }

    #[test]
    fn append_group_rejects_scalar_lists() {
        let mut r = Resource::from([("emails", Value::from(vec!["a"]))]);
        assert_eq!(
            r.append_group("emails", Resource::from([("value", "b")])),
            Err(Error::NotAComplexList { key: "emails".to_string() })
        );
    }

    #[test]
    fn append_group_needs_existing_list() {
        let mut r = Resource::new();
        assert_eq!(
            r.append_group("emails", Resource::from([("value", "a")])),
            Err(Error::KeyNotFound { key: "emails".to_string() })
        );
        assert_eq!(
            r.append_entry("emails", Resource::new()),
            Err(Error::KeyNotFound { key: "emails".to_string() })
        );
    }

    #[test]
    fn keys_keep_insertion_order() {
        let mut r = Resource::new();
        for key in ["userName", "name", "emails", "active"] {
            r.insert(key, true).expect("insert");
        }
        r.remove("name");
        assert_eq!(r.keys().collect::<Vec<_>>(), ["userName", "emails", "active"]);
    }

    #[test]
    fn append_entry_takes_empty_slot() {
        let mut r = Resource::new();
        r.ensure_complex_list("xs", 2).expect("list");
        r.append_entry("xs", Resource::from([("a", 1)])).expect("append");
        let entries = r.get("xs").and_then(Value::as_list).expect("list");
        assert_eq!(entries[0], Value::Map(Resource::from([("a", 1)])));
        assert_eq!(entries[1], Value::Map(Resource::new()));
    }

    #[test]
    fn depth() {
        assert_eq!(Resource::new().depth(), 1);
        let flat = Resource::from([("a", Value::from(1)), ("b", Value::from(vec!["x"]))]);
        assert_eq!(flat.depth(), 1);
        let nested = Resource::from([("name", Value::Map(flat.clone()))]);
        assert_eq!(nested.depth(), 2);
        let grouped = Resource::from([("emails", Value::List(vec![Value::Map(nested)]))]);
        assert_eq!(grouped.depth(), 3);
    }
}
