//! Typed values to attribute trees.
//!
//! Every encodable type describes itself as a [`Node`]: nil, a scalar, a sequence, a
//! string-keyed map, a record (a struct with mapped fields, usually derived) or a custom
//! value that marshals itself. The encoder walks records field by field and places each
//! value according to the field's [`FieldSpec`].

use crate::error::Error;
use crate::resource::Resource;
use crate::tag::{self, FieldSpec, Index, SubAttribute};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// A type that can describe itself to the encoder.
pub trait Encode {
    fn node(&self) -> Node<'_>;

    /// Zero values are left out unless the field allows them. `Option` is zero only when
    /// `None`, so `Some(0)` and `Some(false)` are always kept.
    fn is_zero(&self) -> bool {
        self.node().is_zero()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A struct whose fields map onto a resource. Implemented by `#[derive(Encode)]`.
pub trait Record {
    fn fields(&self) -> Result<Vec<Field<'_>>, Error>;
}

/// Encode-self capability: the encoder hands the whole value over and does not look inside.
pub trait Marshal {
    fn marshal_scim(&self) -> Result<Resource, Error>;
}

/// One field of a record, with its mapping.
pub struct Field<'a> {
    pub spec: &'a FieldSpec,
    pub value: &'a dyn Encode,
}

impl<'a> Field<'a> {
    pub fn new(spec: &'a FieldSpec, value: &'a dyn Encode) -> Self {
        Field { spec, value }
    }
}

/// How a value looks to the encoder.
pub enum Node<'a> {
    Nil,
    /// Bool, integer, float or string.
    Scalar(Value),
    Seq(Vec<&'a dyn Encode>),
    Map(Vec<(&'a dyn Encode, &'a dyn Encode)>),
    Record(&'a dyn Record),
    Custom(&'a dyn Marshal),
}

impl Node<'_> {
    pub fn is_zero(&self) -> bool {
        match self {
            Node::Nil => true,
            Node::Scalar(v) => match v {
                Value::Bool(b) => !b,
                Value::Int(x) => *x == 0,
                Value::Float(x) => *x == 0.0,
                Value::String(s) => s.is_empty(),
                _ => v.is_null(),
            },
            Node::Seq(items) => items.is_empty(),
            Node::Map(entries) => entries.is_empty(),
            Node::Record(r) => r
                .fields()
                .map(|fields| fields.iter().all(|f| f.value.is_zero()))
                .unwrap_or(false),
            Node::Custom(_) => false,
        }
    }
}

/// Encodes a record, a string-keyed map or a custom value into a resource.
pub fn marshal<T: Encode>(value: &T) -> Result<Resource, Error> {
    let value: &dyn Encode = value;
    match value.node() {
        Node::Custom(m) => m.marshal_scim(),
        Node::Record(r) => encode_record(r),
        Node::Map(entries) => encode_map(&entries),
        Node::Nil => Err(Error::NilReference {
            type_name: value.type_name(),
        }),
        Node::Scalar(_) | Node::Seq(_) => Err(Error::UnsupportedType {
            type_name: value.type_name(),
        }),
    }
}

fn map_key(key: &dyn Encode) -> Result<String, Error> {
    match key.node() {
        Node::Scalar(Value::String(s)) => Ok(s),
        _ => Err(Error::InvalidMapKey {
            key_type: key.type_name(),
        }),
    }
}

/// Top-level maps are copied as they are; only nested maps go through the encoder again.
fn encode_map(entries: &[(&dyn Encode, &dyn Encode)]) -> Result<Resource, Error> {
    let mut resource = Resource::new();
    for (k, v) in entries {
        resource.insert(map_key(*k)?, to_value(*v)?)?;
    }
    Ok(resource)
}

fn to_value(value: &dyn Encode) -> Result<Value, Error> {
    Ok(match value.node() {
        Node::Nil => Value::Null,
        Node::Scalar(v) => v,
        Node::Seq(items) => Value::List(
            items
                .into_iter()
                .map(to_value)
                .collect::<Result<_, _>>()?,
        ),
        Node::Map(entries) => Value::Map(encode_map(&entries)?),
        Node::Record(r) => Value::Map(encode_record(r)?),
        Node::Custom(m) => Value::Map(m.marshal_scim()?),
    })
}

fn encode_record(record: &dyn Record) -> Result<Resource, Error> {
    let mut resource = Resource::new();
    for field in record.fields()? {
        let spec = field.spec;
        if spec.ignore {
            tracing::trace!(attribute = %spec.name, "skipping ignored field");
            continue;
        }
        if !spec.allow_zero && field.value.is_zero() {
            tracing::trace!(attribute = %spec.name, "skipping zero field");
            continue;
        }
        tracing::trace!(attribute = %spec.name, shape = ?spec.shape(), "encoding field");
        match (&spec.sub, spec.multi_valued) {
            (None, false) => encode_simple(&mut resource, &spec.name, field.value)?,
            (None, true) => encode_multi(&mut resource, &spec.name, &spec.indexes, field.value)?,
            (Some(sub), false) => encode_complex(&mut resource, &spec.name, sub, field.value)?,
            (Some(sub), true) => {
                encode_complex_multi(&mut resource, &spec.name, &spec.indexes, sub, field.value)?
            }
        }
    }
    Ok(resource)
}

fn encode_simple(target: &mut Resource, name: &str, value: &dyn Encode) -> Result<(), Error> {
    let value = simple_value(name, value)?;
    target.insert(name, value)
}

/// Value of a single-valued attribute: a scalar, or a record/map flattened one level deep.
fn simple_value(name: &str, value: &dyn Encode) -> Result<Value, Error> {
    match value.node() {
        Node::Nil => Ok(Value::Null),
        Node::Scalar(v) => Ok(v),
        Node::Seq(_) => Err(Error::InvalidSimpleAttribute {
            name: name.to_string(),
        }),
        Node::Custom(m) => Ok(Value::Map(m.marshal_scim()?)),
        Node::Record(r) => nested(name, encode_record(r)?),
        Node::Map(entries) => {
            let mut sub = Resource::new();
            for (k, v) in entries {
                encode_simple(&mut sub, &map_key(k)?, v)?;
            }
            nested(name, sub)
        }
    }
}

fn nested(name: &str, sub: Resource) -> Result<Value, Error> {
    let depth = sub.depth();
    if depth > 1 {
        return Err(Error::DepthExceeded {
            name: name.to_string(),
            depth,
        });
    }
    Ok(Value::Map(sub))
}

fn elements(value: &dyn Encode) -> Vec<&dyn Encode> {
    match value.node() {
        Node::Seq(items) => items,
        _ => vec![value],
    }
}

fn is_placeholder(v: &Value) -> bool {
    v.is_null() || v.as_map().is_some_and(Resource::is_empty)
}

/// A multi-valued attribute holds one kind of element; reject the first one that differs.
fn check_kind(target: &Resource, name: &str, value: &Value) -> Result<(), Error> {
    let first = target
        .get(name)
        .and_then(Value::as_list)
        .and_then(|items| items.iter().find(|v| !is_placeholder(v)));
    match first {
        Some(first) if first.kind() != value.kind() => Err(Error::TypeMismatch {
            field: name.to_string(),
            found: value.kind(),
            expected: first.kind(),
        }),
        _ => Ok(()),
    }
}

fn encode_multi(
    target: &mut Resource,
    name: &str,
    indexes: &[Index],
    value: &dyn Encode,
) -> Result<(), Error> {
    let slots = tag::slots(indexes).unwrap_or_default();
    for (i, element) in elements(value).into_iter().enumerate() {
        let v = simple_value(name, element)?;
        if v.is_null() {
            continue;
        }
        check_kind(target, name, &v)?;
        let slot = slots.get(i).copied();
        let min_len = slot.map_or(0, |s| s + 1);
        let items = match v {
            Value::Map(_) => target.ensure_complex_list(name, min_len)?,
            _ => target.ensure_list(name, min_len)?,
        };
        match (slot, v) {
            (Some(s), v) => items[s] = v,
            (None, Value::Map(entry)) => target.append_entry(name, entry)?,
            (None, v) => target.append_scalar(name, v)?,
        }
    }
    Ok(())
}

fn encode_complex(
    target: &mut Resource,
    name: &str,
    sub: &SubAttribute,
    value: &dyn Encode,
) -> Result<(), Error> {
    let group = target.ensure_map(name)?;
    if group.contains_key(&sub.name) {
        return Err(Error::DuplicateSubName {
            name: name.to_string(),
            sub: sub.name.clone(),
        });
    }
    // `_mV` only turns sequences into lists; single values stay as they are.
    match value.node() {
        Node::Seq(_) if sub.multi_valued => encode_multi(group, &sub.name, &sub.indexes, value),
        _ => encode_simple(group, &sub.name, value),
    }
}

fn encode_complex_multi(
    target: &mut Resource,
    name: &str,
    indexes: &[Index],
    sub: &SubAttribute,
    value: &dyn Encode,
) -> Result<(), Error> {
    let slots = tag::slots(indexes).unwrap_or_default();
    for (i, element) in elements(value).into_iter().enumerate() {
        let v = if sub.multi_valued {
            let mut scratch = Resource::new();
            encode_multi(&mut scratch, &sub.name, &sub.indexes, element)?;
            match scratch.remove(&sub.name) {
                Some(v) => v,
                None => continue,
            }
        } else {
            simple_value(&sub.name, element)?
        };
        if v.is_null() {
            continue;
        }
        check_kind(target, name, &Value::Map(Resource::new()))?;
        match slots.get(i).copied() {
            Some(s) => {
                let entries = target.ensure_complex_list(name, s + 1)?;
                if let Some(entry) = entries[s].as_map_mut() {
                    entry.replace(sub.name.clone(), v)?;
                }
            }
            None => {
                target.ensure_complex_list(name, 0)?;
                target.append_group(name, Resource::from([(sub.name.clone(), v)]))?;
            }
        }
    }
    Ok(())
}

impl Encode for bool {
    fn node(&self) -> Node<'_> {
        Node::Scalar(Value::Bool(*self))
    }
}

macro_rules! encode_int {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            fn node(&self) -> Node<'_> {
                Node::Scalar(Value::Int(i64::from(*self)))
            }
        }
    )*};
}

encode_int!(i8, i16, i32, i64, u8, u16, u32);

impl Encode for f32 {
    fn node(&self) -> Node<'_> {
        Node::Scalar(Value::Float(f64::from(*self)))
    }
}

impl Encode for f64 {
    fn node(&self) -> Node<'_> {
        Node::Scalar(Value::Float(*self))
    }
}

impl Encode for str {
    fn node(&self) -> Node<'_> {
        Node::Scalar(Value::String(self.to_string()))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Encode for String {
    fn node(&self) -> Node<'_> {
        self.as_str().node()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn node(&self) -> Node<'_> {
        (**self).node()
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn node(&self) -> Node<'_> {
        (**self).node()
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

impl<T: Encode> Encode for Option<T> {
    fn node(&self) -> Node<'_> {
        match self {
            Some(v) => v.node(),
            None => Node::Nil,
        }
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T: Encode> Encode for [T] {
    fn node(&self) -> Node<'_> {
        Node::Seq(self.iter().map(|v| v as &dyn Encode).collect())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn node(&self) -> Node<'_> {
        self.as_slice().node()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// Arrays are zero when every element is.
impl<T: Encode, const N: usize> Encode for [T; N] {
    fn node(&self) -> Node<'_> {
        self.as_slice().node()
    }

    fn is_zero(&self) -> bool {
        self.iter().all(Encode::is_zero)
    }
}

impl<K: Encode, V: Encode, S> Encode for HashMap<K, V, S> {
    fn node(&self) -> Node<'_> {
        Node::Map(
            self.iter()
                .map(|(k, v)| (k as &dyn Encode, v as &dyn Encode))
                .collect(),
        )
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn node(&self) -> Node<'_> {
        Node::Map(
            self.iter()
                .map(|(k, v)| (k as &dyn Encode, v as &dyn Encode))
                .collect(),
        )
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Encode for Resource {
    fn node(&self) -> Node<'_> {
        Node::Map(
            self.iter()
                .map(|(k, v)| (k as &dyn Encode, v as &dyn Encode))
                .collect(),
        )
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Encode for Value {
    fn node(&self) -> Node<'_> {
        match self {
            Value::Null => Node::Nil,
            Value::List(items) => items.as_slice().node(),
            Value::Map(m) => m.node(),
            scalar => Node::Scalar(scalar.clone()),
        }
    }
}
