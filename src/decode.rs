//! Attribute trees to typed values.
//!
//! Decoding is best-effort: keys the destination does not know are skipped and fields whose
//! key is missing keep their current value. Nested records and list elements are built from
//! `Default::default()` and only then filled, so a partially present sub-tree never leaves
//! a container half-assigned.

use crate::error::Error;
use crate::resource::Resource;
use crate::tag::{self, FieldSpec};
use crate::value::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// A type that can be filled from an attribute value.
pub trait Decode {
    /// Overwrites `self` with `value`, the attribute found for `field`.
    /// `Null` leaves `self` as it is, except that an `Option` becomes `None`.
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error>;

    /// Fills `self` from a whole resource. Only records and custom types accept one.
    fn decode_resource(&mut self, _resource: &Resource) -> Result<(), Error> {
        Err(Error::InvalidTarget {
            type_name: std::any::type_name::<Self>(),
        })
    }

    /// Sequences take a multi-valued attribute as a whole; anything else takes its first value.
    fn is_sequence() -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// Decode-self capability: the decoder hands the resource over and does not look inside.
pub trait Unmarshal {
    fn unmarshal_scim(&mut self, resource: &Resource) -> Result<(), Error>;
}

/// Decodes `resource` into `target`, which must be a record or a custom type.
pub fn unmarshal<T: Decode + ?Sized>(resource: &Resource, target: &mut T) -> Result<(), Error> {
    target.decode_resource(resource)
}

fn mismatch<T: ?Sized>(field: &str, found: &Value) -> Error {
    Error::TypeMismatch {
        field: field.to_string(),
        found: found.kind(),
        expected: std::any::type_name::<T>(),
    }
}

/// Decodes a nested map into a fresh `T` and assigns it. Used by derived records.
pub fn decode_record<T: Decode + Default>(
    target: &mut T,
    value: &Value,
    field: &str,
) -> Result<(), Error> {
    match value {
        Value::Map(m) => {
            let mut fresh = T::default();
            fresh.decode_resource(m)?;
            *target = fresh;
            Ok(())
        }
        Value::Null => Ok(()),
        other => Err(mismatch::<T>(field, other)),
    }
}

/// Finds the value of one record field in `resource` and decodes it into `target`.
pub fn decode_field<T: Decode>(
    spec: &FieldSpec,
    resource: &Resource,
    target: &mut T,
) -> Result<(), Error> {
    if spec.ignore {
        return Ok(());
    }
    let label = match &spec.sub {
        Some(sub) => format!("{}.{}", spec.name, sub.name),
        None => spec.name.clone(),
    };
    let Some(source) = locate(spec, resource) else {
        tracing::trace!(attribute = %label, "attribute absent, field left untouched");
        return Ok(());
    };
    let multi = spec.multi_valued || spec.sub.as_ref().is_some_and(|s| s.multi_valued);
    let source = if multi && !T::is_sequence() {
        match single(source) {
            Some(v) => v,
            None => return Ok(()),
        }
    } else {
        source
    };
    target.decode_value(&source, &label)
}

/// Resolves the tree location a field was encoded to.
fn locate<'r>(spec: &FieldSpec, resource: &'r Resource) -> Option<Cow<'r, Value>> {
    let value = resource.get(&spec.name)?;
    match (&spec.sub, spec.multi_valued) {
        (None, false) => Some(Cow::Borrowed(value)),
        (None, true) => match (value, tag::slots(&spec.indexes)) {
            (Value::List(items), Some(slots)) => Some(Cow::Owned(Value::List(
                slots
                    .iter()
                    .filter_map(|s| items.get(*s))
                    .filter(|v| !v.is_null())
                    .cloned()
                    .collect(),
            ))),
            _ => Some(Cow::Borrowed(value)),
        },
        (Some(sub), false) => value.as_map()?.get(&sub.name).map(Cow::Borrowed),
        (Some(sub), true) => {
            let entries = value.as_list()?;
            let picked: Vec<&Value> = match tag::slots(&spec.indexes) {
                Some(slots) => slots.iter().filter_map(|s| entries.get(*s)).collect(),
                None => entries.iter().collect(),
            };
            let values: Vec<Value> = picked
                .into_iter()
                .filter_map(|entry| entry.as_map()?.get(&sub.name))
                .cloned()
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(Cow::Owned(Value::List(values)))
            }
        }
    }
}

/// First non-null value of a (possibly nested) list.
fn single(source: Cow<'_, Value>) -> Option<Cow<'_, Value>> {
    match source {
        Cow::Borrowed(Value::List(items)) => {
            single(Cow::Borrowed(items.iter().find(|v| !v.is_null())?))
        }
        Cow::Owned(Value::List(items)) => {
            single(Cow::Owned(items.into_iter().find(|v| !v.is_null())?))
        }
        other => Some(other),
    }
}

impl Decode for bool {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        match value {
            Value::Bool(b) => *self = *b,
            Value::Null => {}
            other => return Err(mismatch::<Self>(field, other)),
        }
        Ok(())
    }
}

macro_rules! decode_int {
    ($($t:ty),*) => {$(
        impl Decode for $t {
            fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
                let wide = match value {
                    Value::Null => return Ok(()),
                    Value::Int(x) => *x,
                    Value::Float(f)
                        if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
                    {
                        *f as i64
                    }
                    other => return Err(mismatch::<Self>(field, other)),
                };
                *self = <$t>::try_from(wide).map_err(|_| mismatch::<Self>(field, value))?;
                Ok(())
            }
        }
    )*};
}

decode_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! decode_float {
    ($($t:ty),*) => {$(
        impl Decode for $t {
            fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
                match value {
                    Value::Float(f) => *self = *f as $t,
                    Value::Int(x) => *self = *x as $t,
                    Value::Null => {}
                    other => return Err(mismatch::<Self>(field, other)),
                }
                Ok(())
            }
        }
    )*};
}

decode_float!(f32, f64);

impl Decode for String {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        match value {
            Value::String(s) => self.clone_from(s),
            Value::Null => {}
            other => return Err(mismatch::<Self>(field, other)),
        }
        Ok(())
    }
}

impl<T: Decode + Default> Decode for Option<T> {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.decode_value(value, field)?;
        *self = Some(inner);
        Ok(())
    }

    fn decode_resource(&mut self, resource: &Resource) -> Result<(), Error> {
        match self {
            Some(inner) => inner.decode_resource(resource),
            None => Err(Error::NilReference {
                type_name: std::any::type_name::<Self>(),
            }),
        }
    }

    fn is_sequence() -> bool {
        T::is_sequence()
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        (**self).decode_value(value, field)
    }

    fn decode_resource(&mut self, resource: &Resource) -> Result<(), Error> {
        (**self).decode_resource(resource)
    }

    fn is_sequence() -> bool {
        T::is_sequence()
    }
}

fn decode_elements<T: Decode + Default>(items: &[Value], field: &str) -> Result<Vec<T>, Error> {
    items
        .iter()
        .map(|item| {
            let mut element = T::default();
            element.decode_value(item, field)?;
            Ok(element)
        })
        .collect()
}

impl<T: Decode + Default> Decode for Vec<T> {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        match value {
            Value::List(items) => *self = decode_elements(items, field)?,
            Value::Null => {}
            other => return Err(mismatch::<Self>(field, other)),
        }
        Ok(())
    }

    fn is_sequence() -> bool {
        true
    }
}

impl<T: Decode + Default, const N: usize> Decode for [T; N] {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        match value {
            Value::List(items) if items.len() <= N => {
                for (slot, element) in self.iter_mut().zip(decode_elements::<T>(items, field)?) {
                    *slot = element;
                }
            }
            Value::Null => {}
            other => return Err(mismatch::<Self>(field, other)),
        }
        Ok(())
    }

    fn is_sequence() -> bool {
        true
    }
}

impl<V: Decode + Default, S: BuildHasher + Default> Decode for HashMap<String, V, S> {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        match value {
            Value::Map(m) => {
                let mut out = HashMap::with_hasher(S::default());
                for (k, v) in m {
                    let mut element = V::default();
                    element.decode_value(v, &format!("{}.{}", field, k))?;
                    out.insert(k.clone(), element);
                }
                *self = out;
            }
            Value::Null => {}
            other => return Err(mismatch::<Self>(field, other)),
        }
        Ok(())
    }
}

impl<V: Decode + Default> Decode for BTreeMap<String, V> {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        match value {
            Value::Map(m) => {
                let mut out = BTreeMap::new();
                for (k, v) in m {
                    let mut element = V::default();
                    element.decode_value(v, &format!("{}.{}", field, k))?;
                    out.insert(k.clone(), element);
                }
                *self = out;
            }
            Value::Null => {}
            other => return Err(mismatch::<Self>(field, other)),
        }
        Ok(())
    }
}

impl Decode for Resource {
    fn decode_value(&mut self, value: &Value, field: &str) -> Result<(), Error> {
        match value {
            Value::Map(m) => self.clone_from(m),
            Value::Null => {}
            other => return Err(mismatch::<Self>(field, other)),
        }
        Ok(())
    }
}

/// Any attribute value is accepted as is.
impl Decode for Value {
    fn decode_value(&mut self, value: &Value, _field: &str) -> Result<(), Error> {
        self.clone_from(value);
        Ok(())
    }

    fn is_sequence() -> bool {
        true
    }
}
