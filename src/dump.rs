//! Format attribute trees for display: compact one-line text (`Display`) and an indented
//! tree view.

use crate::resource::Resource;
use crate::value::Value;
use std::fmt::{self, Write};

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(']')
            }
            Value::Map(m) => write!(f, "{}", m),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}: {}", k, v)?;
        }
        f.write_char('}')
    }
}

/// Indented tree view, one attribute per line. Lists show their slot numbers.
pub fn format_tree(resource: &Resource) -> String {
    let mut out = String::new();
    write_map(&mut out, resource, 0);
    out
}

fn write_map(out: &mut String, resource: &Resource, depth: usize) {
    for (k, v) in resource {
        let _ = write!(out, "{}{}", "  ".repeat(depth), k);
        write_value(out, v, depth);
    }
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Map(m) => {
            out.push('\n');
            write_map(out, m, depth + 1);
        }
        Value::List(items) if items.iter().any(|v| matches!(v, Value::Map(_) | Value::List(_))) => {
            out.push('\n');
            for (i, item) in items.iter().enumerate() {
                let _ = write!(out, "{}[{}]", "  ".repeat(depth + 1), i);
                write_value(out, item, depth + 1);
            }
        }
        other => {
            let _ = writeln!(out, ": {}", other);
        }
    }
}
