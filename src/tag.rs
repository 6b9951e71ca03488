//! Field mapping declarations (`#[scim("...")]`) parsed into [`FieldSpec`]s.
//!
//! A declaration is a comma-separated list. The first segment is `name[.sub]`; an empty name
//! falls back to the field identifier in lowerCamelCase. The remaining segments are options:
//!
//! | option | effect |
//! |---|---|
//! | `multiValued`, `mV` | the attribute (group) is multi-valued |
//! | `_multiValued`, `_mV` | the sub-attribute is multi-valued |
//! | `zero`, `0` | map the field even when it holds its zero value |
//! | `ignore`, `!` | never map the field |
//! | `index=`, `i=` | `;`-separated slots: `2`, `0-3` (inclusive) or `all` |
//! | `_index=`, `_i=` | slots inside a multi-valued sub-attribute |
//!
//! Unknown options are ignored. Underscore options are dropped when there is no sub-attribute.

use crate::error::{Error, TagError};
use once_cell::sync::OnceCell;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "tag.pest"]
struct TagParser;

/// Highest slot an `index=` option may name.
pub const MAX_INDEX: usize = u16::MAX as usize;

/// A slot requested by an `index=` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    At(usize),
    /// `all`: placement is unconstrained.
    All,
}

/// Explicit slot positions, or `None` for first-fit placement.
pub fn slots(indexes: &[Index]) -> Option<Vec<usize>> {
    if indexes.is_empty() || indexes.contains(&Index::All) {
        return None;
    }
    Some(
        indexes
            .iter()
            .filter_map(|i| match i {
                Index::At(n) => Some(*n),
                Index::All => None,
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubAttribute {
    pub name: String,
    pub multi_valued: bool,
    pub indexes: Vec<Index>,
}

/// How one record field projects onto the attribute tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub sub: Option<SubAttribute>,
    pub multi_valued: bool,
    pub allow_zero: bool,
    pub ignore: bool,
    pub indexes: Vec<Index>,
}

/// The four ways a field can land in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Simple,
    SimpleMultiValued,
    Complex,
    ComplexMultiValued,
}

impl FieldSpec {
    pub fn named(name: impl Into<String>) -> Self {
        FieldSpec {
            name: name.into(),
            sub: None,
            multi_valued: false,
            allow_zero: false,
            ignore: false,
            indexes: Vec::new(),
        }
    }

    /// Parses the declaration of field `ident`; `None` means no declaration at all.
    pub fn parse(ident: &str, tag: Option<&str>) -> Result<Self, TagError> {
        let mut spec = FieldSpec::named(attribute_name(ident));
        let Some(tag) = tag else {
            return Ok(spec);
        };
        let syntax = |message: String| TagError::Syntax {
            field: ident.to_string(),
            message,
        };
        let pair = TagParser::parse(Rule::tag, tag)
            .map_err(|e| syntax(e.to_string()))?
            .next()
            .ok_or_else(|| syntax("empty declaration".to_string()))?;

        let mut sub = SubAttribute::default();
        let mut sub_name = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::target => {
                    for part in inner.into_inner() {
                        match part.as_rule() {
                            Rule::name => spec.name = part.as_str().to_string(),
                            Rule::sub_name if !part.as_str().is_empty() => {
                                sub_name = Some(part.as_str().to_string())
                            }
                            _ => {}
                        }
                    }
                }
                Rule::index_opt => {
                    let (on_sub, indexes) = build_indexes(ident, inner)?;
                    if on_sub {
                        sub.indexes.extend(indexes);
                    } else {
                        spec.indexes.extend(indexes);
                    }
                }
                Rule::flag => {
                    let mut on_sub = false;
                    let mut word = "";
                    for part in inner.into_inner() {
                        match part.as_rule() {
                            Rule::sub_marker => on_sub = true,
                            Rule::flag_word => word = part.as_str().trim(),
                            _ => {}
                        }
                    }
                    match (on_sub, word) {
                        (false, "multiValued" | "mV") => spec.multi_valued = true,
                        (true, "multiValued" | "mV") => sub.multi_valued = true,
                        (false, "zero" | "0") => spec.allow_zero = true,
                        (false, "ignore" | "!") => spec.ignore = true,
                        (_, "") => {}
                        (_, other) => {
                            tracing::debug!(field = ident, option = other, "ignoring unknown mapping option")
                        }
                    }
                }
                _ => {}
            }
        }
        if let Some(name) = sub_name {
            sub.name = name;
            spec.sub = Some(sub);
        }
        Ok(spec)
    }

    pub fn shape(&self) -> Shape {
        match (&self.sub, self.multi_valued) {
            (None, false) => Shape::Simple,
            (None, true) => Shape::SimpleMultiValued,
            (Some(_), false) => Shape::Complex,
            (Some(_), true) => Shape::ComplexMultiValued,
        }
    }
}

fn parse_number(field: &str, s: &str) -> Result<usize, TagError> {
    s.parse::<usize>()
        .ok()
        .filter(|n| *n <= MAX_INDEX)
        .ok_or_else(|| TagError::IndexOverflow {
            field: field.to_string(),
            value: s.to_string(),
        })
}

fn build_indexes(field: &str, pair: Pair<Rule>) -> Result<(bool, Vec<Index>), TagError> {
    let mut on_sub = false;
    let mut out = Vec::new();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::sub_marker => on_sub = true,
            Rule::all => out.push(Index::All),
            Rule::number => out.push(Index::At(parse_number(field, part.as_str())?)),
            Rule::range => {
                let mut bounds = part.into_inner().map(|p| p.as_str());
                let start = parse_number(field, bounds.next().unwrap_or_default())?;
                let end = parse_number(field, bounds.next().unwrap_or_default())?;
                if start > end {
                    return Err(TagError::InvertedRange {
                        field: field.to_string(),
                        start,
                        end,
                    });
                }
                out.extend((start..=end).map(Index::At));
            }
            _ => {}
        }
    }
    Ok((on_sub, out))
}

/// Default attribute name of a field: its identifier in lowerCamelCase
/// (`user_name` and `UserName` both become `userName`).
pub fn attribute_name(ident: &str) -> String {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    let mut out = String::with_capacity(ident.len());
    let mut upper_next = false;
    for c in ident.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if out.is_empty() {
            out.extend(c.to_lowercase());
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    if out.is_empty() {
        ident.to_string()
    } else {
        out
    }
}

/// Per-type cache of parsed field specs, filled on first use.
pub type SpecCell = OnceCell<Result<Vec<FieldSpec>, TagError>>;

/// Parses `decls` (field identifier, declaration) once and returns the cached specs.
pub fn cached(
    cell: &'static SpecCell,
    decls: &[(&str, Option<&str>)],
) -> Result<&'static [FieldSpec], Error> {
    cell.get_or_init(|| {
        decls
            .iter()
            .map(|(ident, tag)| FieldSpec::parse(ident, *tag))
            .collect()
    })
    .as_deref()
    .map_err(|e| Error::Tag(e.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names() {
        assert_eq!(attribute_name("UserName"), "userName");
        assert_eq!(attribute_name("user_name"), "userName");
        assert_eq!(attribute_name("x509_certificates"), "x509Certificates");
        assert_eq!(attribute_name("r#type"), "type");
        assert_eq!(attribute_name("id"), "id");
    }

    #[test]
    fn no_declaration() {
        let spec = FieldSpec::parse("display_name", None).expect("parse");
        assert_eq!(spec, FieldSpec::named("displayName"));
        assert_eq!(spec.shape(), Shape::Simple);
    }

    #[test]
    fn range_and_all() {
        let spec = FieldSpec::parse("x", Some(",i=1-3;7")).expect("parse");
        assert_eq!(slots(&spec.indexes), Some(vec![1, 2, 3, 7]));
        let spec = FieldSpec::parse("x", Some(",index=all")).expect("parse");
        assert_eq!(spec.indexes, vec![Index::All]);
        assert_eq!(slots(&spec.indexes), None);
    }

    #[test]
    fn inverted_range() {
        assert_eq!(
            FieldSpec::parse("x", Some(",i=5-2")),
            Err(TagError::InvertedRange { field: "x".to_string(), start: 5, end: 2 })
        );
    }

    #[test]
    fn cache_parses_once() {
        static CELL: SpecCell = OnceCell::new();
        let first = cached(&CELL, &[("user_name", None), ("email", Some("emails.value,mV"))]).expect("specs");
        let second = cached(&CELL, &[]).expect("specs");
        assert_eq!(first.len(), 2);
        assert!(std::ptr::eq(first, second));
        assert_eq!(second[1].shape(), Shape::ComplexMultiValued);
    }
}
