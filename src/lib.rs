//! # scim-marshal — attribute-tree codec for SCIM resources
//!
//! Converts between strongly typed records and the generic attribute tree
//! ([`Resource`]: nested string-keyed maps, lists and scalars) that directory
//! synchronization exchanges on the wire.
//!
//! ## Attribute tree
//!
//! - **Simple** attribute: a scalar (`bool`, integer, float, string).
//! - **Complex** attribute: a map of sub-attributes, one level deep.
//! - **Multi-valued** attribute: a list of scalars, or a list of complex values (a group).
//!
//! Sibling keys may not differ only by case, and nested records flatten at most one level
//! below the attribute they are stored in.
//!
//! ## Mapping declarations
//!
//! Records derive [`Encode`] and [`Decode`]; each field may declare where it lands:
//!
//! ```text
//! #[derive(Default, Encode, Decode)]
//! struct User {
//!     user_name: String,                       // "userName"
//!     #[scim("emails.value,mV")]
//!     email: Vec<String>,                      // "emails": [{"value": ..}, ..]
//!     #[scim("emails.type,mV")]
//!     email_type: Vec<String>,                 // merged into the same entries
//!     #[scim("active,0")]
//!     active: bool,                            // kept even when false
//!     #[scim(",!")]
//!     password_hash: String,                   // never mapped
//! }
//! ```
//!
//! See [`tag`] for the full option grammar (`mV`, `_mV`, `0`, `!`, `i=0;2-3`, `i=all`).
//!
//! ## Usage
//!
//! ```text
//! let resource = scim_marshal::marshal(&user)?;
//! let mut copy = User::default();
//! scim_marshal::unmarshal(&resource, &mut copy)?;
//! ```

extern crate self as scim_marshal;

pub mod attributes;
pub mod decode;
pub mod dump;
pub mod encode;
pub mod error;
pub mod resource;
pub mod tag;
pub mod value;

pub use decode::{unmarshal, Decode, Unmarshal};
pub use encode::{marshal, Encode, Field, Marshal, Node, Record};
pub use error::{Error, TagError};
pub use resource::Resource;
pub use tag::{FieldSpec, Index, Shape, SubAttribute};
pub use value::Value;

#[cfg(feature = "derive")]
pub use scim_marshal_derive::{Decode, Encode};
