//! quick-scheme is a declarative schema layer for YAML-like documents. An
//! application declares the shape of its data tree once, as ordered field
//! declarations per node type, and gets validation, normalization, and
//! cross-referencing when a document is loaded:
//!
//! - presence, type, and required checks with defaults per field
//! - custom per-field validators and lifecycle hooks around assignment
//! - open nodes that tolerate undefined keys, closed nodes that reject them
//! - a compact "brief" single-scalar form for simple nodes
//! - identity-keyed collections and lazy cross-node references resolved by
//!   identity key against collections elsewhere in the same tree
//!
//! Node types are registered once as immutable [`NodeSchema`] values and
//! shared by every tree built against them. [`Document::new`] builds a whole
//! tree in two passes: construction first, reference resolution second, so
//! references may point forward or backward in document order. Any
//! validation failure aborts the whole construction; no partial tree is
//! ever returned.
//!
//! ```
//! use quick_scheme::*;
//!
//! # fn main() -> Result<()> {
//! let group = NodeSchema::builder("Group")
//!     .field(Field::new("groupname").identity())
//!     .field(Field::new("desc").brief())
//!     .build()?;
//! let user = NodeSchema::builder("User")
//!     .field(Field::new("username").identity())
//!     .field(Field::new("first_name").default_value("").required())
//!     .field(Field::new("groups").ftype(ListOfReferences::new(&group, ".groups").optional()))
//!     .build()?;
//! let root = NodeSchema::builder("Data")
//!     .field(Field::new("groups").ftype(KeyBasedList::new(&group)))
//!     .field(Field::new("users").ftype(KeyBasedList::new(&user)))
//!     .build()?;
//!
//! let doc = Document::new(
//!     &root,
//!     yaml::from_str(
//!         "groups:\n  admins: Admins\nusers:\n  alice:\n    first_name: Alice\n    groups: [admins]\n",
//!     )?,
//! )?;
//! let users = doc.root().keyed("users").unwrap();
//! let alice = users.get("alice").unwrap();
//! assert_eq!(alice.value("username"), Some(&Value::from("alice")));
//! assert_eq!(alice.value("first_name"), Some(&Value::from("Alice")));
//! # Ok(())
//! # }
//! ```

mod document;
mod error;
mod field;
mod fields;
mod node;
mod schema;
mod value;

pub mod yaml;

pub use self::document::Document;
pub use self::error::{Error, Result};
pub use self::field::{Field, FieldType, FieldValue, ScalarType, ValidatorFn};
pub use self::fields::{
    ElementType, KeyBasedList, KeyedNodes, ListOfNodes, ListOfReferences, NodeList, RefPath,
    RefSlot,
};
pub use self::node::{ExtraData, SchemeNode};
pub use self::schema::{
    AfterSetHook, BeforeSetHook, DoSetHook, NodeSchema, OnNotSetHook, SchemaBuilder,
};
pub use self::value::Value;
