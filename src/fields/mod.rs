//! The container and reference field types.
//!
//! These are the field types whose values are built out of other nodes:
//!
//! - [`ListOfNodes`] - an ordered sequence of scalars or child nodes.
//! - [`KeyBasedList`] - an identity-keyed, insertion-ordered collection of
//!   child nodes.
//! - [`ListOfReferences`] - identity keys resolving to nodes owned elsewhere
//!   in the same tree.
//!
//! Each type doubles as a constructor for a [`FieldType`][crate::FieldType],
//! the way a field declares it:
//!
//! ```
//! # use quick_scheme::*;
//! # fn main() -> Result<()> {
//! let group = NodeSchema::builder("Group")
//!     .field(Field::new("groupname").identity())
//!     .field(Field::new("desc").brief())
//!     .build()?;
//! let user = NodeSchema::builder("User")
//!     .field(Field::new("username").identity())
//!     .field(Field::new("groups").ftype(ListOfReferences::new(&group, ".groups").optional()))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod key_based_list;
mod list_of_nodes;
mod list_of_references;

pub use self::key_based_list::{KeyBasedList, KeyedNodes};
pub use self::list_of_nodes::{ElementType, ListOfNodes, NodeList};
pub use self::list_of_references::{ListOfReferences, RefPath, RefSlot};
