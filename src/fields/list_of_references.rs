use std::sync::Arc;

use crate::error::{Error, Result};
use crate::field::Field;
use crate::node::{BuildContext, PendingRef, Slot};
use crate::schema::NodeSchema;
use crate::value::Value;

/// A relative path from a referencing node to a target collection, written
/// with a leading dot: `".groups"` means "the `groups` collection on the
/// nearest ancestor that has one".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefPath {
    collection: String,
}

impl RefPath {
    pub fn parse(path: &str) -> Self {
        Self {
            collection: path.trim_start_matches('.').to_string(),
        }
    }

    /// The field name of the target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

/// Field type for a list of references to nodes owned elsewhere in the tree.
///
/// The raw value is a sequence of identity-key strings. The field never
/// constructs or owns target nodes; it records the keys and a deferred
/// lookup request, resolved by [`Document::new`][crate::Document::new] once
/// the whole tree exists, so references may point forward or backward in
/// document order.
#[derive(Clone, Debug)]
pub struct ListOfReferences {
    target: Arc<NodeSchema>,
    path: RefPath,
    required: bool,
}

impl ListOfReferences {
    /// References to nodes of `target`, located via `path` (e.g. `".groups"`).
    /// Keys are required to resolve unless [`optional`][Self::optional].
    pub fn new(target: &Arc<NodeSchema>, path: &str) -> Self {
        Self {
            target: Arc::clone(target),
            path: RefPath::parse(path),
            required: true,
        }
    }

    /// Silently drop keys that fail to resolve instead of failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn target(&self) -> &Arc<NodeSchema> {
        &self.target
    }

    pub fn path(&self) -> &RefPath {
        &self.path
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub(crate) fn record(
        &self,
        field: &Field,
        owner: &NodeSchema,
        value: Value,
        ctx: &mut BuildContext,
    ) -> Result<Slot> {
        let items = match value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(Error::WrongType {
                    field: field.name().to_string(),
                    node: owner.name().to_string(),
                    expected: "sequence",
                    actual: other.kind(),
                })
            }
        };
        let mut keys = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Str(key) => keys.push(key),
                other => {
                    return Err(Error::WrongType {
                        field: field.name().to_string(),
                        node: owner.name().to_string(),
                        expected: "string",
                        actual: other.kind(),
                    })
                }
            }
        }
        ctx.pending.push(PendingRef {
            node_path: ctx.path.clone(),
            field: field.name().to_string(),
        });
        Ok(Slot::Refs(RefSlot {
            keys,
            resolved: false,
        }))
    }
}

/// The recorded keys of a [`ListOfReferences`] field. Until the resolution
/// pass runs, the keys are exactly as given in the document; afterwards,
/// keys that failed to resolve on a non-required field have been dropped.
#[derive(Debug, Default)]
pub struct RefSlot {
    keys: Vec<String>,
    resolved: bool,
}

impl RefSlot {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub(crate) fn resolve(&mut self, keys: Vec<String>) {
        self.keys = keys;
        self.resolved = true;
    }
}
