use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::fields::{KeyedNodes, NodeList, RefSlot};
use crate::schema::NodeSchema;
use crate::value::Value;

/// Auxiliary storage that lifecycle hooks use to record derived values
/// outside any field's own slot. Merged into the node's normalized data
/// after every declared field has been processed.
pub type ExtraData = IndexMap<String, Value>;

/// One step in a node's location within the tree, counted from the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Descend into the named field's collection.
    Field(String),
    /// Descend into a keyed collection entry.
    Key(String),
    /// Descend into a node list element.
    Index(usize),
}

/// State threaded through one tree construction: the path of the node
/// currently being built, and the reference requests recorded along the way
/// for the resolution pass.
#[derive(Default)]
pub(crate) struct BuildContext {
    pub(crate) path: Vec<Segment>,
    pub(crate) pending: Vec<PendingRef>,
}

/// A deferred reference lookup: which node holds the reference field. The
/// target type, relative path, keys, and required flag all live on the
/// field's declaration, reachable from the node itself.
#[derive(Debug)]
pub(crate) struct PendingRef {
    pub(crate) node_path: Vec<Segment>,
    pub(crate) field: String,
}

/// The stored form of one field's value.
pub(crate) enum Slot {
    /// A plain value: coerced scalar, scalar list, passthrough, or default.
    Value(Value),
    /// Child nodes built by a `ListOfNodes` field.
    Nodes(NodeList),
    /// Child nodes built by a `KeyBasedList` field.
    Keyed(KeyedNodes),
    /// Recorded identity keys of a `ListOfReferences` field.
    Refs(RefSlot),
}

impl Slot {
    /// Render back to plain primitives, recursively.
    pub(crate) fn render(&self) -> Value {
        match self {
            Slot::Value(v) => v.clone(),
            Slot::Nodes(nodes) => nodes.render(),
            Slot::Keyed(keyed) => keyed.render(),
            Slot::Refs(refs) => {
                Value::Array(refs.keys().iter().map(|k| Value::Str(k.clone())).collect())
            }
        }
    }
}

pub(crate) struct StoredField {
    pub(crate) slot: Slot,
    /// Whether the field appears in normalized output. Defaulted values are
    /// suppressed unless the field is marked `always`.
    pub(crate) emit: bool,
}

/// One validated, normalized node instance.
///
/// Nodes are built top-down, depth-first per declared field, by
/// [`Document::new`][crate::Document::new] or
/// [`NodeSchema::build`][crate::NodeSchema::build]. Once constructed they are
/// immutable from the outside; a new document load produces a new tree.
pub struct SchemeNode {
    schema: Arc<NodeSchema>,
    data: IndexMap<String, StoredField>,
    /// Key order of the raw document mapping, for `preserve_order` output.
    doc_order: Vec<String>,
}

impl std::fmt::Debug for SchemeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemeNode")
            .field("schema", &self.schema.name())
            .field("fields", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemeNode {
    /// Build one node from a raw value.
    ///
    /// Branches on the raw value's kind: a mapping feeds every declared
    /// field, a bare scalar routes through the brief field, null stands for
    /// an empty mapping, and a sequence can never be a node. `identity`, when
    /// given, is injected as the identity field's value and overrides any
    /// in-body value.
    pub(crate) fn build(
        schema: &Arc<NodeSchema>,
        raw: Value,
        identity: Option<&str>,
        ctx: &mut BuildContext,
    ) -> Result<Self> {
        trace!(node = schema.name(), "building node");
        let mut map = match raw {
            Value::Map(map) => map,
            Value::Null => IndexMap::new(),
            Value::Array(_) => {
                return Err(Error::BadNodeValue {
                    node: schema.name().to_string(),
                    kind: "sequence",
                })
            }
            scalar => {
                let brief = schema.brief_field().ok_or_else(|| Error::NoBriefField {
                    node: schema.name().to_string(),
                })?;
                let mut map = IndexMap::new();
                map.insert(brief.name().to_string(), scalar);
                map
            }
        };

        if let Some(key) = identity {
            let id = schema.identity_field().ok_or_else(|| Error::InvalidSchema {
                schema: schema.name().to_string(),
                reason: "identity key given but no field is marked identity".to_string(),
            })?;
            map.shift_remove(id.name());
            let mut keyed = IndexMap::with_capacity(map.len() + 1);
            keyed.insert(id.name().to_string(), Value::Str(key.to_string()));
            keyed.extend(map);
            map = keyed;
        }

        let doc_order: Vec<String> = map.keys().cloned().collect();
        let mut data = IndexMap::new();
        let mut extra = ExtraData::new();

        for field in schema.fields() {
            // A null sub-value is the same as an absent key.
            let raw = match map.shift_remove(field.name()) {
                Some(Value::Null) | None => None,
                present => present,
            };
            if let Some(stored) = field.assign(schema, raw, &mut extra, ctx)? {
                data.insert(field.name().to_string(), stored);
            }
        }

        if !schema.allow_undefined() {
            if let Some((key, _)) = map.first() {
                return Err(Error::UndefinedField {
                    field: key.clone(),
                    node: schema.name().to_string(),
                });
            }
        }
        for (key, value) in map {
            data.insert(
                key,
                StoredField {
                    slot: Slot::Value(value),
                    emit: true,
                },
            );
        }
        for (key, value) in extra {
            data.insert(
                key,
                StoredField {
                    slot: Slot::Value(value),
                    emit: true,
                },
            );
        }

        Ok(Self {
            schema: Arc::clone(schema),
            data,
            doc_order,
        })
    }

    /// The node type's name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// The effective field declarations, in canonical order.
    pub fn fields(&self) -> &[crate::field::Field] {
        self.schema.fields()
    }

    /// The schema this node was built against.
    pub fn schema(&self) -> &Arc<NodeSchema> {
        &self.schema
    }

    /// A stored plain value: coerced scalar, scalar list, passthrough key,
    /// or hook-derived entry.
    pub fn value(&self, field: &str) -> Option<&Value> {
        match &self.data.get(field)?.slot {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The child nodes of a `ListOfNodes` field.
    pub fn nodes(&self, field: &str) -> Option<&NodeList> {
        match &self.data.get(field)?.slot {
            Slot::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// The keyed collection of a `KeyBasedList` field.
    pub fn keyed(&self, field: &str) -> Option<&KeyedNodes> {
        match &self.data.get(field)?.slot {
            Slot::Keyed(keyed) => Some(keyed),
            _ => None,
        }
    }

    /// The recorded reference keys of a `ListOfReferences` field.
    pub fn refs(&self, field: &str) -> Option<&RefSlot> {
        match &self.data.get(field)?.slot {
            Slot::Refs(refs) => Some(refs),
            _ => None,
        }
    }

    /// Render the normalized data back to plain primitives.
    ///
    /// Keys that appeared in the raw document come first, in document order,
    /// when the schema preserves order; everything else follows in field
    /// declaration order, with passthrough and hook-derived entries last.
    pub fn get_data(&self) -> Value {
        let mut out = IndexMap::new();
        if self.schema.preserve_order() {
            for key in &self.doc_order {
                if let Some(stored) = self.data.get(key) {
                    if stored.emit {
                        out.insert(key.clone(), stored.slot.render());
                    }
                }
            }
        }
        for (key, stored) in &self.data {
            if stored.emit && !out.contains_key(key) {
                out.insert(key.clone(), stored.slot.render());
            }
        }
        Value::Map(out)
    }

    /// Walk down to the node at `path`, if the path lands exactly on a node.
    pub(crate) fn node_at(&self, path: &[Segment]) -> Option<&SchemeNode> {
        let mut node = self;
        let mut i = 0;
        while i < path.len() {
            let Segment::Field(field) = &path[i] else {
                return None;
            };
            let stored = node.data.get(field)?;
            node = match (&stored.slot, path.get(i + 1)?) {
                (Slot::Keyed(keyed), Segment::Key(key)) => keyed.get(key)?,
                (Slot::Nodes(nodes), Segment::Index(index)) => nodes.get(*index)?,
                _ => return None,
            };
            i += 2;
        }
        Some(node)
    }

    /// Replace a reference field's recorded keys with its resolved key list.
    pub(crate) fn set_resolved(&mut self, path: &[Segment], field: &str, keys: Vec<String>) -> bool {
        match path {
            [] => match self.data.get_mut(field) {
                Some(StoredField {
                    slot: Slot::Refs(refs),
                    ..
                }) => {
                    refs.resolve(keys);
                    true
                }
                _ => false,
            },
            [Segment::Field(step), next, rest @ ..] => {
                let Some(stored) = self.data.get_mut(step) else {
                    return false;
                };
                let child = match (&mut stored.slot, next) {
                    (Slot::Keyed(keyed), Segment::Key(key)) => keyed.get_mut(key),
                    (Slot::Nodes(nodes), Segment::Index(index)) => nodes.get_mut(*index),
                    _ => None,
                };
                match child {
                    Some(child) => child.set_resolved(rest, field, keys),
                    None => false,
                }
            }
            _ => false,
        }
    }
}
