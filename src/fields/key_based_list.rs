use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::field::Field;
use crate::node::{BuildContext, SchemeNode, Segment, Slot};
use crate::schema::NodeSchema;
use crate::value::Value;

/// Field type for an identity-keyed collection of child nodes.
///
/// The raw value must be a mapping from identity key to entry value, where
/// each entry is itself a mapping or a brief scalar. The map key is injected
/// as the entry's identity field value, so it need not be repeated in the
/// body. Key insertion order is preserved for iteration and rendering.
#[derive(Clone, Debug)]
pub struct KeyBasedList {
    node: Arc<NodeSchema>,
}

impl KeyBasedList {
    /// A keyed collection of nodes of the given type. The type must declare
    /// an identity field; this is checked when the owning schema is built.
    pub fn new(schema: &Arc<NodeSchema>) -> Self {
        Self {
            node: Arc::clone(schema),
        }
    }

    pub fn schema(&self) -> &Arc<NodeSchema> {
        &self.node
    }

    pub(crate) fn empty(&self) -> Slot {
        Slot::Keyed(KeyedNodes {
            schema: Arc::clone(&self.node),
            entries: IndexMap::new(),
        })
    }

    pub(crate) fn build(
        &self,
        field: &Field,
        owner: &NodeSchema,
        value: Value,
        ctx: &mut BuildContext,
    ) -> Result<Slot> {
        let raw = match value {
            Value::Map(map) => map,
            Value::Null => IndexMap::new(),
            other => {
                return Err(Error::WrongType {
                    field: field.name().to_string(),
                    node: owner.name().to_string(),
                    expected: "mapping",
                    actual: other.kind(),
                })
            }
        };
        let mut entries = IndexMap::with_capacity(raw.len());
        for (key, value) in raw {
            ctx.path.push(Segment::Field(field.name().to_string()));
            ctx.path.push(Segment::Key(key.clone()));
            let node = SchemeNode::build(&self.node, value, Some(&key), ctx);
            ctx.path.pop();
            ctx.path.pop();
            entries.insert(key, node?);
        }
        Ok(Slot::Keyed(KeyedNodes {
            schema: Arc::clone(&self.node),
            entries,
        }))
    }
}

/// The stored entries of a [`KeyBasedList`] field: an ordered mapping from
/// identity key to node, also iterable as an ordered node sequence.
pub struct KeyedNodes {
    schema: Arc<NodeSchema>,
    entries: IndexMap<String, SchemeNode>,
}

impl KeyedNodes {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&SchemeNode> {
        self.entries.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut SchemeNode> {
        self.entries.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemeNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SchemeNode> {
        self.entries.values()
    }

    pub(crate) fn schema_name(&self) -> &str {
        self.schema.name()
    }

    /// Render as key to entry body. The identity field is elided from each
    /// body, since the key already carries it, and a body that reduces to
    /// exactly the brief field collapses to its compact scalar form.
    pub(crate) fn render(&self) -> Value {
        let mut out = IndexMap::with_capacity(self.entries.len());
        for (key, node) in &self.entries {
            let mut body = match node.get_data() {
                Value::Map(map) => map,
                other => {
                    out.insert(key.clone(), other);
                    continue;
                }
            };
            if let Some(id) = self.schema.identity_field() {
                body.shift_remove(id.name());
            }
            let rendered = if body.len() == 1 {
                match self
                    .schema
                    .brief_field()
                    .and_then(|brief| body.shift_remove(brief.name()))
                {
                    Some(brief_value) => brief_value,
                    None => Value::Map(body),
                }
            } else {
                Value::Map(body)
            };
            out.insert(key.clone(), rendered);
        }
        Value::Map(out)
    }
}
