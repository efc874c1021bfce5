use std::sync::Arc;

use crate::error::{Error, Result};
use crate::field::{Field, ScalarType};
use crate::node::{BuildContext, SchemeNode, Segment, Slot};
use crate::schema::NodeSchema;
use crate::value::Value;

/// The element type of a [`ListOfNodes`] field.
#[derive(Clone, Debug)]
pub enum ElementType {
    Scalar(ScalarType),
    Node(Arc<NodeSchema>),
}

/// Field type for an ordered sequence of scalars or child nodes.
///
/// The raw value must be a sequence; each element is either coerced to the
/// scalar element type or used to construct a child node (brief scalars
/// allowed per element). Input order is preserved. An absent or null raw
/// value yields an empty sequence.
#[derive(Clone, Debug)]
pub struct ListOfNodes {
    elem: ElementType,
}

impl ListOfNodes {
    /// A list of scalars of the given type.
    pub fn of(elem: ScalarType) -> Self {
        Self {
            elem: ElementType::Scalar(elem),
        }
    }

    /// A list of child nodes of the given type.
    pub fn nodes(schema: &Arc<NodeSchema>) -> Self {
        Self {
            elem: ElementType::Node(Arc::clone(schema)),
        }
    }

    pub fn element_type(&self) -> &ElementType {
        &self.elem
    }

    pub(crate) fn empty(&self) -> Slot {
        match &self.elem {
            ElementType::Scalar(_) => Slot::Value(Value::Array(Vec::new())),
            ElementType::Node(_) => Slot::Nodes(NodeList { nodes: Vec::new() }),
        }
    }

    pub(crate) fn build(
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
        match &self.elem {
            ElementType::Scalar(elem) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let actual = item.kind();
                    match elem.coerce(item) {
                        Some(coerced) => out.push(coerced),
                        None => {
                            return Err(Error::WrongType {
                                field: field.name().to_string(),
                                node: owner.name().to_string(),
                                expected: elem.name(),
                                actual,
                            })
                        }
                    }
                }
                Ok(Slot::Value(Value::Array(out)))
            }
            ElementType::Node(schema) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    ctx.path.push(Segment::Field(field.name().to_string()));
                    ctx.path.push(Segment::Index(index));
                    let node = SchemeNode::build(schema, item, None, ctx);
                    ctx.path.pop();
                    ctx.path.pop();
                    nodes.push(node?);
                }
                Ok(Slot::Nodes(NodeList { nodes }))
            }
        }
    }
}

/// The stored child nodes of a [`ListOfNodes`] field.
pub struct NodeList {
    nodes: Vec<SchemeNode>,
}

impl NodeList {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SchemeNode> {
        self.nodes.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut SchemeNode> {
        self.nodes.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemeNode> {
        self.nodes.iter()
    }

    pub(crate) fn render(&self) -> Value {
        Value::Array(self.nodes.iter().map(SchemeNode::get_data).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::FieldType;
    use crate::yaml;

    #[test]
    fn scalar_list_coerces_elements() {
        let schema = NodeSchema::builder("Log")
            .field(Field::new("updates").ftype(ListOfNodes::of(ScalarType::Str)))
            .build()
            .unwrap();
        let node = schema
            .build(yaml::from_str("updates: [first, 2]").unwrap())
            .unwrap();
        assert_eq!(
            node.value("updates"),
            Some(&Value::Array(vec!["first".into(), "2".into()]))
        );
    }

    #[test]
    fn scalar_list_rejects_wrong_element() {
        let schema = NodeSchema::builder("Log")
            .field(Field::new("counts").ftype(ListOfNodes::of(ScalarType::Int)))
            .build()
            .unwrap();
        let err = schema
            .build(yaml::from_str("counts: [1, oops]").unwrap())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'counts' of 'Log': expected integer, got string"
        );
    }

    #[test]
    fn list_must_be_a_sequence() {
        let schema = NodeSchema::builder("Log")
            .field(Field::new("updates").ftype(ListOfNodes::of(ScalarType::Str)))
            .build()
            .unwrap();
        let err = schema
            .build(yaml::from_str("updates: nope").unwrap())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'updates' of 'Log': expected sequence, got string"
        );
    }

    #[test]
    fn node_list_builds_children_in_order() {
        let step = NodeSchema::builder("Step")
            .field(Field::new("run").brief())
            .build()
            .unwrap();
        let schema = NodeSchema::builder("Job")
            .field(Field::new("steps").ftype(ListOfNodes::nodes(&step)))
            .build()
            .unwrap();
        let node = schema
            .build(yaml::from_str("steps: [build, {run: test}]").unwrap())
            .unwrap();
        let steps = node.nodes("steps").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps.get(0).unwrap().value("run"), Some(&"build".into()));
        assert_eq!(steps.get(1).unwrap().value("run"), Some(&"test".into()));
    }

    #[test]
    fn absent_list_is_empty_and_omitted() {
        let schema = NodeSchema::builder("Log")
            .field(Field::new("updates").ftype(ListOfNodes::of(ScalarType::Str)))
            .build()
            .unwrap();
        let node = schema.build(Value::Null).unwrap();
        assert!(!node.get_data().as_map().unwrap().contains_key("updates"));
        // The slot itself still exists as an empty sequence.
        assert_eq!(node.value("updates"), Some(&Value::Array(vec![])));
        assert!(matches!(
            schema.fields()[0].field_type(),
            FieldType::ListOfNodes(_)
        ));
    }

    #[test]
    fn absent_list_with_always_renders_empty() {
        let schema = NodeSchema::builder("Log")
            .field(
                Field::new("updates")
                    .ftype(ListOfNodes::of(ScalarType::Str))
                    .always(),
            )
            .build()
            .unwrap();
        let node = schema.build(Value::Null).unwrap();
        assert_eq!(
            node.get_data().as_map().unwrap().get("updates"),
            Some(&Value::Array(vec![]))
        );
    }
}
