use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::field::FieldType;
use crate::fields::ListOfReferences;
use crate::node::{BuildContext, PendingRef, SchemeNode, Segment};
use crate::schema::NodeSchema;
use crate::value::Value;

/// A fully built and reference-resolved node tree.
///
/// Construction is two passes: the first builds the whole tree from the raw
/// value, recording every reference field's lookup request; the second walks
/// the requests against the now-complete tree. A reference may therefore
/// point at a collection that appears later in document order than the
/// referencing field.
#[derive(Debug)]
pub struct Document {
    root: SchemeNode,
}

impl Document {
    /// Build the tree and resolve every recorded reference, or fail without
    /// returning any partial tree.
    pub fn new(schema: &Arc<NodeSchema>, data: Value) -> Result<Self> {
        let mut ctx = BuildContext::default();
        let root = SchemeNode::build(schema, data, None, &mut ctx)?;
        debug!(
            root = schema.name(),
            pending = ctx.pending.len(),
            "node tree built"
        );
        let mut doc = Self { root };
        for pending in &ctx.pending {
            doc.resolve(pending)?;
        }
        Ok(doc)
    }

    /// The root node.
    pub fn root(&self) -> &SchemeNode {
        &self.root
    }

    /// Render the whole tree back to plain primitives.
    pub fn get_data(&self) -> Value {
        self.root.get_data()
    }

    fn resolve(&mut self, pending: &PendingRef) -> Result<()> {
        let root_name = self.root.name().to_string();
        let dangling = move || Error::InvalidSchema {
            schema: root_name.clone(),
            reason: format!("dangling reference request for field '{}'", pending.field),
        };
        let (decl, node_name, keys) = {
            let owner = self
                .root
                .node_at(&pending.node_path)
                .ok_or_else(|| dangling())?;
            let decl = match owner
                .schema()
                .field(&pending.field)
                .map(|f| f.field_type())
            {
                Some(FieldType::ListOfReferences(decl)) => decl.clone(),
                _ => return Err(dangling()),
            };
            let keys = owner
                .refs(&pending.field)
                .ok_or_else(|| dangling())?
                .keys()
                .to_vec();
            (decl, owner.name().to_string(), keys)
        };
        trace!(
            node = %node_name,
            field = %pending.field,
            keys = keys.len(),
            "resolving references"
        );
        let resolved = self.resolve_keys(&pending.node_path, &decl, &pending.field, &node_name, keys)?;
        if !self.root.set_resolved(&pending.node_path, &pending.field, resolved) {
            return Err(dangling());
        }
        Ok(())
    }

    /// Walk anchor candidates from the referencing node toward the root; the
    /// first ancestor exposing a keyed collection of the target type under
    /// the declared path is the target. Resolution order and duplicates
    /// follow the input key order.
    fn resolve_keys(
        &self,
        node_path: &[Segment],
        decl: &ListOfReferences,
        field: &str,
        node_name: &str,
        keys: Vec<String>,
    ) -> Result<Vec<String>> {
        let unresolved = |key: String| Error::UnresolvedReference {
            key,
            field: field.to_string(),
            node: node_name.to_string(),
            target: decl.target().name().to_string(),
        };
        let collection = (0..=node_path.len()).rev().find_map(|cut| {
            let anchor = self.root.node_at(&node_path[..cut])?;
            let keyed = anchor.keyed(decl.path().collection())?;
            (keyed.schema_name() == decl.target().name()).then_some(keyed)
        });
        let Some(collection) = collection else {
            // No such collection anywhere up the chain: every key is
            // unresolved.
            return if decl.is_required() {
                match keys.into_iter().next() {
                    Some(key) => Err(unresolved(key)),
                    None => Ok(Vec::new()),
                }
            } else {
                Ok(Vec::new())
            };
        };
        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            if collection.contains_key(&key) {
                resolved.push(key);
            } else if decl.is_required() {
                return Err(unresolved(key));
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::Field;
    use crate::fields::{KeyBasedList, ListOfNodes};
    use crate::yaml;

    fn schemas() -> (Arc<NodeSchema>, Arc<NodeSchema>) {
        let group = NodeSchema::builder("Group")
            .field(Field::new("groupname").identity())
            .field(Field::new("desc").brief())
            .build()
            .unwrap();
        let project = NodeSchema::builder("Project")
            .field(Field::new("name").identity())
            .field(Field::new("groups").ftype(ListOfReferences::new(&group, ".groups")))
            .build()
            .unwrap();
        let root = NodeSchema::builder("Data")
            .field(Field::new("projects").ftype(KeyBasedList::new(&project)))
            .field(Field::new("groups").ftype(KeyBasedList::new(&group)))
            .build()
            .unwrap();
        (root, group)
    }

    #[test]
    fn references_resolve_forward_in_document_order() {
        // `projects` is declared and given before `groups`.
        let (root, _) = schemas();
        let doc = Document::new(
            &root,
            yaml::from_str(
                "projects:\n  p1:\n    groups: [admins]\ngroups:\n  admins: Admins\n",
            )
            .unwrap(),
        )
        .unwrap();
        let p1 = doc.root().keyed("projects").unwrap().get("p1").unwrap();
        let refs = p1.refs("groups").unwrap();
        assert!(refs.is_resolved());
        assert_eq!(refs.keys(), ["admins"]);
    }

    #[test]
    fn required_reference_must_resolve() {
        let (root, _) = schemas();
        let err = Document::new(
            &root,
            yaml::from_str("projects:\n  p1:\n    groups: [nobody]\ngroups:\n  admins: Admins\n")
                .unwrap(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "reference 'nobody' in field 'groups' of 'Project' does not resolve to a 'Group'"
        );
    }

    #[test]
    fn optional_reference_drops_missing_keys() {
        let group = NodeSchema::builder("Group")
            .field(Field::new("groupname").identity())
            .build()
            .unwrap();
        let user = NodeSchema::builder("User")
            .field(Field::new("username").identity())
            .field(Field::new("groups").ftype(ListOfReferences::new(&group, ".groups").optional()))
            .build()
            .unwrap();
        let root = NodeSchema::builder("Data")
            .field(Field::new("groups").ftype(KeyBasedList::new(&group)))
            .field(Field::new("users").ftype(KeyBasedList::new(&user)))
            .build()
            .unwrap();
        let doc = Document::new(
            &root,
            yaml::from_str("groups:\n  a: {}\nusers:\n  u1:\n    groups: [a, missing, a]\n")
                .unwrap(),
        )
        .unwrap();
        let u1 = doc.root().keyed("users").unwrap().get("u1").unwrap();
        // Missing key dropped, duplicates preserved, order kept.
        assert_eq!(u1.refs("groups").unwrap().keys(), ["a", "a"]);
    }

    #[test]
    fn optional_reference_without_collection_drops_all_keys() {
        let group = NodeSchema::builder("Group")
            .field(Field::new("groupname").identity())
            .build()
            .unwrap();
        let root = NodeSchema::builder("Data")
            .field(Field::new("groups").ftype(ListOfReferences::new(&group, ".nowhere").optional()))
            .build()
            .unwrap();
        let doc = Document::new(&root, yaml::from_str("groups: [a, b]").unwrap()).unwrap();
        let refs = doc.root().refs("groups").unwrap();
        assert!(refs.is_resolved());
        assert!(refs.keys().is_empty());
    }

    #[test]
    fn references_inside_node_list_elements_resolve() {
        let group = NodeSchema::builder("Group")
            .field(Field::new("groupname").identity())
            .build()
            .unwrap();
        let step = NodeSchema::builder("Step")
            .field(Field::new("run").brief())
            .field(Field::new("groups").ftype(ListOfReferences::new(&group, ".groups")))
            .build()
            .unwrap();
        let root = NodeSchema::builder("Data")
            .field(Field::new("groups").ftype(KeyBasedList::new(&group)))
            .field(Field::new("steps").ftype(ListOfNodes::nodes(&step)))
            .build()
            .unwrap();
        let doc = Document::new(
            &root,
            yaml::from_str(
                "groups:\n  admins: {}\nsteps:\n  - run: build\n    groups: [admins]\n",
            )
            .unwrap(),
        )
        .unwrap();
        let step = doc.root().nodes("steps").unwrap().get(0).unwrap();
        let refs = step.refs("groups").unwrap();
        assert!(refs.is_resolved());
        assert_eq!(refs.keys(), ["admins"]);
    }

    #[test]
    fn missing_collection_fails_required_references() {
        let group = NodeSchema::builder("Group")
            .field(Field::new("groupname").identity())
            .build()
            .unwrap();
        let root = NodeSchema::builder("Data")
            .field(Field::new("groups").ftype(ListOfReferences::new(&group, ".nowhere")))
            .build()
            .unwrap();
        let err = Document::new(&root, yaml::from_str("groups: [a]").unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "reference 'a' in field 'groups' of 'Data' does not resolve to a 'Group'"
        );
    }

    #[test]
    fn empty_reference_list_resolves_to_empty() {
        let (root, _) = schemas();
        let doc = Document::new(
            &root,
            yaml::from_str("projects:\n  p1:\n    groups: []\n").unwrap(),
        )
        .unwrap();
        let p1 = doc.root().keyed("projects").unwrap().get("p1").unwrap();
        assert!(p1.refs("groups").unwrap().keys().is_empty());
    }

    #[test]
    fn nearest_ancestor_collection_wins() {
        // A project carrying its own `groups` collection shadows the root's.
        let group = NodeSchema::builder("Group")
            .field(Field::new("groupname").identity())
            .build()
            .unwrap();
        let project = NodeSchema::builder("Project")
            .field(Field::new("name").identity())
            .field(Field::new("groups").ftype(KeyBasedList::new(&group)))
            .field(Field::new("wants").ftype(ListOfReferences::new(&group, ".groups")))
            .build()
            .unwrap();
        let root = NodeSchema::builder("Data")
            .field(Field::new("groups").ftype(KeyBasedList::new(&group)))
            .field(Field::new("projects").ftype(KeyBasedList::new(&project)))
            .build()
            .unwrap();
        let err = Document::new(
            &root,
            yaml::from_str(
                "groups:\n  global: {}\nprojects:\n  p1:\n    groups:\n      local: {}\n    wants: [global]\n",
            )
            .unwrap(),
        )
        .unwrap_err();
        // `global` only exists at the root; the project's own collection is
        // consulted first and the lookup fails there.
        assert!(err.to_string().contains("reference 'global'"));
    }
}
