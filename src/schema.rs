use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::field::{Field, FieldType};
use crate::node::{BuildContext, ExtraData, SchemeNode};
use crate::value::Value;

/// Transforms a raw value before typing and validation.
pub type BeforeSetHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;
/// Takes over recording a value. Returning true means the hook has stored the
/// value itself (typically in the extra-data bag) and the pipeline stores
/// nothing under the field's name.
pub type DoSetHook = Arc<dyn Fn(&Value, &str, &mut ExtraData) -> bool + Send + Sync>;
/// Observes the final value after storage was decided; may stash derived
/// values in the extra-data bag. The return value reports whether it did.
pub type AfterSetHook = Arc<dyn Fn(&Value, &str, &mut ExtraData) -> bool + Send + Sync>;
/// Runs when the field is absent from the raw data, before the default or
/// zero-value fallback (which still applies).
pub type OnNotSetHook = Arc<dyn Fn(&mut ExtraData) + Send + Sync>;

/// The set of lifecycle hooks registered for one field.
#[derive(Clone, Default)]
pub struct FieldHooks {
    before_set: Option<BeforeSetHook>,
    do_set: Option<DoSetHook>,
    after_set: Option<AfterSetHook>,
    on_not_set: Option<OnNotSetHook>,
}

impl FieldHooks {
    pub(crate) fn before_set(&self) -> Option<&(dyn Fn(Value) -> Value + Send + Sync)> {
        self.before_set.as_deref()
    }

    pub(crate) fn do_set(
        &self,
    ) -> Option<&(dyn Fn(&Value, &str, &mut ExtraData) -> bool + Send + Sync)> {
        self.do_set.as_deref()
    }

    pub(crate) fn after_set(
        &self,
    ) -> Option<&(dyn Fn(&Value, &str, &mut ExtraData) -> bool + Send + Sync)> {
        self.after_set.as_deref()
    }

    pub(crate) fn on_not_set(&self) -> Option<&(dyn Fn(&mut ExtraData) + Send + Sync)> {
        self.on_not_set.as_deref()
    }
}

/// The declared contract of one node type: an ordered field list, the
/// open/closed flag, the output ordering flag, and the per-field hook table.
///
/// A schema is registered once through [`NodeSchema::builder`], checked for
/// consistency at [`build`][SchemaBuilder::build] time, and then shared
/// immutably as an `Arc` by every node instance and every container field
/// type that targets it. It is safe to read from any number of threads.
pub struct NodeSchema {
    name: String,
    fields: Vec<Field>,
    allow_undefined: bool,
    preserve_order: bool,
    hooks: HashMap<String, FieldHooks>,
    identity: Option<usize>,
    brief: Option<usize>,
}

impl NodeSchema {
    /// Start declaring a node type with the given type name.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            allow_undefined: false,
            preserve_order: false,
            hooks: HashMap::new(),
        }
    }

    /// The node type's name, as reported by every instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The effective field declarations, in canonical order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Whether undeclared keys pass through instead of failing construction.
    pub fn allow_undefined(&self) -> bool {
        self.allow_undefined
    }

    /// Whether normalized output follows document order rather than field
    /// declaration order.
    pub fn preserve_order(&self) -> bool {
        self.preserve_order
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn identity_field(&self) -> Option<&Field> {
        self.identity.map(|i| &self.fields[i])
    }

    pub fn brief_field(&self) -> Option<&Field> {
        self.brief.map(|i| &self.fields[i])
    }

    pub(crate) fn hooks(&self, field: &str) -> Option<&FieldHooks> {
        self.hooks.get(field)
    }

    /// Build a single node tree from a raw value, outside of any document.
    ///
    /// Reference fields record their keys but stay unresolved; resolution is
    /// a distinct pass performed by [`Document::new`][crate::Document::new].
    pub fn build(self: &Arc<Self>, data: Value) -> Result<SchemeNode> {
        let mut ctx = BuildContext::default();
        SchemeNode::build(self, data, None, &mut ctx)
    }

    /// Build a single node tree with `key` injected as the identity field's
    /// value, the way [`KeyBasedList`][crate::KeyBasedList] entries are built.
    pub fn build_entry(self: &Arc<Self>, key: &str, data: Value) -> Result<SchemeNode> {
        let mut ctx = BuildContext::default();
        SchemeNode::build(self, data, Some(key), &mut ctx)
    }
}

impl fmt::Debug for NodeSchema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NodeSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("allow_undefined", &self.allow_undefined)
            .field("preserve_order", &self.preserve_order)
            .finish()
    }
}

/// Builder for a [`NodeSchema`]. Fields are collected in declaration order;
/// [`build`][Self::build] checks every schema invariant before the type can
/// be used.
pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
    allow_undefined: bool,
    preserve_order: bool,
    hooks: HashMap<String, FieldHooks>,
}

impl SchemaBuilder {
    /// Append a field declaration.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Make the schema open: undeclared keys pass through verbatim.
    pub fn allow_undefined(mut self) -> Self {
        self.allow_undefined = true;
        self
    }

    /// Emit normalized output in document order instead of declaration order.
    pub fn preserve_order(mut self) -> Self {
        self.preserve_order = true;
        self
    }

    /// Register a before-set hook for the named field.
    pub fn before_set(
        mut self,
        field: impl Into<String>,
        hook: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.hooks.entry(field.into()).or_default().before_set = Some(Arc::new(hook));
        self
    }

    /// Register a do-set hook for the named field.
    pub fn do_set(
        mut self,
        field: impl Into<String>,
        hook: impl Fn(&Value, &str, &mut ExtraData) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.hooks.entry(field.into()).or_default().do_set = Some(Arc::new(hook));
        self
    }

    /// Register an after-set hook for the named field.
    pub fn after_set(
        mut self,
        field: impl Into<String>,
        hook: impl Fn(&Value, &str, &mut ExtraData) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.hooks.entry(field.into()).or_default().after_set = Some(Arc::new(hook));
        self
    }

    /// Register an on-not-set hook for the named field.
    pub fn on_not_set(
        mut self,
        field: impl Into<String>,
        hook: impl Fn(&mut ExtraData) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.entry(field.into()).or_default().on_not_set = Some(Arc::new(hook));
        self
    }

    /// Check every schema invariant and register the type.
    ///
    /// Fails on: duplicate field names, more than one identity field, more
    /// than one brief field, a hook naming an undeclared field, or a keyed
    /// or reference field whose target schema has no identity field.
    pub fn build(self) -> Result<Arc<NodeSchema>> {
        let fail = |reason: String| Error::InvalidSchema {
            schema: self.name.clone(),
            reason,
        };

        let mut identity = None;
        let mut brief = None;
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(fail(format!("duplicate field '{}'", field.name())));
            }
            if field.is_identity() {
                if identity.is_some() {
                    return Err(fail(format!(
                        "field '{}' is a second identity field",
                        field.name()
                    )));
                }
                identity = Some(i);
            }
            if field.is_brief() {
                if brief.is_some() {
                    return Err(fail(format!(
                        "field '{}' is a second brief field",
                        field.name()
                    )));
                }
                brief = Some(i);
            }
            let target = match field.field_type() {
                FieldType::KeyBasedList(t) => Some(t.schema()),
                FieldType::ListOfReferences(t) => Some(t.target()),
                _ => None,
            };
            if let Some(target) = target {
                if target.identity_field().is_none() {
                    return Err(fail(format!(
                        "field '{}' targets '{}', which has no identity field",
                        field.name(),
                        target.name()
                    )));
                }
            }
        }

        for hook_field in self.hooks.keys() {
            if !self.fields.iter().any(|f| f.name() == hook_field) {
                return Err(fail(format!("hook names undeclared field '{hook_field}'")));
            }
        }

        Ok(Arc::new(NodeSchema {
            name: self.name,
            fields: self.fields,
            allow_undefined: self.allow_undefined,
            preserve_order: self.preserve_order,
            hooks: self.hooks,
            identity,
            brief,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fields::{KeyBasedList, ListOfReferences};

    #[test]
    fn duplicate_field_rejected() {
        let err = NodeSchema::builder("Dup")
            .field(Field::new("name"))
            .field(Field::new("name"))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "schema 'Dup': duplicate field 'name'");
    }

    #[test]
    fn second_identity_rejected() {
        let err = NodeSchema::builder("Two")
            .field(Field::new("a").identity())
            .field(Field::new("b").identity())
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema 'Two': field 'b' is a second identity field"
        );
    }

    #[test]
    fn second_brief_rejected() {
        assert!(NodeSchema::builder("Two")
            .field(Field::new("a").brief())
            .field(Field::new("b").brief())
            .build()
            .is_err());
    }

    #[test]
    fn hook_on_undeclared_field_rejected() {
        let err = NodeSchema::builder("Hooked")
            .field(Field::new("name"))
            .before_set("missing", |v| v)
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema 'Hooked': hook names undeclared field 'missing'"
        );
    }

    #[test]
    fn keyed_target_needs_identity() {
        let entry = NodeSchema::builder("Entry")
            .field(Field::new("name"))
            .build()
            .unwrap();
        let err = NodeSchema::builder("Root")
            .field(Field::new("entries").ftype(KeyBasedList::new(&entry)))
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema 'Root': field 'entries' targets 'Entry', which has no identity field"
        );
    }

    #[test]
    fn reference_target_needs_identity() {
        let entry = NodeSchema::builder("Entry")
            .field(Field::new("name"))
            .build()
            .unwrap();
        assert!(NodeSchema::builder("Root")
            .field(Field::new("entries").ftype(ListOfReferences::new(&entry, ".entries")))
            .build()
            .is_err());
    }

    #[test]
    fn introspection() {
        let schema = NodeSchema::builder("Item")
            .field(Field::new("id").identity())
            .field(Field::new("desc").brief())
            .allow_undefined()
            .build()
            .unwrap();
        assert_eq!(schema.name(), "Item");
        assert_eq!(schema.fields().len(), 2);
        assert!(schema.allow_undefined());
        assert!(!schema.preserve_order());
        assert_eq!(schema.identity_field().map(Field::name), Some("id"));
        assert_eq!(schema.brief_field().map(Field::name), Some("desc"));
    }
}
