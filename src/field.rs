use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fields::{KeyBasedList, ListOfNodes, ListOfReferences, RefSlot};
use crate::node::{BuildContext, ExtraData, Slot, StoredField};
use crate::schema::NodeSchema;
use crate::value::Value;

/// Custom validation predicate for a field. Returning false for the field's
/// value fails the whole node construction.
pub type ValidatorFn = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// The wrapper a custom validator is invoked with.
///
/// Besides the value itself it carries the field's `required` flag, so a
/// validator can accept an empty value on an optional field while rejecting
/// it on a required one.
pub struct FieldValue<'a> {
    value: &'a Value,
    required: bool,
}

impl FieldValue<'_> {
    pub fn get(&self) -> &Value {
        self.value
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Scalar coercion type for a field.
///
/// `Str` coerces any scalar to its string form, the way YAML authors expect
/// `version: 1` to satisfy a string field. `Float` widens integers. `Int` and
/// `Bool` are strict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    Str,
    Int,
    Float,
    Bool,
}

impl ScalarType {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ScalarType::Str => "string",
            ScalarType::Int => "integer",
            ScalarType::Float => "float",
            ScalarType::Bool => "bool",
        }
    }

    /// The value an absent field without a default falls back to.
    pub(crate) fn zero(self) -> Value {
        match self {
            ScalarType::Str => Value::Str(String::new()),
            ScalarType::Int => Value::Int(0),
            ScalarType::Float => Value::Float(0.0),
            ScalarType::Bool => Value::Bool(false),
        }
    }

    /// Coerce a raw value into this type, or report a mismatch with `None`.
    pub(crate) fn coerce(self, value: Value) -> Option<Value> {
        match (self, value) {
            (ScalarType::Str, Value::Str(v)) => Some(Value::Str(v)),
            (ScalarType::Str, Value::Int(v)) => Some(Value::Str(v.to_string())),
            (ScalarType::Str, Value::Float(v)) => Some(Value::Str(v.to_string())),
            (ScalarType::Str, Value::Bool(v)) => Some(Value::Str(v.to_string())),
            (ScalarType::Int, Value::Int(v)) => Some(Value::Int(v)),
            (ScalarType::Float, Value::Float(v)) => Some(Value::Float(v)),
            (ScalarType::Float, Value::Int(v)) => Some(Value::Float(v as f64)),
            (ScalarType::Bool, Value::Bool(v)) => Some(Value::Bool(v)),
            _ => None,
        }
    }
}

/// The declared type of a field: a scalar coercion type, or one of the
/// container/reference types from [`crate::fields`].
#[derive(Clone, Debug)]
pub enum FieldType {
    Scalar(ScalarType),
    ListOfNodes(ListOfNodes),
    KeyBasedList(KeyBasedList),
    ListOfReferences(ListOfReferences),
}

impl FieldType {
    pub(crate) fn empty_slot(&self) -> Slot {
        match self {
            FieldType::Scalar(t) => Slot::Value(t.zero()),
            FieldType::ListOfNodes(t) => t.empty(),
            FieldType::KeyBasedList(t) => t.empty(),
            FieldType::ListOfReferences(_) => Slot::Refs(RefSlot::default()),
        }
    }
}

impl From<ScalarType> for FieldType {
    fn from(t: ScalarType) -> Self {
        FieldType::Scalar(t)
    }
}

impl From<ListOfNodes> for FieldType {
    fn from(t: ListOfNodes) -> Self {
        FieldType::ListOfNodes(t)
    }
}

impl From<KeyBasedList> for FieldType {
    fn from(t: KeyBasedList) -> Self {
        FieldType::KeyBasedList(t)
    }
}

impl From<ListOfReferences> for FieldType {
    fn from(t: ListOfReferences) -> Self {
        FieldType::ListOfReferences(t)
    }
}

/// Declaration of one named slot on a node type.
///
/// Fields are declared with builder-style chains and collected, in order, by
/// [`NodeSchema::builder`][crate::NodeSchema::builder]. Declaration order is
/// the canonical field order.
///
/// ```
/// # use quick_scheme::{Field, ScalarType};
/// let field = Field::new("first_name").default_value("").required();
/// let count = Field::new("count").ftype(ScalarType::Int);
/// ```
#[derive(Clone)]
pub struct Field {
    name: String,
    ftype: FieldType,
    default: Option<Value>,
    required: bool,
    identity: bool,
    brief: bool,
    always: bool,
    validator: Option<ValidatorFn>,
}

impl Field {
    /// Declare a new field. The type defaults to [`ScalarType::Str`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ftype: FieldType::Scalar(ScalarType::Str),
            default: None,
            required: false,
            identity: false,
            brief: false,
            always: false,
            validator: None,
        }
    }

    /// Set the field's type.
    pub fn ftype(mut self, ftype: impl Into<FieldType>) -> Self {
        self.ftype = ftype.into();
        self
    }

    /// Set the value used when the field is absent from the raw data.
    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark the field required. This mainly informs custom validators, which
    /// receive the flag through [`FieldValue::is_required`].
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark this field as the node's natural key. At most one per schema.
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Mark this field as the target of brief syntax: when the node's whole
    /// raw value is a bare scalar, it is routed into this field.
    pub fn brief(mut self) -> Self {
        self.brief = true;
        self
    }

    /// Always emit this field in the normalized output, even when its value
    /// equals the default and was not explicitly present.
    pub fn always(mut self) -> Self {
        self.always = true;
        self
    }

    /// Attach a custom validation predicate.
    pub fn validator(
        mut self,
        validator: impl Fn(&FieldValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.ftype
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn is_brief(&self) -> bool {
        self.brief
    }

    pub fn is_always(&self) -> bool {
        self.always
    }

    /// Run the assignment pipeline for this field.
    ///
    /// `raw` is the field's sub-value, or `None` when absent from the raw
    /// data. Returns `None` when a do-set hook took full responsibility for
    /// recording the value, so nothing is stored under the field's name.
    ///
    /// Pipeline order for a present value: before-set hook, do-set hook,
    /// type coercion / container construction, custom validator, after-set
    /// hook, storage. For an absent value: on-not-set hook, then default /
    /// zero-value / empty-collection fallback, then the custom validator
    /// against the fallback value.
    pub(crate) fn assign(
        &self,
        owner: &NodeSchema,
        raw: Option<Value>,
        extra: &mut ExtraData,
        ctx: &mut BuildContext,
    ) -> Result<Option<StoredField>> {
        let hooks = owner.hooks(&self.name);
        match raw {
            Some(mut value) => {
                if let Some(hook) = hooks.and_then(|h| h.before_set()) {
                    value = hook(value);
                }
                if let Some(hook) = hooks.and_then(|h| h.do_set()) {
                    if hook(&value, &self.name, extra) {
                        return Ok(None);
                    }
                }
                let slot = self.realize(owner, value, ctx)?;
                self.check(owner, &slot)?;
                if let Some(hook) = hooks.and_then(|h| h.after_set()) {
                    match &slot {
                        Slot::Value(v) => {
                            hook(v, &self.name, extra);
                        }
                        other => {
                            let rendered = other.render();
                            hook(&rendered, &self.name, extra);
                        }
                    }
                }
                // Explicit presence always emits, even at the default value.
                Ok(Some(StoredField { slot, emit: true }))
            }
            None => {
                if let Some(hook) = hooks.and_then(|h| h.on_not_set()) {
                    hook(extra);
                }
                let (slot, emit) = match (&self.default, &self.ftype) {
                    (Some(default), _) => (Slot::Value(default.clone()), self.always),
                    (None, FieldType::Scalar(t)) => (Slot::Value(t.zero()), true),
                    (None, ftype) => (ftype.empty_slot(), self.always),
                };
                self.check(owner, &slot)?;
                Ok(Some(StoredField { slot, emit }))
            }
        }
    }

    fn realize(&self, owner: &NodeSchema, value: Value, ctx: &mut BuildContext) -> Result<Slot> {
        match &self.ftype {
            FieldType::Scalar(t) => {
                let actual = value.kind();
                match t.coerce(value) {
                    Some(coerced) => Ok(Slot::Value(coerced)),
                    None => Err(Error::WrongType {
                        field: self.name.clone(),
                        node: owner.name().to_string(),
                        expected: t.name(),
                        actual,
                    }),
                }
            }
            FieldType::ListOfNodes(t) => t.build(self, owner, value, ctx),
            FieldType::KeyBasedList(t) => t.build(self, owner, value, ctx),
            FieldType::ListOfReferences(t) => t.record(self, owner, value, ctx),
        }
    }

    /// Invoke the custom validator, if declared, against the stored value.
    fn check(&self, owner: &NodeSchema, slot: &Slot) -> Result<()> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };
        let rendered;
        let value = match slot {
            Slot::Value(v) => v,
            other => {
                rendered = other.render();
                &rendered
            }
        };
        let field_value = FieldValue {
            value,
            required: self.required,
        };
        if validator(&field_value) {
            Ok(())
        } else {
            Err(Error::FailedValidator {
                field: self.name.clone(),
                node: owner.name().to_string(),
            })
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("ftype", &self.ftype)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("identity", &self.identity)
            .field("brief", &self.brief)
            .field("always", &self.always)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scalar_coercion() {
        assert_eq!(
            ScalarType::Str.coerce(Value::Int(1)),
            Some(Value::Str("1".to_string()))
        );
        assert_eq!(ScalarType::Int.coerce(Value::Str("1".to_string())), None);
        assert_eq!(
            ScalarType::Float.coerce(Value::Int(2)),
            Some(Value::Float(2.0))
        );
        assert_eq!(ScalarType::Bool.coerce(Value::Int(1)), None);
    }

    #[test]
    fn zero_values() {
        assert_eq!(ScalarType::Str.zero(), Value::Str(String::new()));
        assert_eq!(ScalarType::Int.zero(), Value::Int(0));
        assert_eq!(ScalarType::Bool.zero(), Value::Bool(false));
    }

    #[test]
    fn builder_flags() {
        let field = Field::new("id").identity().required().always();
        assert_eq!(field.name(), "id");
        assert!(field.is_identity());
        assert!(field.is_required());
        assert!(field.is_always());
        assert!(!field.is_brief());
        assert!(field.default().is_none());
    }
}
