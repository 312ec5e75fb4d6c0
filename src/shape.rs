//! Structural description of bean types.
//!
//! A [`Schema`] is a table of named record types. Nested records are
//! referenced by name, so self-referential graphs can be described without
//! boxing cycles. Typed beans derive their schema through [`Bean`] and the
//! [`Shapes`] builder; untyped callers deserialize a [`SchemaDocument`].
use std::any::type_name;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constraint::Constraints;
use crate::error::BuildError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Boolean,
    Temporal,                // dates, times, instants; opaque to validation
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar(ScalarKind),
    String,
    Number,
    Enum(Vec<String>),       // declared wire values
    List(Box<FieldKind>),
    Map(Box<FieldKind>),     // string keys
    Record(String),          // type name, resolved through the schema
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldShape {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeShape {
    #[serde(default, skip_serializing)]
    pub name: String,
    pub fields: Vec<FieldShape>,     // declaration order drives error order
    /// JSON image of a zero-value instance. `None` means every field defaults to null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    types: IndexMap<String, TypeShape>,
}

/// On-disk form: `{ "root": "Order", "types": { "Order": { "fields": [...] } } }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub root: Option<String>,
    pub types: IndexMap<String, TypeShape>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl FieldKind {
    pub fn list(element: FieldKind) -> Self { FieldKind::List(Box::new(element)) }
    pub fn map(value: FieldKind) -> Self { FieldKind::Map(Box::new(value)) }
    pub fn record(name: impl Into<String>) -> Self { FieldKind::Record(name.into()) }
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldKind::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Terminal for recursion: never descended into for nested-field checks.
    pub fn is_value_leaf(&self) -> bool {
        matches!(self, FieldKind::Scalar(_) | FieldKind::String | FieldKind::Number | FieldKind::Enum(_))
    }

    /// The record type nested validation would descend into, if any.
    /// `List<T>` and `Map<String, T>` yield `T`; `Map<String, List<T>>` yields `T`.
    pub fn record_target(&self) -> Option<&str> {
        match self {
            FieldKind::Record(name) => Some(name),
            FieldKind::List(element) => element.as_record(),
            FieldKind::Map(value) => match value.as_ref() {
                FieldKind::List(element) => element.as_record(),
                other => other.as_record(),
            },
            _ => None,
        }
    }

    fn as_record(&self) -> Option<&str> {
        match self { FieldKind::Record(name) => Some(name), _ => None }
    }

    /// Human-readable type for diagnostics, e.g. `List<Money>`.
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Scalar(ScalarKind::Boolean) => "Boolean".into(),
            FieldKind::Scalar(ScalarKind::Temporal) => "Temporal".into(),
            FieldKind::String => "String".into(),
            FieldKind::Number => "Number".into(),
            FieldKind::Enum(_) => "Enum".into(),
            FieldKind::List(element) => format!("List<{}>", element.describe()),
            FieldKind::Map(value) => format!("Map<String, {}>", value.describe()),
            FieldKind::Record(name) => short_name(name).to_string(),
        }
    }
}

impl FieldShape {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, constraints: Constraints::default() }
    }

    pub fn with(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }
}

impl TypeShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn field(mut self, field: FieldShape) -> Self {
        self.fields.push(field);
        self
    }

    pub fn defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Default value of a field; missing entries count as null.
    pub fn default_of(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.defaults.as_ref().and_then(|d| d.get(field)).unwrap_or(&NULL)
    }
}

impl Schema {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, shape: TypeShape) -> &mut Self {
        self.types.insert(shape.name.clone(), shape);
        self
    }

    pub fn with(mut self, shape: TypeShape) -> Self {
        self.insert(shape);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeShape> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeShape> {
        self.types.values()
    }

    /// Resolve a type referenced from `field`; unknown names are schema errors.
    pub fn resolve(&self, name: &str, field: &str) -> Result<&TypeShape, BuildError> {
        self.types.get(name).ok_or_else(|| BuildError::UnknownType {
            type_name: name.to_string(),
            field: field.to_string(),
        })
    }
}

impl SchemaDocument {
    /// Split into the type table and the declared root (first type when unspecified).
    pub fn into_schema(self) -> (Schema, Option<String>) {
        let root = self.root.or_else(|| self.types.keys().next().cloned());
        let types = self.types
            .into_iter()
            .map(|(name, mut shape)| {
                shape.name = name.clone();
                (name, shape)
            })
            .collect();
        (Schema { types }, root)
    }
}

/// `a::b::Order` → `Order`
pub(crate) fn short_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// Qualified field name for diagnostics, e.g. `Order.billing`.
pub(crate) fn field_path(shape: &TypeShape, field: &FieldShape) -> String {
    format!("{}.{}", short_name(&shape.name), field.name)
}

// ————————————————————————————————————————————————————————————————————————————
// TYPED BEANS
// ————————————————————————————————————————————————————————————————————————————

/// A record type that can describe its own shape.
///
/// `Default` supplies the zero-value instance used to detect fields whose
/// default is always present; `Serialize` supplies the instance image the
/// validator reads.
///
/// Every name returned by `fields` must be a key of the serialized default
/// instance, so fields skipped on serialization (`skip_serializing_if`) must
/// still be written for `T::default()`. Renamed fields are declared under
/// their serialized name.
pub trait Bean: Serialize + Default + 'static {
    fn fields(shapes: &mut Shapes) -> Vec<FieldShape>;
}

/// Collects the shapes of a bean and every bean it mentions.
#[derive(Default)]
pub struct Shapes {
    schema: Schema,
    error: Option<BuildError>,
}

impl Shapes {
    /// Reference a nested bean, registering its shape on first mention.
    pub fn record<T: Bean>(&mut self) -> FieldKind {
        let name = type_name::<T>();
        if self.schema.get(name).is_none() {
            // placeholder first so self-references terminate
            self.schema.insert(TypeShape::new(name));
            let fields = T::fields(self);
            let defaults = match serde_json::to_value(T::default()) {
                Ok(Value::Object(map)) => Some(map),
                Ok(other) => {
                    self.fail(BuildError::DefaultInstance {
                        type_name: name.to_string(),
                        reason: format!("serialized as {}, expected object", crate::error::json_kind(&other)),
                    });
                    None
                }
                Err(error) => {
                    self.fail(BuildError::DefaultInstance { type_name: name.to_string(), reason: error.to_string() });
                    None
                }
            };
            // declared names must be the keys serde writes
            if let Some(image) = &defaults {
                if let Some(field) = fields.iter().find(|f| !image.contains_key(&f.name)) {
                    self.fail(BuildError::UnknownField {
                        type_name: name.to_string(),
                        field: field.name.clone(),
                    });
                }
            }
            if let Some(shape) = self.schema.types.get_mut(name) {
                shape.fields = fields;
                shape.defaults = defaults;
            }
        }
        FieldKind::Record(name.to_string())
    }

    fn fail(&mut self, error: BuildError) {
        if self.error.is_none() { self.error = Some(error); }
    }

    fn finish(self) -> Result<Schema, BuildError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.schema),
        }
    }
}

/// Derive the schema rooted at `T`. The root's type name is `type_name::<T>()`.
pub fn schema_of<T: Bean>() -> Result<Schema, BuildError> {
    let mut shapes = Shapes::default();
    shapes.record::<T>();
    shapes.finish()
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize, Default)]
    struct Node {
        label: Option<String>,
        children: Vec<Node>,
    }

    impl Bean for Node {
        fn fields(shapes: &mut Shapes) -> Vec<FieldShape> {
            vec![
                FieldShape::new("label", FieldKind::String).with(Constraints::new().not_blank()),
                FieldShape::new("children", FieldKind::list(shapes.record::<Node>()))
                    .with(Constraints::new().not_null()),
            ]
        }
    }

    #[test]
    fn self_referential_bean_registers_once() {
        let schema = schema_of::<Node>().unwrap();
        assert_eq!(schema.types().count(), 1);
        let node = schema.get(type_name::<Node>()).unwrap();
        assert_eq!(node.fields.len(), 2);
        assert_eq!(node.default_of("children"), &json!([]));
        assert_eq!(node.default_of("label"), &Value::Null);
        assert_eq!(node.default_of("missing"), &Value::Null);
    }

    #[derive(Serialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct Renamed {
        order_id: Option<String>,
        tag_list: Vec<String>,
    }

    impl Bean for Renamed {
        fn fields(_: &mut Shapes) -> Vec<FieldShape> {
            vec![
                FieldShape::new("order_id", FieldKind::String).with(Constraints::new().not_null()),
                FieldShape::new("tag_list", FieldKind::list(FieldKind::String))
                    .with(Constraints::new().size(None, Some(1))),
            ]
        }
    }

    #[derive(Serialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct RenamedDeclared {
        order_id: Option<String>,
    }

    impl Bean for RenamedDeclared {
        fn fields(_: &mut Shapes) -> Vec<FieldShape> {
            vec![FieldShape::new("orderId", FieldKind::String).with(Constraints::new().not_null())]
        }
    }

    #[test]
    fn declared_names_must_match_serialized_keys() {
        match schema_of::<Renamed>() {
            Err(BuildError::UnknownField { type_name, field }) => {
                assert_eq!(type_name, std::any::type_name::<Renamed>());
                assert_eq!(field, "order_id");
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
        let schema = schema_of::<RenamedDeclared>().unwrap();
        let shape = schema.get(type_name::<RenamedDeclared>()).unwrap();
        assert_eq!(shape.fields[0].name, "orderId");
    }

    #[test]
    fn record_target_unwraps_containers() {
        assert_eq!(FieldKind::list(FieldKind::record("Money")).record_target(), Some("Money"));
        assert_eq!(FieldKind::map(FieldKind::list(FieldKind::record("Money"))).record_target(), Some("Money"));
        assert_eq!(FieldKind::map(FieldKind::String).record_target(), None);
        assert_eq!(FieldKind::list(FieldKind::list(FieldKind::record("Money"))).record_target(), None);
    }

    #[test]
    fn document_root_defaults_to_first_type() {
        let doc: SchemaDocument = serde_json::from_value(json!({
            "types": {
                "Order": { "fields": [
                    { "name": "id", "kind": "string", "constraints": { "not_null": {} } },
                    { "name": "lines", "kind": { "list": { "record": "Line" } } }
                ]},
                "Line": { "fields": [ { "name": "qty", "kind": "number" } ] }
            }
        })).unwrap();
        let (schema, root) = doc.into_schema();
        assert_eq!(root.as_deref(), Some("Order"));
        assert_eq!(schema.get("Line").unwrap().name, "Line");
        assert_eq!(
            schema.get("Order").unwrap().fields[1].kind,
            FieldKind::list(FieldKind::record("Line"))
        );
    }

    #[test]
    fn describe_reads_like_a_declaration() {
        let kind = FieldKind::map(FieldKind::list(FieldKind::record("a::b::Money")));
        assert_eq!(kind.describe(), "Map<String, List<Money>>");
    }
}
