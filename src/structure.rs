//! Structural checks on the type graph, independent of constraints.
//!
//! Rejects shapes the serializer could not round-trip unambiguously and the
//! shapes the validator relies on never seeing (a map whose values are lists
//! of records). Each reachable type is inspected once.
use std::collections::HashSet;

use crate::error::BuildError;
use crate::shape::{field_path, FieldKind, Schema, TypeShape};

pub fn check(schema: &Schema, root: &str) -> Result<(), BuildError> {
    let mut visited = HashSet::new();
    let root_shape = schema.resolve(root, root)?;
    visit(schema, root_shape, &mut visited)
}

fn visit<'a>(schema: &'a Schema, shape: &'a TypeShape, visited: &mut HashSet<&'a str>) -> Result<(), BuildError> {
    if !visited.insert(shape.name.as_str()) {
        return Ok(());
    }

    let mut names = HashSet::new();
    for field in &shape.fields {
        if field.name.trim().is_empty() {
            return Err(BuildError::BlankFieldName { type_name: shape.name.clone() });
        }
        if !names.insert(field.name.as_str()) {
            return Err(BuildError::DuplicateField { type_name: shape.name.clone(), field: field.name.clone() });
        }
        let path = field_path(shape, field);
        check_kind(&field.kind, &path)?;
        if let Some(target) = field.kind.record_target() {
            visit(schema, schema.resolve(target, &path)?, visited)?;
        }
    }
    Ok(())
}

fn check_kind(kind: &FieldKind, path: &str) -> Result<(), BuildError> {
    match kind {
        FieldKind::Enum(values) => check_enum(values, path),
        FieldKind::List(element) => match element.as_ref() {
            FieldKind::List(_) | FieldKind::Map(_) => Err(nested(kind, path)),
            other => check_kind(other, path),
        },
        FieldKind::Map(value) => match value.as_ref() {
            FieldKind::Map(_) => Err(nested(kind, path)),
            FieldKind::List(element) if matches!(element.as_ref(), FieldKind::Record(_)) => {
                Err(BuildError::MapValueIsListOfRecords { field: path.to_string() })
            }
            other => check_kind(other, path),
        },
        _ => Ok(()),
    }
}

fn check_enum(values: &[String], path: &str) -> Result<(), BuildError> {
    if values.is_empty() {
        return Err(BuildError::EmptyEnum { field: path.to_string() });
    }
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(BuildError::DuplicateEnumValue { field: path.to_string(), value: value.clone() });
        }
    }
    Ok(())
}

fn nested(kind: &FieldKind, path: &str) -> BuildError {
    BuildError::NestedCollection { field: path.to_string(), kind: kind.describe() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::FieldShape;

    fn schema_with(fields: Vec<FieldShape>) -> Schema {
        let mut root = TypeShape::new("Root");
        root.fields = fields;
        Schema::new()
            .with(root)
            .with(TypeShape::new("Item").field(FieldShape::new("id", FieldKind::String)))
    }

    #[test]
    fn duplicate_field_names_rejected() {
        let schema = schema_with(vec![
            FieldShape::new("id", FieldKind::String),
            FieldShape::new("id", FieldKind::Number),
        ]);
        assert_eq!(
            check(&schema, "Root"),
            Err(BuildError::DuplicateField { type_name: "Root".into(), field: "id".into() })
        );
    }

    #[test]
    fn map_of_record_lists_rejected() {
        let schema = schema_with(vec![
            FieldShape::new("groups", FieldKind::map(FieldKind::list(FieldKind::record("Item")))),
        ]);
        assert_eq!(
            check(&schema, "Root"),
            Err(BuildError::MapValueIsListOfRecords { field: "Root.groups".into() })
        );
    }

    #[test]
    fn map_of_value_lists_allowed() {
        let schema = schema_with(vec![
            FieldShape::new("tags", FieldKind::map(FieldKind::list(FieldKind::String))),
            FieldShape::new("items", FieldKind::map(FieldKind::record("Item"))),
        ]);
        assert_eq!(check(&schema, "Root"), Ok(()));
    }

    #[test]
    fn duplicate_enum_values_rejected() {
        let schema = schema_with(vec![
            FieldShape::new("status", FieldKind::list(FieldKind::enumeration(["OK", "WARN", "OK"]))),
        ]);
        assert_eq!(
            check(&schema, "Root"),
            Err(BuildError::DuplicateEnumValue { field: "Root.status".into(), value: "OK".into() })
        );
    }

    #[test]
    fn unknown_nested_type_rejected() {
        let schema = schema_with(vec![FieldShape::new("other", FieldKind::record("Missing"))]);
        assert_eq!(
            check(&schema, "Root"),
            Err(BuildError::UnknownType { type_name: "Missing".into(), field: "Root.other".into() })
        );
    }

    #[test]
    fn list_of_lists_rejected() {
        let schema = schema_with(vec![
            FieldShape::new("matrix", FieldKind::list(FieldKind::list(FieldKind::Number))),
        ]);
        assert!(matches!(check(&schema, "Root"), Err(BuildError::NestedCollection { .. })));
    }
}
