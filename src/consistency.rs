//! Build-time consistency between declared constraints and field kinds.
//!
//! Depth-first over every record reachable from the root. Revisited types are
//! skipped, which also cuts cycles. Pattern constraints are compiled here so an
//! unparsable regex fails registration instead of the first validation.
use std::collections::HashSet;
use regex::Regex;

use crate::error::BuildError;
use crate::shape::{field_path, FieldKind, FieldShape, Schema, TypeShape};

pub fn check(schema: &Schema, root: &str) -> Result<(), BuildError> {
    let mut visited = HashSet::new();
    visit(schema, schema.resolve(root, root)?, &mut visited)
}

fn visit<'a>(schema: &'a Schema, shape: &'a TypeShape, visited: &mut HashSet<&'a str>) -> Result<(), BuildError> {
    if !visited.insert(shape.name.as_str()) {
        return Ok(());
    }
    for field in &shape.fields {
        check_field(shape, field)?;
        if let Some(target) = field.kind.record_target() {
            let path = field_path(shape, field);
            visit(schema, schema.resolve(target, &path)?, visited)?;
        }
    }
    Ok(())
}

fn check_field(shape: &TypeShape, field: &FieldShape) -> Result<(), BuildError> {
    let c = &field.constraints;
    let kind = &field.kind;
    let mismatch = |constraint: &'static str, expected: &'static str| BuildError::ConstraintKindMismatch {
        constraint,
        expected,
        field: field_path(shape, field),
        kind: kind.describe(),
    };

    if c.not_null.is_none() && !shape.default_of(&field.name).is_null() {
        return Err(BuildError::DefaultValueMissingNotNull {
            field: field_path(shape, field),
            kind: kind.describe(),
        });
    }

    let is_string = matches!(kind, FieldKind::String);
    let is_number = matches!(kind, FieldKind::Number);

    if c.size.is_some() && !matches!(kind, FieldKind::String | FieldKind::List(_) | FieldKind::Map(_)) {
        return Err(mismatch("size", "String, List or Map"));
    }
    if c.not_blank.is_some() && !is_string {
        return Err(mismatch("not_blank", "String"));
    }
    if let Some(pattern) = &c.pattern {
        if !is_string {
            return Err(mismatch("pattern", "String"));
        }
        if let Err(error) = Regex::new(&pattern.regex) {
            return Err(BuildError::InvalidPattern {
                pattern: pattern.regex.clone(),
                field: field_path(shape, field),
                reason: error.to_string(),
            });
        }
    }
    if c.min.is_some() && !is_number { return Err(mismatch("min", "Number")); }
    if c.max.is_some() && !is_number { return Err(mismatch("max", "Number")); }
    if c.digits.is_some() && !is_number { return Err(mismatch("digits", "Number")); }
    Ok(())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraints;
    use serde_json::json;

    fn root(fields: Vec<FieldShape>) -> Schema {
        let mut shape = TypeShape::new("Bean");
        shape.fields = fields;
        Schema::new().with(shape)
    }

    #[test]
    fn size_on_number_is_mismatch() {
        let schema = root(vec![
            FieldShape::new("count", FieldKind::Number).with(Constraints::new().size(Some(1), None)),
        ]);
        assert_eq!(
            check(&schema, "Bean"),
            Err(BuildError::ConstraintKindMismatch {
                constraint: "size",
                expected: "String, List or Map",
                field: "Bean.count".into(),
                kind: "Number".into(),
            })
        );
    }

    #[test]
    fn not_blank_and_pattern_only_on_strings() {
        let schema = root(vec![
            FieldShape::new("tags", FieldKind::list(FieldKind::String)).with(Constraints::new().not_blank()),
        ]);
        assert!(matches!(check(&schema, "Bean"), Err(BuildError::ConstraintKindMismatch { constraint: "not_blank", .. })));

        let schema = root(vec![
            FieldShape::new("flag", FieldKind::Scalar(crate::shape::ScalarKind::Boolean))
                .with(Constraints::new().pattern("true")),
        ]);
        assert!(matches!(check(&schema, "Bean"), Err(BuildError::ConstraintKindMismatch { constraint: "pattern", .. })));
    }

    #[test]
    fn numeric_constraints_only_on_numbers() {
        for constraints in [
            Constraints::new().min(0.0),
            Constraints::new().max(10.0),
            Constraints::new().digits(Some(3), Some(2)),
        ] {
            let schema = root(vec![FieldShape::new("name", FieldKind::String).with(constraints)]);
            assert!(matches!(check(&schema, "Bean"), Err(BuildError::ConstraintKindMismatch { expected: "Number", .. })));
        }
    }

    #[test]
    fn invalid_regex_fails_at_build() {
        let schema = root(vec![
            FieldShape::new("code", FieldKind::String).with(Constraints::new().pattern("[a-z")),
        ]);
        match check(&schema, "Bean") {
            Err(BuildError::InvalidPattern { pattern, field, .. }) => {
                assert_eq!(pattern, "[a-z");
                assert_eq!(field, "Bean.code");
            }
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn default_value_requires_not_null() {
        let mut shape = TypeShape::new("Bean")
            .field(FieldShape::new("items", FieldKind::list(FieldKind::String)));
        shape.defaults = json!({ "items": [] }).as_object().cloned();
        let schema = Schema::new().with(shape.clone());
        assert_eq!(
            check(&schema, "Bean"),
            Err(BuildError::DefaultValueMissingNotNull { field: "Bean.items".into(), kind: "List<String>".into() })
        );

        shape.fields[0].constraints = Constraints::new().not_null();
        assert_eq!(check(&Schema::new().with(shape), "Bean"), Ok(()));
    }

    #[test]
    fn nested_types_are_checked() {
        let schema = root(vec![FieldShape::new("lines", FieldKind::map(FieldKind::record("Line")))])
            .with(TypeShape::new("Line").field(
                FieldShape::new("qty", FieldKind::String).with(Constraints::new().min(1.0)),
            ));
        assert!(matches!(
            check(&schema, "Bean"),
            Err(BuildError::ConstraintKindMismatch { ref field, .. }) if field == "Line.qty"
        ));
    }

    #[test]
    fn cyclic_graph_terminates() {
        let schema = Schema::new()
            .with(TypeShape::new("A").field(FieldShape::new("b", FieldKind::record("B"))))
            .with(TypeShape::new("B").field(
                FieldShape::new("a", FieldKind::list(FieldKind::record("A"))).with(Constraints::new().size(None, Some(3))),
            ));
        assert_eq!(check(&schema, "A"), Ok(()));
    }
}
