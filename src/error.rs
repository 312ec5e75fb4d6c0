//! Build-time (schema) and run-time (caller contract) failures.
//!
//! Constraint violations found in an instance are NOT errors here; they are
//! collected in [`crate::errors::ValidationErrors`].

use thiserror::Error;

/// A schema that cannot be turned into a validator. Always fatal for the root type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("field with default value must have not_null, field={field}, fieldType={kind}")]
    DefaultValueMissingNotNull { field: String, kind: String },

    #[error("{constraint} must on {expected}, field={field}, fieldType={kind}")]
    ConstraintKindMismatch {
        constraint: &'static str,
        expected: &'static str,
        field: String,
        kind: String,
    },

    #[error("pattern has invalid regex, pattern={pattern}, field={field}: {reason}")]
    InvalidPattern { pattern: String, field: String, reason: String },

    #[error("unknown type referenced, type={type_name}, field={field}")]
    UnknownType { type_name: String, field: String },

    #[error("found duplicate field, type={type_name}, field={field}")]
    DuplicateField { type_name: String, field: String },

    #[error("field name must not be blank, type={type_name}")]
    BlankFieldName { type_name: String },

    #[error("found duplicate enum value, field={field}, value={value}")]
    DuplicateEnumValue { field: String, value: String },

    #[error("enum must declare at least one value, field={field}")]
    EmptyEnum { field: String },

    #[error("map value must not be a list of records, field={field}")]
    MapValueIsListOfRecords { field: String },

    #[error("collection must not directly contain a collection, field={field}, fieldType={kind}")]
    NestedCollection { field: String, kind: String },

    #[error("declared field is not written by serialization, type={type_name}, field={field}")]
    UnknownField { type_name: String, field: String },

    #[error("failed to build default instance, type={type_name}: {reason}")]
    DefaultInstance { type_name: String, reason: String },
}

/// Caller-contract violations: the instance handed to a validator does not
/// have the shape the validator was built for. These are programming errors.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("validator built for `{expected}` invoked with `{found}`")]
    TypeMismatch { expected: String, found: &'static str },

    #[error("expected an object at `{path}`, found {found}")]
    NotAnObject { path: String, found: &'static str },

    #[error("field `{path}` declared as {expected}, found {found}")]
    KindMismatch { path: String, expected: &'static str, found: &'static str },

    #[error("failed to serialize instance: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Short JSON type name for diagnostics.
pub(crate) fn json_kind(v: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}
