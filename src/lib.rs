//! Constraint validation for bean-shaped data.
//!
//! A bean type is described once as a [`Schema`] (derived through [`Bean`] or
//! loaded from a [`SchemaDocument`]). Registering a root type runs every
//! build-time check: structure, constraint/kind consistency, regex
//! compilation. It then compiles a validator, or nothing when no constraint is
//! reachable. Validators are cached per root type and shared freely.
//!
//! ```ignore
//! let handle = beancheck::register::<Order>()?;
//! let errors = handle.validate(&order, false)?;
//! for e in &errors { println!("{}: {}", e.path, e.message()); }
//! ```
pub mod constraint;
pub mod consistency;
pub mod digits;
pub mod error;
pub mod errors;
pub mod jq_exec;
pub mod path_de;
pub mod plan;
pub mod registry;
pub mod shape;
pub mod structure;
pub mod validate;

pub use constraint::Constraints;
pub use error::{BuildError, ContractError};
pub use errors::{ValidationError, ValidationErrors, ValidationFailed};
pub use registry::{build, register, validate, ValidatorHandle, Validators};
pub use shape::{schema_of, Bean, FieldKind, FieldShape, ScalarKind, Schema, SchemaDocument, Shapes, TypeShape};
