//! Built validators, cached for the life of the process.
//!
//! Building runs once per root type: concurrent first requests for the same
//! type wait on one build and all receive the same published handle. The map
//! lock is only held to fetch the per-type cell, never during a build. A
//! failed build publishes nothing, so a retry fails the same way.
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{BuildError, ContractError};
use crate::errors::ValidationErrors;
use crate::plan::{self, Plan};
use crate::shape::{schema_of, short_name, Bean, Schema};
use crate::{consistency, structure};
use crate::validate as executor;

// ————————————————————————————————————————————————————————————————————————————
// HANDLE
// ————————————————————————————————————————————————————————————————————————————

/// Cheap to clone; immutable after construction and safe to share across threads.
#[derive(Clone, Debug)]
pub struct ValidatorHandle {
    inner: Arc<Compiled>,
}

#[derive(Debug)]
struct Compiled {
    root: String,
    type_id: Option<TypeId>,
    plan: Option<Plan>,          // None: nothing to check
}

impl ValidatorHandle {
    pub fn root(&self) -> &str { &self.inner.root }

    /// True when the root type has no reachable constraint.
    pub fn is_noop(&self) -> bool { self.inner.plan.is_none() }

    /// Validate a JSON image of the root type.
    pub fn validate_value(&self, instance: &Value, partial: bool) -> Result<ValidationErrors, ContractError> {
        let mut errors = ValidationErrors::new();
        if let Some(plan) = &self.inner.plan {
            executor::run(plan, instance, partial, &mut errors)?;
        }
        Ok(errors)
    }

    /// Validate a typed bean. The handle must have been built for `T`.
    pub fn validate<T: Bean>(&self, bean: &T, partial: bool) -> Result<ValidationErrors, ContractError> {
        if self.inner.type_id.is_some_and(|id| id != TypeId::of::<T>()) {
            return Err(ContractError::TypeMismatch { expected: self.inner.root.clone(), found: type_name::<T>() });
        }
        if self.is_noop() {
            return Ok(ValidationErrors::new());
        }
        let instance = serde_json::to_value(bean)?;
        self.validate_value(&instance, partial)
    }
}

/// Run every build-time check and compile. Uncached.
pub fn build(schema: &Schema, root: &str) -> Result<ValidatorHandle, BuildError> {
    build_for(schema, root, None)
}

fn build_for(schema: &Schema, root: &str, type_id: Option<TypeId>) -> Result<ValidatorHandle, BuildError> {
    let result = structure::check(schema, root)
        .and_then(|_| consistency::check(schema, root))
        .and_then(|_| plan::compile(schema, root));
    let plan = match result {
        Ok(plan) => plan,
        Err(error) => {
            tracing::warn!(root = short_name(root), %error, "validator build failed");
            return Err(error);
        }
    };
    match &plan {
        Some(plan) => tracing::debug!(
            root = short_name(root),
            records = plan.records.len(),
            fields = plan.field_count(),
            patterns = plan.pattern_count(),
            "built validator"
        ),
        None => tracing::debug!(root = short_name(root), "no reachable constraint, validation skipped"),
    }
    Ok(ValidatorHandle {
        inner: Arc::new(Compiled { root: root.to_string(), type_id, plan }),
    })
}

// ————————————————————————————————————————————————————————————————————————————
// CACHE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Key {
    Type(TypeId),
    Named(String),
}

#[derive(Default)]
pub struct Validators {
    cells: Mutex<HashMap<Key, Arc<OnceCell<ValidatorHandle>>>>,
}

impl Validators {
    pub fn new() -> Self { Self::default() }

    /// Idempotent: later calls return the handle built by the first.
    pub fn register<T: Bean>(&self) -> Result<ValidatorHandle, BuildError> {
        self.get_or_build(Key::Type(TypeId::of::<T>()), || {
            let schema = schema_of::<T>()?;
            build_for(&schema, type_name::<T>(), Some(TypeId::of::<T>()))
        })
    }

    /// Register an untyped schema under its root name. Names share one
    /// namespace: the first schema registered for a name is the one kept.
    pub fn register_named(&self, schema: &Schema, root: &str) -> Result<ValidatorHandle, BuildError> {
        self.get_or_build(Key::Named(root.to_string()), || build(schema, root))
    }

    pub fn len(&self) -> usize {
        self.cells.lock().values().filter(|cell| cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn get_or_build<F>(&self, key: Key, build: F) -> Result<ValidatorHandle, BuildError>
    where
        F: FnOnce() -> Result<ValidatorHandle, BuildError>,
    {
        let cell = {
            let mut cells = self.cells.lock();
            Arc::clone(cells.entry(key).or_default())
        };
        if let Some(handle) = cell.get() {
            tracing::trace!(root = short_name(handle.root()), "validator cache hit");
            return Ok(handle.clone());
        }
        let handle = cell.get_or_try_init(|| {
            let handle = build()?;
            tracing::info!(root = short_name(handle.root()), noop = handle.is_noop(), "registered validator");
            Ok::<_, BuildError>(handle)
        })?;
        Ok(handle.clone())
    }
}

static VALIDATORS: Lazy<Validators> = Lazy::new(Validators::new);

/// Register `T` in the process-wide cache.
pub fn register<T: Bean>() -> Result<ValidatorHandle, BuildError> {
    VALIDATORS.register::<T>()
}

/// Validate with a registered handle. Constraint violations are in the `Ok` value.
pub fn validate<T: Bean>(handle: &ValidatorHandle, bean: &T, partial: bool) -> Result<ValidationErrors, ContractError> {
    handle.validate(bean, partial)
}
