//! Executor: runs a compiled [`Plan`] against a JSON instance.
//!
//! Never short-circuits; every violation in the instance graph is recorded.
//! Elements of lists and values of maps report under the collection's own
//! path (no index segment).
use serde_json::{Map, Value};

use crate::digits::DigitCounts;
use crate::error::{json_kind, ContractError};
use crate::errors::{ErrorPath, ValidationErrors};
use crate::plan::{Check, FieldPlan, NumberCheck, Plan, PlanId, StringCheck};
use crate::constraint::Size;

pub fn run(plan: &Plan, instance: &Value, partial: bool, errors: &mut ValidationErrors) -> Result<(), ContractError> {
    let mut run = Run { plan, partial, errors, path: ErrorPath::new() };
    let object = as_object(instance, "")?;
    run.record(plan.root, object)
}

fn as_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, ContractError> {
    value.as_object().ok_or_else(|| ContractError::NotAnObject { path: path.to_string(), found: json_kind(value) })
}

struct Run<'p, 'e> {
    plan: &'p Plan,
    partial: bool,
    errors: &'e mut ValidationErrors,
    path: ErrorPath,
}

impl<'p, 'e> Run<'p, 'e> {
    fn record(&mut self, id: PlanId, object: &Map<String, Value>) -> Result<(), ContractError> {
        let plan = self.plan;
        for field in &plan.records[id].fields {
            self.path.push(&field.name);
            self.field(field, object.get(&field.name).unwrap_or(&Value::Null))?;
            self.path.pop();
        }
        Ok(())
    }

    fn field(&mut self, field: &FieldPlan, value: &Value) -> Result<(), ContractError> {
        if value.is_null() {
            if let Some(message) = &field.not_null {
                if !self.partial { self.errors.add_message(self.path.as_str(), message); }
            }
            return Ok(());
        }
        match &field.check {
            Check::Presence => Ok(()),
            Check::String(check) => {
                let s = value.as_str().ok_or_else(|| self.mismatch("string", value))?;
                self.string(check, s);
                Ok(())
            }
            Check::Number(check) => {
                let text = match value {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s.clone(),   // big decimals are often carried as text
                    other => return Err(self.mismatch("number", other)),
                };
                self.number(check, &text, value)
            }
            Check::List { size, element } => {
                let items = value.as_array().ok_or_else(|| self.mismatch("array", value))?;
                if let Some(size) = size { self.size(size, items.len()); }
                if let Some(id) = element {
                    for item in items.iter().filter(|v| !v.is_null()) {
                        let object = as_object(item, self.path.as_str())?;
                        self.record(*id, object)?;
                    }
                }
                Ok(())
            }
            Check::Map { size, value: nested } => {
                let entries = value.as_object().ok_or_else(|| self.mismatch("object", value))?;
                if let Some(size) = size { self.size(size, entries.len()); }
                if let Some(id) = nested {
                    for entry in entries.values().filter(|v| !v.is_null()) {
                        let object = as_object(entry, self.path.as_str())?;
                        self.record(*id, object)?;
                    }
                }
                Ok(())
            }
            Check::Record(id) => {
                let object = as_object(value, self.path.as_str())?;
                self.record(*id, object)
            }
        }
    }

    fn string(&mut self, check: &StringCheck, s: &str) {
        let path = self.path.as_str();
        if let Some(message) = &check.not_blank {
            if s.trim().is_empty() { self.errors.add_message(path, message); }
        }
        if let Some(size) = &check.size {
            self.size(size, s.chars().count());
        }
        if let Some(pattern) = &check.pattern {
            if !pattern.regex.is_match(s) {
                self.errors.add(self.path.as_str(), &pattern.message, [
                    ("value", s),
                    ("pattern", pattern.text.as_str()),
                ]);
            }
        }
    }

    fn number(&mut self, check: &NumberCheck, text: &str, value: &Value) -> Result<(), ContractError> {
        let path = self.path.as_str();
        // NaN and infinities are not decimal numbers
        let parsed = if check.min.is_some() || check.max.is_some() {
            match text.parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => return Err(self.mismatch("number", value)),
            }
        } else {
            0.0
        };
        if let Some(min) = &check.min {
            if parsed < min.bound.0 {
                self.errors.add(path, &min.message, [("value", text.to_string()), ("min", min.bound.to_string())]);
            }
        }
        if let Some(max) = &check.max {
            if parsed > max.bound.0 {
                self.errors.add(path, &max.message, [("value", text.to_string()), ("max", max.bound.to_string())]);
            }
        }
        if let Some(digits) = &check.digits {
            let counts = DigitCounts::of(text).ok_or_else(|| self.mismatch("number", value))?;
            let (integer_exceeded, fraction_exceeded) = counts.exceeds(digits);
            let bound = |b: Option<u32>| b.map_or_else(|| "inf".to_string(), |b| b.to_string());
            let params = [
                ("value", text.to_string()),
                ("integer", bound(digits.integer)),
                ("fraction", bound(digits.fraction)),
            ];
            if integer_exceeded { self.errors.add(path, &digits.message, params.clone()); }
            if fraction_exceeded { self.errors.add(path, &digits.message, params); }
        }
        Ok(())
    }

    /// Bounds are inclusive. The absent side is reported as `0` / `inf`.
    fn size(&mut self, size: &Size, actual: usize) {
        let actual = actual as u64;
        let path = self.path.as_str();
        if let Some(min) = size.min {
            if actual < min {
                let max = size.max.map_or_else(|| "inf".to_string(), |m| m.to_string());
                self.errors.add(path, &size.message, [
                    ("value", actual.to_string()),
                    ("min", min.to_string()),
                    ("max", max),
                ]);
            }
        }
        if let Some(max) = size.max {
            if actual > max {
                let min = size.min.map_or_else(|| "0".to_string(), |m| m.to_string());
                self.errors.add(path, &size.message, [
                    ("value", actual.to_string()),
                    ("min", min),
                    ("max", max.to_string()),
                ]);
            }
        }
    }

    fn mismatch(&self, expected: &'static str, found: &Value) -> ContractError {
        ContractError::KindMismatch { path: self.path.as_str().to_string(), expected, found: json_kind(found) }
    }
}

// ------------------------------- Tests ------------------------------------ //
