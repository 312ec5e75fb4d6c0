//! Validator synthesis: schema → compiled check tree.
//!
//! Two phases:
//! 1. reachability: which types carry a constraint, directly or through a
//!    nested record. Computed as a fixpoint over the reachable types, so
//!    cycles need no special casing.
//! 2. compilation: one [`RecordPlan`] per type that needs validation, holding
//!    only the fields that participate. Plans are shared by type; the path
//!    prefix is supplied at run time, so the same record nested at
//!    `billing.amount` and `refund.amount` reports under each path.
//!
//! Regexes are compiled here, once, and shared read-only by every call.
use std::collections::{HashMap, HashSet};
use regex::Regex;

use crate::constraint::{Constraints, Digits, Max, Min, Size};
use crate::error::BuildError;
use crate::shape::{field_path, FieldKind, FieldShape, Schema, TypeShape};

pub type PlanId = usize;

/// Compiled validator for one root type.
#[derive(Debug)]
pub struct Plan {
    pub root: PlanId,
    pub records: Vec<RecordPlan>,
}

/// Field checks of one record, run in declaration order.
#[derive(Debug, Default)]
pub struct RecordPlan {
    pub type_name: String,
    pub fields: Vec<FieldPlan>,
}

#[derive(Debug)]
pub struct FieldPlan {
    pub name: String,
    pub not_null: Option<String>,    // message template
    pub check: Check,
}

/// What to do with a non-null field value.
#[derive(Debug)]
pub enum Check {
    /// Only the null check applies.
    Presence,
    String(StringCheck),
    Number(NumberCheck),
    List { size: Option<Size>, element: Option<PlanId> },
    Map { size: Option<Size>, value: Option<PlanId> },
    Record(PlanId),
}

#[derive(Debug, Default)]
pub struct StringCheck {
    pub not_blank: Option<String>,
    pub size: Option<Size>,
    pub pattern: Option<CompiledPattern>,
}

#[derive(Debug)]
pub struct CompiledPattern {
    pub text: String,
    pub regex: Regex,                // anchored: `^(?:text)$`
    pub message: String,
}

#[derive(Debug, Default)]
pub struct NumberCheck {
    pub min: Option<Min>,
    pub max: Option<Max>,
    pub digits: Option<Digits>,
}

impl Plan {
    pub fn field_count(&self) -> usize {
        self.records.iter().map(|r| r.fields.len()).sum()
    }

    pub fn pattern_count(&self) -> usize {
        self.records.iter()
            .flat_map(|r| &r.fields)
            .filter(|f| matches!(&f.check, Check::String(s) if s.pattern.is_some()))
            .count()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REACHABILITY
// ————————————————————————————————————————————————————————————————————————————

/// Names of every type reachable from `root` (root included) that has at
/// least one constraint on itself or on a type it leads to.
pub fn constrained_types<'a>(schema: &'a Schema, root: &'a str) -> Result<HashSet<&'a str>, BuildError> {
    // collect reachable types
    let mut reachable: Vec<&TypeShape> = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![schema.resolve(root, root)?];
    while let Some(shape) = stack.pop() {
        if !seen.insert(shape.name.as_str()) { continue; }
        for field in &shape.fields {
            if let Some(target) = field.kind.record_target() {
                stack.push(schema.resolve(target, &field_path(shape, field))?);
            }
        }
        reachable.push(shape);
    }

    // direct constraints, then propagate backwards until stable
    let mut needs: HashSet<&str> = reachable.iter()
        .filter(|shape| shape.fields.iter().any(|f| !f.constraints.is_empty()))
        .map(|shape| shape.name.as_str())
        .collect();
    loop {
        let before = needs.len();
        for shape in &reachable {
            if needs.contains(shape.name.as_str()) { continue; }
            let leads = shape.fields.iter()
                .filter_map(|f| f.kind.record_target())
                .any(|target| needs.contains(target));
            if leads { needs.insert(shape.name.as_str()); }
        }
        if needs.len() == before { break; }
    }
    Ok(needs)
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILATION
// ————————————————————————————————————————————————————————————————————————————

/// Compile the validator for `root`. `None` when nothing reachable declares a
/// constraint; callers skip validation for such types entirely.
pub fn compile(schema: &Schema, root: &str) -> Result<Option<Plan>, BuildError> {
    let needs = constrained_types(schema, root)?;
    if !needs.contains(root) {
        return Ok(None);
    }
    let mut compiler = Compiler { schema, needs: &needs, records: Vec::new(), index: HashMap::new() };
    let root_id = compiler.record(root, root)?;
    Ok(Some(Plan { root: root_id, records: compiler.records }))
}

struct Compiler<'a> {
    schema: &'a Schema,
    needs: &'a HashSet<&'a str>,
    records: Vec<RecordPlan>,
    index: HashMap<String, PlanId>,
}

impl<'a> Compiler<'a> {
    fn record(&mut self, name: &str, referenced_from: &str) -> Result<PlanId, BuildError> {
        if let Some(id) = self.index.get(name) {
            return Ok(*id);
        }
        let schema = self.schema;
        let shape = schema.resolve(name, referenced_from)?;
        // reserve the slot before descending so cycles resolve to it
        let id = self.records.len();
        self.records.push(RecordPlan { type_name: shape.name.clone(), fields: Vec::new() });
        self.index.insert(shape.name.clone(), id);

        let mut fields = Vec::new();
        for field in &shape.fields {
            if let Some(plan) = self.field(shape, field)? {
                fields.push(plan);
            }
        }
        self.records[id].fields = fields;
        Ok(id)
    }

    /// `None` when the field neither declares a constraint nor leads to one.
    fn field(&mut self, shape: &TypeShape, field: &FieldShape) -> Result<Option<FieldPlan>, BuildError> {
        let nested = field.kind.record_target().filter(|t| self.needs.contains(t));
        if field.constraints.is_empty() && nested.is_none() {
            return Ok(None);
        }
        let path = field_path(shape, field);
        let c = &field.constraints;
        let check = match &field.kind {
            FieldKind::String => Check::String(string_check(c, &path)?),
            FieldKind::Number => Check::Number(NumberCheck {
                min: c.min.clone(),
                max: c.max.clone(),
                digits: c.digits.clone(),
            }),
            FieldKind::List(element) => {
                let element = match (element.as_ref(), nested) {
                    (FieldKind::Record(_), Some(target)) => Some(self.record(target, &path)?),
                    _ => None,
                };
                Check::List { size: c.size.clone(), element }
            }
            FieldKind::Map(value) => {
                // list values are value lists by the structural invariant; never descended
                let value = match (value.as_ref(), nested) {
                    (FieldKind::Record(_), Some(target)) => Some(self.record(target, &path)?),
                    _ => None,
                };
                Check::Map { size: c.size.clone(), value }
            }
            FieldKind::Record(_) => match nested {
                Some(target) => Check::Record(self.record(target, &path)?),
                None => Check::Presence,
            },
            FieldKind::Scalar(_) | FieldKind::Enum(_) => Check::Presence,
        };
        Ok(Some(FieldPlan {
            name: field.name.clone(),
            not_null: c.not_null.as_ref().map(|n| n.message.clone()),
            check,
        }))
    }
}

fn string_check(c: &Constraints, path: &str) -> Result<StringCheck, BuildError> {
    let pattern = match &c.pattern {
        None => None,
        Some(p) => {
            let regex = Regex::new(&format!("^(?:{})$", p.regex)).map_err(|error| BuildError::InvalidPattern {
                pattern: p.regex.clone(),
                field: path.to_string(),
                reason: error.to_string(),
            })?;
            Some(CompiledPattern { text: p.regex.clone(), regex, message: p.message.clone() })
        }
    };
    Ok(StringCheck {
        not_blank: c.not_blank.as_ref().map(|n| n.message.clone()),
        size: c.size.clone(),
        pattern,
    })
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn money() -> TypeShape {
        TypeShape::new("Money")
            .field(FieldShape::new("amount", FieldKind::Number).with(Constraints::new().not_null().min(0.0)))
            .field(FieldShape::new("currency", FieldKind::String))
    }

    #[test]
    fn unconstrained_graph_compiles_to_nothing() {
        let schema = Schema::new()
            .with(TypeShape::new("Order")
                .field(FieldShape::new("id", FieldKind::String))
                .field(FieldShape::new("note", FieldKind::record("Note"))))
            .with(TypeShape::new("Note").field(FieldShape::new("text", FieldKind::String)));
        assert!(compile(&schema, "Order").unwrap().is_none());
    }

    #[test]
    fn only_participating_fields_are_compiled() {
        let schema = Schema::new()
            .with(TypeShape::new("Order")
                .field(FieldShape::new("id", FieldKind::String))
                .field(FieldShape::new("billing", FieldKind::record("Money")))
                .field(FieldShape::new("refunds", FieldKind::list(FieldKind::record("Money")))))
            .with(money());
        let plan = compile(&schema, "Order").unwrap().unwrap();
        let root = &plan.records[plan.root];
        let names: Vec<_> = root.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["billing", "refunds"]);
        // shared by type
        assert_eq!(plan.records.len(), 2);
        let money_plan = &plan.records[1];
        assert_eq!(money_plan.type_name, "Money");
        assert_eq!(money_plan.fields.len(), 1);
    }

    #[test]
    fn constraint_reached_through_cycle() {
        // A -> B -> A, only A constrains; B must still be compiled
        let schema = Schema::new()
            .with(TypeShape::new("A")
                .field(FieldShape::new("b", FieldKind::record("B")))
                .field(FieldShape::new("name", FieldKind::String).with(Constraints::new().not_blank())))
            .with(TypeShape::new("B").field(FieldShape::new("a", FieldKind::list(FieldKind::record("A")))));
        let needs = constrained_types(&schema, "B").unwrap();
        assert!(needs.contains("A") && needs.contains("B"));

        let plan = compile(&schema, "B").unwrap().unwrap();
        assert_eq!(plan.records.len(), 2);
        match &plan.records[plan.root].fields[0].check {
            Check::List { element: Some(id), .. } => assert_eq!(plan.records[*id].type_name, "A"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pattern_is_anchored() {
        let schema = Schema::new().with(TypeShape::new("T")
            .field(FieldShape::new("code", FieldKind::String).with(Constraints::new().pattern("[A-Z]{2}"))));
        let plan = compile(&schema, "T").unwrap().unwrap();
        assert_eq!(plan.pattern_count(), 1);
        let Check::String(check) = &plan.records[0].fields[0].check else { panic!("not a string check") };
        let pattern = check.pattern.as_ref().unwrap();
        assert!(pattern.regex.is_match("AB"));
        assert!(!pattern.regex.is_match("xABx"));
        assert_eq!(pattern.text, "[A-Z]{2}");
    }

    #[test]
    fn not_null_on_unconstrained_record_is_presence_only() {
        let schema = Schema::new()
            .with(TypeShape::new("T").field(
                FieldShape::new("note", FieldKind::record("Note")).with(Constraints::new().not_null()),
            ))
            .with(TypeShape::new("Note").field(FieldShape::new("text", FieldKind::String)));
        let plan = compile(&schema, "T").unwrap().unwrap();
        assert_eq!(plan.records.len(), 1);
        assert!(matches!(plan.records[0].fields[0].check, Check::Presence));
        assert!(plan.records[0].fields[0].not_null.is_some());
    }
}
