//! Declarative constraints attached to a single field.
//!
//! Each constraint may appear at most once per field, so the set is a record
//! of optional slots rather than a list. Message templates use `{name}`
//! placeholders that are filled from the error parameters when rendered.
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_null: Option<NotNull>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_blank: Option<NotBlank>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Min>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Max>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digits: Option<Digits>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotNull {
    #[serde(default = "NotNull::default_message")]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotBlank {
    #[serde(default = "NotBlank::default_message")]
    pub message: String,
}

/// Length of a string, element count of a list, entry count of a map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
    #[serde(default = "Size::default_message")]
    pub message: String,
}

/// Full-match regular expression; compiled when the validator is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub regex: String,
    #[serde(default = "Pattern::default_message")]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Min {
    pub bound: OrderedFloat<f64>,
    #[serde(default = "Min::default_message")]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Max {
    pub bound: OrderedFloat<f64>,
    #[serde(default = "Max::default_message")]
    pub message: String,
}

/// Upper bounds on integer/fraction digit counts. `None` is unbounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digits {
    #[serde(default)]
    pub integer: Option<u32>,
    #[serde(default)]
    pub fraction: Option<u32>,
    #[serde(default = "Digits::default_message")]
    pub message: String,
}

impl NotNull { fn default_message() -> String { "field must not be null".into() } }
impl NotBlank { fn default_message() -> String { "field must not be blank".into() } }
impl Size { fn default_message() -> String { "size must be between {min} and {max}, size={value}".into() } }
impl Pattern { fn default_message() -> String { "field must match /{pattern}/, value={value}".into() } }
impl Min { fn default_message() -> String { "field must not be less than {min}, value={value}".into() } }
impl Max { fn default_message() -> String { "field must not be greater than {max}, value={value}".into() } }
impl Digits {
    fn default_message() -> String {
        "field out of bounds (<{integer} digits>.<{fraction} digits> expected), value={value}".into()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

impl Constraints {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool {
        self.not_null.is_none()
            && self.not_blank.is_none()
            && self.size.is_none()
            && self.pattern.is_none()
            && self.min.is_none()
            && self.max.is_none()
            && self.digits.is_none()
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = Some(NotNull { message: NotNull::default_message() });
        self
    }

    pub fn not_blank(mut self) -> Self {
        self.not_blank = Some(NotBlank { message: NotBlank::default_message() });
        self
    }

    pub fn size(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.size = Some(Size { min, max, message: Size::default_message() });
        self
    }

    pub fn pattern(mut self, regex: impl Into<String>) -> Self {
        self.pattern = Some(Pattern { regex: regex.into(), message: Pattern::default_message() });
        self
    }

    pub fn min(mut self, bound: f64) -> Self {
        self.min = Some(Min { bound: OrderedFloat(bound), message: Min::default_message() });
        self
    }

    pub fn max(mut self, bound: f64) -> Self {
        self.max = Some(Max { bound: OrderedFloat(bound), message: Max::default_message() });
        self
    }

    pub fn digits(mut self, integer: Option<u32>, fraction: Option<u32>) -> Self {
        self.digits = Some(Digits { integer, fraction, message: Digits::default_message() });
        self
    }

    /// Override the message template of the most specific constraint named.
    /// Unknown names and unset constraints are ignored.
    pub fn message(mut self, constraint: &str, template: impl Into<String>) -> Self {
        let template = template.into();
        match constraint {
            "not_null"  => if let Some(c) = &mut self.not_null  { c.message = template },
            "not_blank" => if let Some(c) = &mut self.not_blank { c.message = template },
            "size"      => if let Some(c) = &mut self.size      { c.message = template },
            "pattern"   => if let Some(c) = &mut self.pattern   { c.message = template },
            "min"       => if let Some(c) = &mut self.min       { c.message = template },
            "max"       => if let Some(c) = &mut self.max       { c.message = template },
            "digits"    => if let Some(c) = &mut self.digits    { c.message = template },
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_form_fills_default_messages() {
        let c: Constraints = serde_json::from_value(serde_json::json!({
            "not_null": {},
            "size": { "max": 5 },
            "pattern": { "regex": "[a-z]+", "message": "lowercase only" }
        })).unwrap();
        assert_eq!(c.not_null.unwrap().message, "field must not be null");
        let size = c.size.unwrap();
        assert_eq!((size.min, size.max), (None, Some(5)));
        assert_eq!(c.pattern.unwrap().message, "lowercase only");
    }

    #[test]
    fn unknown_constraint_rejected() {
        let r = serde_json::from_value::<Constraints>(serde_json::json!({ "email": {} }));
        assert!(r.is_err());
    }

    #[test]
    fn message_override_only_touches_set_constraints() {
        let c = Constraints::new().not_blank().message("not_blank", "required").message("size", "ignored");
        assert_eq!(c.not_blank.unwrap().message, "required");
        assert!(c.size.is_none());
    }
}
