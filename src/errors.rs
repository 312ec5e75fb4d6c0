//! Validation error sink.
//!
//! Append-only: several errors may share a path and none overwrite another.
//! Order is the traversal order, which follows field declaration order.
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub path: String,
    pub template: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

/// Returned by [`ValidationErrors::into_result`] when at least one error was recorded.
#[derive(Error, Debug)]
#[error("validation failed, errors={}", render_summary(.0))]
pub struct ValidationFailed(pub ValidationErrors);

impl ValidationError {
    /// The template with every `{param}` placeholder substituted.
    pub fn message(&self) -> String {
        render(&self.template, &self.params)
    }
}

impl ValidationErrors {
    pub fn new() -> Self { Self::default() }

    pub fn add<I, K, V>(&mut self, path: &str, template: &str, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.errors.push(ValidationError {
            path: path.to_string(),
            template: template.to_string(),
            params: params.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        });
    }

    /// Record an error without parameters.
    pub fn add_message(&mut self, path: &str, template: &str) {
        self.add(path, template, std::iter::empty::<(String, String)>());
    }

    pub fn is_empty(&self) -> bool { self.errors.is_empty() }
    pub fn len(&self) -> usize { self.errors.len() }
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> { self.errors.iter() }
    pub fn into_vec(self) -> Vec<ValidationError> { self.errors }

    /// Every error recorded at exactly `path`.
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| e.path == path)
    }

    /// Rendered messages grouped by path, in first-seen order.
    pub fn messages(&self) -> IndexMap<&str, Vec<String>> {
        let mut out: IndexMap<&str, Vec<String>> = IndexMap::new();
        for error in &self.errors {
            out.entry(error.path.as_str()).or_default().push(error.message());
        }
        out
    }

    pub fn into_result(self) -> Result<(), ValidationFailed> {
        if self.is_empty() { Ok(()) } else { Err(ValidationFailed(self)) }
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;
    fn into_iter(self) -> Self::IntoIter { self.errors.iter() }
}

fn render_summary(errors: &ValidationErrors) -> String {
    errors.iter()
        .map(|e| format!("{}: {}", e.path, e.message()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Substitute `{key}` placeholders. Unknown keys and unbalanced braces are kept verbatim.
pub fn render(template: &str, params: &IndexMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match params.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

// ————————————————————————————————————————————————————————————————————————————
// PATH
// ————————————————————————————————————————————————————————————————————————————

/// Dotted path from the validation root, grown and shrunk during one traversal.
#[derive(Debug, Default)]
pub struct ErrorPath {
    buf: String,
    marks: Vec<usize>,
}

impl ErrorPath {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, segment: &str) {
        self.marks.push(self.buf.len());
        if !self.buf.is_empty() { self.buf.push('.'); }
        self.buf.push_str(segment);
    }

    pub fn pop(&mut self) {
        if let Some(len) = self.marks.pop() { self.buf.truncate(len); }
    }

    pub fn as_str(&self) -> &str { &self.buf }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_grows_and_shrinks() {
        let mut path = ErrorPath::new();
        path.push("billing");
        path.push("amount");
        assert_eq!(path.as_str(), "billing.amount");
        path.pop();
        path.push("currency");
        assert_eq!(path.as_str(), "billing.currency");
        path.pop();
        path.pop();
        path.pop();
        assert_eq!(path.as_str(), "");
    }

    #[test]
    fn errors_at_same_path_accumulate() {
        let mut errors = ValidationErrors::new();
        errors.add_message("code", "field must not be blank");
        errors.add("code", "field must match /{pattern}/, value={value}", [("value", " "), ("pattern", "[A-Z]+")]);
        assert_eq!(errors.at("code").count(), 2);
        let messages = errors.messages();
        assert_eq!(messages["code"], vec![
            "field must not be blank".to_string(),
            "field must match /[A-Z]+/, value= ".to_string(),
        ]);
    }

    #[test]
    fn render_keeps_unknown_placeholders() {
        let params: IndexMap<String, String> = [("min".to_string(), "1".to_string())].into_iter().collect();
        assert_eq!(render("between {min} and {max}", &params), "between 1 and {max}");
        assert_eq!(render("open {brace", &params), "open {brace");
    }

    #[test]
    fn into_result_summarizes_failures() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let mut errors = ValidationErrors::new();
        errors.add_message("name", "field must not be null");
        let failed = errors.into_result().unwrap_err();
        assert_eq!(failed.to_string(), "validation failed, errors=name: field must not be null");
    }
}
