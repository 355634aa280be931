use super::error::{CompileError, ErrorKind};
use std::fmt;

/// Diagnostic context attached to everything the compilers log or return.
///
/// A scope is an immutable value. Descending into a substructure derives a new
/// scope with [`Scope::with`]; the caller keeps its own copy untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    fields: Vec<(&'static str, String)>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a scope with one more field.
    #[must_use]
    pub fn with(&self, key: &'static str, value: impl fmt::Display) -> Scope {
        let mut fields = self.fields.clone();
        fields.push((key, value.to_string()));
        Scope { fields }
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// Most recent value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Build an error carrying this scope, logging it once.
    pub fn fail(&self, kind: ErrorKind) -> CompileError {
        tracing::error!(scope = %self, error = %kind, "Compilation failed");
        CompileError {
            kind,
            scope: self.clone(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return Ok(());
        }
        write!(f, " [")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "]")
    }
}
