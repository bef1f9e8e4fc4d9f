//! Unquoted-literal escape for the serialized definition.
//!
//! A string value `"<marker>(X)"` in the document comes out as bare `X` in
//! the definition text, so deploy-time substitutions can produce numbers,
//! booleans or objects. The result is deliberately not always valid JSON.

use regex::Regex;

use crate::error::CompilerError;

pub struct LiteralEscape {
    pattern: Regex,
}

impl LiteralEscape {
    pub fn new(marker: &str) -> Result<Self, CompilerError> {
        let pattern = Regex::new(&format!(r#"("{}\()(.*)(\)")"#, regex::escape(marker)))
            .map_err(|e| CompilerError::Serialize(format!("invalid literal marker '{}': {}", marker, e)))?;
        Ok(LiteralEscape { pattern })
    }

    /// Replace every wrapped value with its raw contents.
    pub fn strip(&self, text: &str) -> String {
        self.pattern.replace_all(text, "$2").into_owned()
    }
}
