//! Placeholder templates for command scripts.
//!
//! A template is script text with named placeholders written `:name`. Values
//! are substituted in one left-to-right pass over the parsed template, so
//! substituted text is never scanned for further placeholders.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::Script;
use super::literal::Fragment;
use super::literal::Literal;

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid placeholder regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("no value supplied for placeholder ':{placeholder}'")]
    MissingSubstitution { placeholder: String },
    #[error("value supplied for ':{name}' but the template has no such placeholder")]
    UnusedSubstitution { name: String },
}

impl TemplateError {
    pub fn placeholder(&self) -> &str {
        match self {
            TemplateError::MissingSubstitution { placeholder } => placeholder,
            TemplateError::UnusedSubstitution { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    placeholders: BTreeSet<String>,
}

impl Template {
    pub fn new(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut placeholders = BTreeSet::new();
        let mut last = 0;

        for caps in PLACEHOLDER_REGEX.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Text(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            placeholders.insert(name.as_str().to_string());
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Text(source[last..].to_string()));
        }

        Self {
            segments,
            placeholders,
        }
    }

    /// Fill every placeholder. All placeholders need a value and every value
    /// needs a placeholder; either mismatch is a defect in the caller's pairing
    /// of template and substitutions.
    pub fn render(&self, substitutions: &Substitutions) -> Result<Script, TemplateError> {
        if let Some(name) = substitutions
            .values
            .keys()
            .find(|name| !self.placeholders.contains(*name))
        {
            return Err(TemplateError::UnusedSubstitution { name: name.clone() });
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = substitutions.values.get(name).ok_or_else(|| {
                        TemplateError::MissingSubstitution {
                            placeholder: name.clone(),
                        }
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(Script::new(out))
    }
}

/// Placeholder values, already rendered to script text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: BTreeMap<String, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(mut self, name: &str, value: impl Into<Literal>) -> Self {
        self.values.insert(name.to_string(), value.into().render());
        self
    }

    pub fn fragment(mut self, name: &str, fragment: &Fragment) -> Self {
        self.values
            .insert(name.to_string(), fragment.as_str().to_string());
        self
    }
}
