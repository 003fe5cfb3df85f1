mod literal;
mod template;

use std::fmt;

use serde::Serialize;

pub use literal::Fragment;
pub use literal::FragmentError;
pub use literal::Literal;
pub use template::Substitutions;
pub use template::Template;
pub use template::TemplateError;

/// A fully rendered script, ready to hand to the automation runtime.
///
/// Only [`Template::render`] creates scripts, so a `Script` never contains an
/// unfilled placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Script(String);

impl Script {
    pub(crate) fn new(source: String) -> Self {
        Self(source)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Script {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
