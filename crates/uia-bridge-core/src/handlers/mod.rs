//! Command handlers.
//!
//! A handler turns one named command into one script. It reads exactly the
//! payload fields it declares, resolves element references and fills its
//! template. Every template follows the same three steps: look an element up
//! in the session cache, perform one operation on it and hand the result to
//! `UIAutomation.createJSONResponse(<session>, 0, <result>)`.

mod find;
mod interaction;
mod query;

use serde_json::Value;
use tracing::debug;
use tracing::error;
use uia_bridge_common::FieldType;
use uia_bridge_common::Payload;
use uia_bridge_common::PayloadError;
use uia_bridge_common::SessionId;

use crate::element_ref::ElementRef;
use crate::error::TranslationCause;
use crate::error::TranslationError;
use crate::script::Fragment;
use crate::script::Literal;
use crate::script::Script;
use crate::script::Substitutions;
use crate::script::Template;

pub use find::FindElement;
pub use find::FindElementRoot;
pub use find::FindElements;
pub use find::FindElementsRoot;
pub use interaction::Clear;
pub use interaction::Click;
pub use interaction::SetValue;
pub use query::GetAttribute;
pub use query::GetRect;
pub use query::IsDisplayed;
pub use query::Tree;

/// Placeholder every template uses for the session the reply belongs to.
pub const SESSION_PLACEHOLDER: &str = "sessionId";

/// Translates one command into a script.
///
/// Implementations are stateless; `render` is pure and may run concurrently
/// for any number of sessions.
pub trait CommandHandler: Send + Sync {
    /// Command name as it appears on the wire.
    fn name(&self) -> &'static str;

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError>;
}

/// Every built-in handler, in the order `commands` lists them.
pub fn builtin_handlers() -> Vec<Box<dyn CommandHandler>> {
    vec![
        Box::new(FindElementRoot),
        Box::new(FindElementsRoot),
        Box::new(FindElement),
        Box::new(FindElements),
        Box::new(Click),
        Box::new(Clear),
        Box::new(SetValue),
        Box::new(GetAttribute),
        Box::new(IsDisplayed),
        Box::new(GetRect),
        Box::new(Tree),
    ]
}

/// Shared tail of every handler: collect the command's substitutions, add the
/// session and fill the template.
pub(crate) fn render_template(
    command: &'static str,
    template: &Template,
    session: &SessionId,
    substitutions: impl FnOnce() -> Result<Substitutions, PayloadError>,
) -> Result<Script, TranslationError> {
    let substitutions = substitutions()
        .map_err(|e| TranslationError::new(command, e))?
        .literal(SESSION_PLACEHOLDER, Literal::string(session.as_str()));

    match template.render(&substitutions) {
        Ok(script) => {
            debug!(command, session = %session, script = %script, "Rendered command script");
            Ok(script)
        }
        Err(e) => {
            error!(command, error = %e, "Command template does not match its substitutions");
            Err(TranslationError::new(command, TranslationCause::Template(e)))
        }
    }
}

/// The element a scoped command operates on.
pub(crate) fn reference(payload: &Payload) -> Result<ElementRef, PayloadError> {
    ElementRef::from_payload(payload, "reference")
}

const CRITERIA_TYPES: &[FieldType] = &[FieldType::String, FieldType::Object];

/// Add `criteria` to `substitutions`.
///
/// A string is the runtime's own predicate syntax and is inserted as a checked
/// fragment. An object is a structured predicate and is rendered as an object
/// literal.
pub(crate) fn with_criteria(
    substitutions: Substitutions,
    payload: &Payload,
) -> Result<Substitutions, PayloadError> {
    match payload.get_value("criteria")? {
        Value::String(expr) => {
            let fragment = Fragment::new(expr.as_str())
                .map_err(|e| PayloadError::invalid("criteria", e.to_string()))?;
            Ok(substitutions.fragment("criteria", &fragment))
        }
        value @ Value::Object(_) => Ok(substitutions.literal("criteria", Literal::from_json(value))),
        other => Err(PayloadError::wrong_type(
            "criteria",
            FieldType::OneOf(CRITERIA_TYPES),
            other,
        )),
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use serde_json::Value;
    use uia_bridge_common::Payload;
    use uia_bridge_common::SessionId;

    use super::CommandHandler;
    use crate::error::TranslationError;

    pub fn render(handler: &dyn CommandHandler, payload: Value) -> Result<String, TranslationError> {
        let payload = Payload::new(payload).unwrap();
        handler
            .render(&SessionId::new("abc123"), &payload)
            .map(|script| script.into_string())
    }
}
