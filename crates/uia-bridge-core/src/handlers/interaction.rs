use std::sync::LazyLock;

use serde_json::Value;
use uia_bridge_common::FieldType;
use uia_bridge_common::Payload;
use uia_bridge_common::PayloadError;
use uia_bridge_common::SessionId;

use super::CommandHandler;
use super::reference;
use super::render_template;
use crate::error::TranslationError;
use crate::script::Literal;
use crate::script::Script;
use crate::script::Substitutions;
use crate::script::Template;

static CLICK: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var element = UIAutomation.cache.get(:reference);\
         var result = element.tap();\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

static CLEAR: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var element = UIAutomation.cache.get(:reference);\
         var result = element.setValue('');\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

static SET_VALUE: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var element = UIAutomation.cache.get(:reference);\
         var result = element.setValue(:value);\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

const VALUE_TYPES: &[FieldType] = &[FieldType::String, FieldType::Array];

pub struct Click;

impl CommandHandler for Click {
    fn name(&self) -> &'static str {
        "click"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &CLICK, session, || {
            Ok(Substitutions::new().literal("reference", &reference(payload)?))
        })
    }
}

pub struct Clear;

impl CommandHandler for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &CLEAR, session, || {
            Ok(Substitutions::new().literal("reference", &reference(payload)?))
        })
    }
}

/// Types text into an element. `value` is a string or a list of strings
/// (WebDriver key sequences), which are joined.
pub struct SetValue;

impl SetValue {
    fn text(payload: &Payload) -> Result<String, PayloadError> {
        match payload.get_value("value")? {
            Value::String(text) => Ok(text.clone()),
            Value::Array(_) => Ok(payload.get_string_array("value")?.concat()),
            other => Err(PayloadError::wrong_type(
                "value",
                FieldType::OneOf(VALUE_TYPES),
                other,
            )),
        }
    }
}

impl CommandHandler for SetValue {
    fn name(&self) -> &'static str {
        "setValue"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &SET_VALUE, session, || {
            let element = reference(payload)?;
            let text = Self::text(payload)?;
            Ok(Substitutions::new()
                .literal("reference", &element)
                .literal("value", Literal::string(text)))
        })
    }
}
