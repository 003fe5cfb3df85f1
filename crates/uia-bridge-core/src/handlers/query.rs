use std::sync::LazyLock;

use uia_bridge_common::Payload;
use uia_bridge_common::SessionId;

use super::CommandHandler;
use super::reference;
use super::render_template;
use crate::element_ref::ElementRef;
use crate::error::TranslationError;
use crate::script::Literal;
use crate::script::Script;
use crate::script::Substitutions;
use crate::script::Template;

static GET_ATTRIBUTE: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var element = UIAutomation.cache.get(:reference);\
         var result = element.attribute(:name);\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

static IS_DISPLAYED: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var element = UIAutomation.cache.get(:reference);\
         var result = element.isVisible();\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

static GET_RECT: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var element = UIAutomation.cache.get(:reference);\
         var result = element.rect();\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

static TREE: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var root = UIAutomation.cache.get(:reference);\
         var result = root.tree(:attributes);\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

pub struct GetAttribute;

impl CommandHandler for GetAttribute {
    fn name(&self) -> &'static str {
        "getAttribute"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &GET_ATTRIBUTE, session, || {
            let element = reference(payload)?;
            let name = payload.get_string("name")?;
            Ok(Substitutions::new()
                .literal("reference", &element)
                .literal("name", Literal::string(name)))
        })
    }
}

pub struct IsDisplayed;

impl CommandHandler for IsDisplayed {
    fn name(&self) -> &'static str {
        "isDisplayed"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &IS_DISPLAYED, session, || {
            Ok(Substitutions::new().literal("reference", &reference(payload)?))
        })
    }
}

pub struct GetRect;

impl CommandHandler for GetRect {
    fn name(&self) -> &'static str {
        "getRect"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &GET_RECT, session, || {
            Ok(Substitutions::new().literal("reference", &reference(payload)?))
        })
    }
}

/// Dumps the element hierarchy below the session root.
///
/// `attributes` is optional; when present it must be a boolean.
pub struct Tree;

impl CommandHandler for Tree {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &TREE, session, || {
            let attributes = payload.opt_bool("attributes")?.unwrap_or(false);
            Ok(Substitutions::new()
                .literal("reference", &ElementRef::root())
                .literal("attributes", attributes))
        })
    }
}
