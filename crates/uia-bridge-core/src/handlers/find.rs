//! Element search: from the session root or below a cached element.

use std::sync::LazyLock;

use uia_bridge_common::Payload;
use uia_bridge_common::PayloadError;
use uia_bridge_common::SessionId;

use super::CommandHandler;
use super::reference;
use super::render_template;
use super::with_criteria;
use crate::element_ref::ElementRef;
use crate::error::TranslationError;
use crate::script::Literal;
use crate::script::Script;
use crate::script::Substitutions;
use crate::script::Template;

static FIND_ELEMENT_ROOT: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var root = UIAutomation.cache.get(:reference);\
         var result = root.element(:depth,:criteria);\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

static FIND_ELEMENTS_ROOT: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var root = UIAutomation.cache.get(:reference);\
         var result = root.elements(:depth,:criteria);\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

static FIND_ELEMENT: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var parent = UIAutomation.cache.get(:reference);\
         var result = parent.element(:depth,:criteria);\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

static FIND_ELEMENTS: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "var parent = UIAutomation.cache.get(:reference);\
         var result = parent.elements(:depth,:criteria);\
         UIAutomation.createJSONResponse(:sessionId,0,result);",
    )
});

/// `depth` and `criteria` for a search starting at `from`.
fn search(from: &ElementRef, payload: &Payload) -> Result<Substitutions, PayloadError> {
    let depth = payload.get_int("depth")?;
    let subs = Substitutions::new()
        .literal("reference", from)
        .literal("depth", Literal::int(depth));
    with_criteria(subs, payload)
}

/// First element below the session root matching `criteria`.
pub struct FindElementRoot;

impl CommandHandler for FindElementRoot {
    fn name(&self) -> &'static str {
        "findElementRoot"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &FIND_ELEMENT_ROOT, session, || {
            search(&ElementRef::root(), payload)
        })
    }
}

pub struct FindElementsRoot;

impl CommandHandler for FindElementsRoot {
    fn name(&self) -> &'static str {
        "findElementsRoot"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &FIND_ELEMENTS_ROOT, session, || {
            search(&ElementRef::root(), payload)
        })
    }
}

/// First element below the element at `reference` matching `criteria`.
pub struct FindElement;

impl CommandHandler for FindElement {
    fn name(&self) -> &'static str {
        "findElement"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &FIND_ELEMENT, session, || {
            search(&reference(payload)?, payload)
        })
    }
}

pub struct FindElements;

impl CommandHandler for FindElements {
    fn name(&self) -> &'static str {
        "findElements"
    }

    fn render(&self, session: &SessionId, payload: &Payload) -> Result<Script, TranslationError> {
        render_template(self.name(), &FIND_ELEMENTS, session, || {
            search(&reference(payload)?, payload)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::handlers::test_helpers::render;
    use serde_json::json;
    use uia_bridge_common::FieldType;

    #[test]
    fn test_find_element_root_renders_exact_script() {
        let script = render(
            &FindElementRoot,
            json!({"depth": 2, "criteria": "type == 'Button'"}),
        )
        .unwrap();
        assert_eq!(
            script,
            "var root = UIAutomation.cache.get('0');var result = root.element(2,type == 'Button');UIAutomation.createJSONResponse('abc123',0,result);"
        );
    }

    #[test]
    fn test_missing_depth_names_the_field() {
        let err = render(&FindElementRoot, json!({"criteria": "x"})).unwrap_err();
        assert_eq!(err.command(), "findElementRoot");
        assert_eq!(err.stage(), Stage::Payload);
        assert_eq!(
            err.payload_error(),
            Some(&PayloadError::Missing {
                field: "depth".into()
            })
        );
    }

    #[test]
    fn test_string_depth_is_not_coerced() {
        let err = render(&FindElementRoot, json!({"depth": "two", "criteria": "x"})).unwrap_err();
        assert_eq!(
            err.payload_error(),
            Some(&PayloadError::WrongType {
                field: "depth".into(),
                expected: FieldType::Integer,
                found: "string",
            })
        );
    }

    #[test]
    fn test_negative_depth_renders_as_digits() {
        let script = render(
            &FindElementRoot,
            json!({"depth": -1, "criteria": "type == 'Button'"}),
        )
        .unwrap();
        assert!(script.contains("root.element(-1,type == 'Button');"));
    }

    #[test]
    fn test_depth_beyond_signed_range_is_invalid() {
        let err = render(
            &FindElements,
            json!({"reference": "3", "depth": u64::MAX, "criteria": "x"}),
        )
        .unwrap_err();
        assert!(matches!(
            err.payload_error(),
            Some(PayloadError::InvalidValue { field, .. }) if field == "depth"
        ));
    }

    #[test]
    fn test_missing_criteria_names_the_field() {
        let err = render(&FindElementsRoot, json!({"depth": 1})).unwrap_err();
        assert_eq!(err.payload_error().and_then(|e| e.field()), Some("criteria"));
    }

    #[test]
    fn test_root_search_ignores_reference_field() {
        let script = render(
            &FindElementsRoot,
            json!({"reference": "9", "depth": 1, "criteria": "visible"}),
        )
        .unwrap();
        assert!(script.starts_with("var root = UIAutomation.cache.get('0');"));
        assert!(script.contains("root.elements(1,visible)"));
    }

    #[test]
    fn test_scoped_search_uses_reference_verbatim() {
        let script = render(
            &FindElement,
            json!({"reference": "17", "depth": 3, "criteria": "name == 'OK'"}),
        )
        .unwrap();
        assert_eq!(
            script,
            "var parent = UIAutomation.cache.get('17');var result = parent.element(3,name == 'OK');UIAutomation.createJSONResponse('abc123',0,result);"
        );
    }

    #[test]
    fn test_scoped_search_from_root_reference() {
        let script = render(
            &FindElements,
            json!({"reference": "0", "depth": 0, "criteria": "true"}),
        )
        .unwrap();
        assert!(script.starts_with("var parent = UIAutomation.cache.get('0');"));
    }

    #[test]
    fn test_scoped_search_requires_reference() {
        let err = render(&FindElements, json!({"depth": 1, "criteria": "x"})).unwrap_err();
        assert_eq!(err.payload_error().and_then(|e| e.field()), Some("reference"));
    }
}
