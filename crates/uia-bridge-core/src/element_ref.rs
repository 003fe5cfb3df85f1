//! Addressing of elements held in the runtime's per-session cache.
//!
//! The runtime keeps every element it has returned in a cache keyed by an
//! opaque string. Key `"0"` is the session root and always exists. The bridge
//! never dereferences or validates keys: a reference either is the root or was
//! produced by an earlier command and handed back by the client, and it is
//! written into the script unchanged (as a quoted literal).

use std::fmt;

use serde::Serialize;
use uia_bridge_common::Payload;
use uia_bridge_common::PayloadError;

use crate::script::Literal;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    /// Cache key of the session root.
    pub const ROOT_KEY: &'static str = "0";

    pub fn root() -> Self {
        Self(Self::ROOT_KEY.to_string())
    }

    /// Read a reference the client got back from an earlier command.
    pub fn from_payload(payload: &Payload, field: &str) -> Result<Self, PayloadError> {
        payload.get_string(field).map(|key| Self(key.to_string()))
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_literal(&self) -> Literal {
        Literal::string(self.0.as_str())
    }
}

impl From<&ElementRef> for Literal {
    fn from(reference: &ElementRef) -> Self {
        reference.to_literal()
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
