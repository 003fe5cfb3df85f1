//! Command-to-script translation for uia-bridge.
//!
//! Handlers read a command's payload, address elements in the runtime's
//! session cache and render a self-contained script from a template. The
//! runtime's reply is parsed back through [`ResponseEnvelope`].

#![deny(clippy::all)]

pub mod element_ref;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod script;

pub use element_ref::ElementRef;
pub use envelope::EnvelopeError;
pub use envelope::ResponseEnvelope;
pub use envelope::runtime_status_name;
pub use error::CommandError;
pub use error::Stage;
pub use error::TranslationCause;
pub use error::TranslationError;
pub use handlers::CommandHandler;
pub use handlers::builtin_handlers;
pub use script::Fragment;
pub use script::Literal;
pub use script::Script;
pub use script::Substitutions;
pub use script::Template;
pub use script::TemplateError;
