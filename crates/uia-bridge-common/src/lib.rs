#![deny(clippy::all)]

mod payload;
mod session;
mod sync;

pub use payload::FieldType;
pub use payload::Payload;
pub use payload::PayloadError;
pub use session::SessionId;
pub use session::SessionIdError;
pub use sync::mutex_lock_or_recover;
pub use sync::poison_recovery_count;
pub use sync::try_lock_or_recover;
