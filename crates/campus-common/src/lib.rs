pub mod errors;
pub mod id;

pub use errors::{ConfigError, PresenceError};
pub use id::{new_id, new_receipt_id, SubscriptionId};
