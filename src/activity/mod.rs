//! Activity log
//!
//! This module provides:
//! - `ActivityEvent`: typed record of a change and who made it
//! - `EventBus`: in-process activity feed, read back with `drain`
//! - `ActivityLogger`: injected logger with a short-lived current-user cache

mod bus;
mod logger;
mod types;

pub use bus::{drain, EventBus};
pub use logger::{ActivityLogger, StaticUserProvider, UserProvider};
pub use types::{ActivityAction, ActivityEvent, EntityType, EventEmitter};
