//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the host is up.
//!
//! # Tasks
//! - Housekeeping: Removes expired cache entries and idle admission windows

mod housekeeping;

pub use housekeeping::spawn_housekeeping_task;
