//! Utility functions and helpers.

pub mod timestamps;
pub mod uuid_utils;

pub use timestamps::{iso_timestamp, now_utc, Timestamp};
pub use uuid_utils::{generate_uuid, is_valid_uuid};
