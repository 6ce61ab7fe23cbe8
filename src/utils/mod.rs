pub mod address_validator;
pub mod string_utils;
pub mod time_utils;

pub use time_utils::rfc3339_timestamp;
