//! Utility functions for display formatting.

pub mod format;

pub use format::{format_amount, format_date, format_optional_date, format_percent, truncate_string};
