//! Missing value resolution.
//!
//! This module provides the type-driven resolver used on every cleaning pass:
//! - mean or median for numeric columns
//! - mode for categorical columns
//! - earliest or latest date for datetime columns

mod statistical;

pub use statistical::{FillPolicy, MissingValueResolver};
