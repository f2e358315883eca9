//! Common imports and types used throughout the crate.

pub use std::collections::HashMap;

pub type Result<T> = std::result::Result<T, crate::core::errors::ShellError>;
