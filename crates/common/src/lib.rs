//! Shared helpers used across the courier crates: message-style error
//! context, artifact naming, and bounded text handling.

pub mod error;
pub mod naming;
pub mod text;

pub use error::FromMessage;
