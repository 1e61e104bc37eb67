//! Wire framing for the serial link.
//!
//! The link is a unidirectional, unframed byte stream: one newline-terminated
//! session header, then one write per key press.

pub mod messages;

pub use messages::*;
