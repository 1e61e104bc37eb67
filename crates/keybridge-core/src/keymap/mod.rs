//! Virtual-key classification and symbol translation.
//!
//! `windows_vk` holds the fixed VK code table; `translate` turns a pressed
//! code and the current modifier state into the symbol sent on the wire.

pub mod translate;
pub mod windows_vk;

pub use translate::{translate, ModifierState};
pub use windows_vk::{classify, KeyClass};
