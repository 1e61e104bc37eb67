//! Infrastructure layer for the keyboard bridge.
//!
//! Contains OS-facing adapters: serial ports, the terminal key-state source,
//! the operator console, host identity and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `keybridge_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.

pub mod console;
pub mod identity;
pub mod key_state;
pub mod serial;
pub mod storage;
