//! Application layer use cases for the keyboard bridge.
//!
//! Both use cases depend only on capability traits (`PortProvider`,
//! `OperatorConsole`, `KeyStateSource`), so the infrastructure adapters can
//! be replaced by the mocks in `infrastructure::*::mock` under test.
//!
//! # Sub-modules
//!
//! - **`discover_port`** – Builds the ordered candidate list, opens ports,
//!   classifies failures and hands access-denied cases back to the operator.
//!
//! - **`session`** – Sends the session header and runs the polling loop that
//!   turns key presses into flushed protocol symbols.

pub mod discover_port;
pub mod session;
