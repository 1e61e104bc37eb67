//! Key-state infrastructure for the host.
//!
//! The polling loop reads the keyboard through
//! [`keybridge_core::KeyStateSource`].  Two implementations live here:
//!
//! - **`terminal`** – reads the keys typed into the bridge's own terminal
//!   window (crossterm raw mode) and presents them as virtual-key state.
//!   Nothing outside that window is observed.
//! - **`mock`** – replays a scripted sequence of keyboard snapshots, one per
//!   tick, for tests.

pub mod mock;
pub mod terminal;
