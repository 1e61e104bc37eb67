//! # keybridge-core
//!
//! Shared library for keybridge containing the virtual-key translation table,
//! the press-edge sampler and the serial wire framing.
//!
//! It has zero dependencies on OS APIs, serial drivers or terminals.
//!
//! # Architecture overview (for beginners)
//!
//! keybridge forwards key presses to a device on a serial link.  Each polling
//! tick the host asks "which keys are down?", keeps only the keys that were
//! up on the previous tick, turns each into a short piece of text and writes
//! it to the port.
//!
//! - **`keymap`** – The fixed table of Windows virtual-key codes and the
//!   translator that applies shift / caps-lock to them.
//!
//! - **`domain`** – The key-state capability trait, the previous-state table
//!   and the exit combination.
//!
//! - **`protocol`** – The session header and the symbols as they appear on
//!   the wire.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::key_state::{ExitCombination, KeySampler, KeyStateSource, Modifier, VkRange};
pub use keymap::{translate, ModifierState};
pub use protocol::messages::{ControlToken, SessionHeader, SymbolEvent};
