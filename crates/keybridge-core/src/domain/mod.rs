//! Domain logic for keybridge.
//!
//! Pure state-tracking code with no OS dependencies: the key-state capability
//! interface and the press-edge sampler that sits on top of it.

/// Press-edge detection and the exit combination.
///
/// See [`key_state::KeySampler`] for the main type.
pub mod key_state;
