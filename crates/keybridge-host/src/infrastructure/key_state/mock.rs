//! Scripted key-state source for unit and integration testing.
//!
//! Each call to `begin_tick` moves to the next [`KeyFrame`].  When the script
//! runs out, `begin_tick` fails with `UnexpectedEof` so a loop under test can
//! never spin forever.

use std::collections::HashSet;
use std::io;

use keybridge_core::{KeyStateSource, Modifier};

/// The keyboard as seen during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFrame {
    pub down: HashSet<u8>,
    pub held: HashSet<Modifier>,
    pub toggled: HashSet<Modifier>,
}

impl KeyFrame {
    /// A frame with nothing pressed.
    pub fn idle() -> Self {
        Self::default()
    }

    /// A frame with `keys` down.
    pub fn keys(keys: &[u8]) -> Self {
        Self {
            down: keys.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Adds a held modifier.  Its VK code is reported down too.
    pub fn holding(mut self, modifier: Modifier) -> Self {
        self.held.insert(modifier);
        self.down.insert(modifier.vk());
        self
    }

    /// Adds a toggled-on modifier.
    pub fn toggled(mut self, modifier: Modifier) -> Self {
        self.toggled.insert(modifier);
        self
    }
}

/// A [`KeyStateSource`] that replays frames.
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    frames: Vec<KeyFrame>,
    current: Option<usize>,
}

impl ScriptedKeys {
    pub fn new(frames: Vec<KeyFrame>) -> Self {
        Self {
            frames,
            current: None,
        }
    }

    /// Number of ticks started so far.
    pub fn ticks(&self) -> usize {
        self.current.map_or(0, |i| i + 1)
    }

    fn frame(&self) -> Option<&KeyFrame> {
        self.current.and_then(|i| self.frames.get(i))
    }
}

impl KeyStateSource for ScriptedKeys {
    fn begin_tick(&mut self) -> io::Result<()> {
        let next = self.current.map_or(0, |i| i + 1);
        if next >= self.frames.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "key script exhausted",
            ));
        }
        self.current = Some(next);
        Ok(())
    }

    fn is_down(&self, vk: u8) -> bool {
        self.frame().is_some_and(|f| f.down.contains(&vk))
    }

    fn is_held(&self, modifier: Modifier) -> bool {
        self.frame().is_some_and(|f| f.held.contains(&modifier))
    }

    fn is_toggled(&self, modifier: Modifier) -> bool {
        self.frame().is_some_and(|f| f.toggled.contains(&modifier))
    }
}
