//! Press-edge sampling over the fixed virtual-key range.
//!
//! Each polling tick the [`KeySampler`] asks a [`KeyStateSource`] whether every
//! code in its [`VkRange`] is down, compares the answer with the previous
//! sample and reports the codes that went from up to down.  The stored bit is
//! overwritten for every code on every tick, so a key held across many ticks
//! produces exactly one press edge and a release re-arms it.
//!
//! The [`ExitCombination`] is checked by the caller before the sweep; when it
//! is satisfied the tick ends without sampling.

use std::fmt;
use std::io;
use std::str::FromStr;

use thiserror::Error;

use crate::keymap::windows_vk::{
    FIRST_SAMPLED_VK, LAST_SAMPLED_VK, VK_CAPITAL, VK_CONTROL, VK_G, VK_MENU, VK_SHIFT,
};

// ── Capability interface ──────────────────────────────────────────────────────

/// A modifier key queried separately from the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Shift,
    Control,
    Alt,
    CapsLock,
}

impl Modifier {
    /// The generic VK code of this modifier.
    pub fn vk(self) -> u8 {
        match self {
            Modifier::Shift => VK_SHIFT,
            Modifier::Control => VK_CONTROL,
            Modifier::Alt => VK_MENU,
            Modifier::CapsLock => VK_CAPITAL,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modifier::Shift => "shift",
            Modifier::Control => "control",
            Modifier::Alt => "alt",
            Modifier::CapsLock => "capslock",
        })
    }
}

/// Error returned when a modifier name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown modifier name: {0:?}")]
pub struct UnknownModifier(pub String);

impl FromStr for Modifier {
    type Err = UnknownModifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shift" => Ok(Modifier::Shift),
            "control" | "ctrl" => Ok(Modifier::Control),
            "alt" | "menu" => Ok(Modifier::Alt),
            "capslock" | "caps" | "capital" => Ok(Modifier::CapsLock),
            _ => Err(UnknownModifier(s.to_string())),
        }
    }
}

/// Read-only view of the keyboard, one snapshot per tick.
///
/// The production implementation lives in the host crate; tests drive the
/// sampler with scripted sources.
pub trait KeyStateSource {
    /// Called once at the start of every polling tick, before any query.
    ///
    /// Sources that buffer input refresh their snapshot here.
    fn begin_tick(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Whether the key with code `vk` is currently down.
    fn is_down(&self, vk: u8) -> bool;

    /// Whether `modifier` is currently held.
    fn is_held(&self, modifier: Modifier) -> bool;

    /// Whether `modifier` is toggled on (caps-lock, num-lock).
    fn is_toggled(&self, modifier: Modifier) -> bool;
}

// ── Sweep range ───────────────────────────────────────────────────────────────

/// Error type for invalid sweep ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range start 0x{first:02X} is after range end 0x{last:02X}")]
    Inverted { first: u8, last: u8 },
    #[error("code 0x{0:02X} is outside the sampled range 0x01-0xFE")]
    OutOfBounds(u8),
}

/// Inclusive range of VK codes swept each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VkRange {
    first: u8,
    last: u8,
}

impl VkRange {
    /// The full range 0x01–0xFE.
    pub const FULL: VkRange = VkRange {
        first: FIRST_SAMPLED_VK,
        last: LAST_SAMPLED_VK,
    };

    /// Creates a range, rejecting inverted bounds and codes 0x00 / 0xFF.
    pub fn new(first: u8, last: u8) -> Result<Self, RangeError> {
        for code in [first, last] {
            if !(FIRST_SAMPLED_VK..=LAST_SAMPLED_VK).contains(&code) {
                return Err(RangeError::OutOfBounds(code));
            }
        }
        if first > last {
            return Err(RangeError::Inverted { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> u8 {
        self.first
    }

    pub fn last(&self) -> u8 {
        self.last
    }

    pub fn contains(&self, vk: u8) -> bool {
        (self.first..=self.last).contains(&vk)
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<u8> {
        self.first..=self.last
    }
}

impl Default for VkRange {
    fn default() -> Self {
        Self::FULL
    }
}

// ── Previous-state table ──────────────────────────────────────────────────────

/// "Was down in the previous sample" bit for every VK code.
#[derive(Debug, Clone)]
pub struct KeyStateTable {
    down: [bool; 256],
}

impl KeyStateTable {
    pub fn new() -> Self {
        Self { down: [false; 256] }
    }

    pub fn was_down(&self, vk: u8) -> bool {
        self.down[vk as usize]
    }

    /// Stores `now` for `vk` and returns `true` when this is a press edge.
    pub fn record(&mut self, vk: u8, now: bool) -> bool {
        let slot = &mut self.down[vk as usize];
        let edge = now && !*slot;
        *slot = now;
        edge
    }
}

impl Default for KeyStateTable {
    fn default() -> Self {
        Self::new()
    }
}

// ── Sampler ───────────────────────────────────────────────────────────────────

/// Press-edge detector owned by the polling loop.
#[derive(Debug, Clone, Default)]
pub struct KeySampler {
    range: VkRange,
    table: KeyStateTable,
}

impl KeySampler {
    pub fn new(range: VkRange) -> Self {
        Self {
            range,
            table: KeyStateTable::new(),
        }
    }

    pub fn range(&self) -> VkRange {
        self.range
    }

    pub fn table(&self) -> &KeyStateTable {
        &self.table
    }

    /// Sweeps the range once and returns the codes with a press edge, in
    /// ascending code order.
    pub fn sample<S: KeyStateSource + ?Sized>(&mut self, source: &S) -> Vec<u8> {
        let mut pressed = Vec::new();
        for vk in self.range.iter() {
            if self.table.record(vk, source.is_down(vk)) {
                pressed.push(vk);
            }
        }
        pressed
    }
}

// ── Exit combination ──────────────────────────────────────────────────────────

/// Keys that must all be down together to stop the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitCombination {
    modifiers: Vec<Modifier>,
    key: u8,
}

impl ExitCombination {
    pub fn new(modifiers: Vec<Modifier>, key: u8) -> Self {
        Self { modifiers, key }
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    /// Whether every modifier is held and the key is down right now.
    pub fn is_requested<S: KeyStateSource + ?Sized>(&self, source: &S) -> bool {
        self.modifiers.iter().all(|&m| source.is_held(m)) && source.is_down(self.key)
    }
}

impl Default for ExitCombination {
    /// Ctrl + Shift + G.
    fn default() -> Self {
        Self::new(vec![Modifier::Control, Modifier::Shift], VK_G)
    }
}

impl fmt::Display for ExitCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{modifier}+")?;
        }
        if self.key.is_ascii_alphanumeric() {
            write!(f, "{}", self.key as char)
        } else {
            write!(f, "0x{:02X}", self.key)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
