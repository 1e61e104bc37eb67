//! Symbol translation: pressed VK code plus modifiers → [`SymbolEvent`].
//!
//! Precedence:
//!
//! 1. Control keys emit their token; modifiers are ignored.
//! 2. Letters are uppercase when exactly one of shift / caps-lock is active.
//! 3. Digits emit their shifted symbol when shift is held, else the digit.
//!    Caps-lock has no effect.
//! 4. Other literals (space) are emitted unchanged.
//! 5. Anything else produces no event.

use super::windows_vk::{classify, KeyClass};
use crate::protocol::messages::SymbolEvent;

/// Modifier state sampled alongside a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Shift is physically held.
    pub shift: bool,
    /// Caps-lock is toggled on.
    pub caps_lock: bool,
}

impl ModifierState {
    pub fn new(shift: bool, caps_lock: bool) -> Self {
        Self { shift, caps_lock }
    }
}

/// Shifted symbol for each top-row digit (US layout).
pub const SHIFT_SYMBOLS: [(char, char); 10] = [
    ('1', '!'),
    ('2', '@'),
    ('3', '#'),
    ('4', '$'),
    ('5', '%'),
    ('6', '^'),
    ('7', '&'),
    ('8', '*'),
    ('9', '('),
    ('0', ')'),
];

/// Returns the shifted symbol for `digit`, if one exists.
pub fn shifted_digit(digit: char) -> Option<char> {
    SHIFT_SYMBOLS
        .iter()
        .find(|&&(d, _)| d == digit)
        .map(|&(_, symbol)| symbol)
}

/// Returns the digit whose shifted symbol is `symbol`.
pub fn digit_for_shifted(symbol: char) -> Option<char> {
    SHIFT_SYMBOLS
        .iter()
        .find(|&&(_, s)| s == symbol)
        .map(|&(digit, _)| digit)
}

/// Translates a pressed key into the symbol to transmit.
///
/// Returns `None` for codes outside the classification table.
pub fn translate(vk: u8, modifiers: ModifierState) -> Option<SymbolEvent> {
    match classify(vk) {
        KeyClass::Unmapped => None,
        KeyClass::Control(token) => Some(SymbolEvent::Control(token)),
        KeyClass::Letter(upper) => {
            if modifiers.shift ^ modifiers.caps_lock {
                Some(SymbolEvent::literal(upper))
            } else {
                Some(SymbolEvent::literal(upper.to_ascii_lowercase()))
            }
        }
        KeyClass::Digit(digit) => {
            let symbol = match shifted_digit(digit) {
                Some(shifted) if modifiers.shift => shifted,
                _ => digit,
            };
            Some(SymbolEvent::literal(symbol))
        }
        KeyClass::Literal(c) => Some(SymbolEvent::literal(c)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
