//! Windows Virtual Key (VK) codes and their symbol classification.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).
//!
//! # What is a Windows Virtual Key (VK) code? (for beginners)
//!
//! Windows assigns each keyboard key a number called a "Virtual Key code",
//! named `VK_*` in `<winuser.h>` (e.g., `VK_RETURN = 0x0D`, `VK_SPACE = 0x20`).
//! Letters use the contiguous block `0x41..=0x5A` ('A'..'Z') and the top-row
//! digits use `0x30..=0x39` ('0'..'9').  The receiving device expects exactly
//! these conventions, so they are reproduced here rather than remapped.
//!
//! # How this table works
//!
//! `VK_CLASS_TABLE` is a compile-time constant array of 256 [`KeyClass`]
//! values, indexed by VK code.  Position 0x41 holds `KeyClass::Letter('A')`
//! because `VK_A` is 0x41.  Codes the bridge does not transmit store
//! `KeyClass::Unmapped`.

use crate::protocol::messages::ControlToken;

// ── Named VK codes ────────────────────────────────────────────────────────────

pub const VK_BACK: u8 = 0x08;
pub const VK_RETURN: u8 = 0x0D;
pub const VK_SHIFT: u8 = 0x10;
pub const VK_CONTROL: u8 = 0x11;
pub const VK_MENU: u8 = 0x12;
pub const VK_CAPITAL: u8 = 0x14;
pub const VK_SPACE: u8 = 0x20;
pub const VK_LEFT: u8 = 0x25;
pub const VK_UP: u8 = 0x26;
pub const VK_RIGHT: u8 = 0x27;
pub const VK_DOWN: u8 = 0x28;
pub const VK_0: u8 = 0x30;
pub const VK_9: u8 = 0x39;
pub const VK_A: u8 = 0x41;
pub const VK_G: u8 = 0x47;
pub const VK_Z: u8 = 0x5A;

/// Lowest code swept by the key-state sampler.
pub const FIRST_SAMPLED_VK: u8 = 0x01;
/// Highest code swept by the key-state sampler.
pub const LAST_SAMPLED_VK: u8 = 0xFE;

/// How a VK code is turned into a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Not transmitted.
    Unmapped,
    /// Sent as a control token regardless of modifiers.
    Control(ControlToken),
    /// A letter key; holds the uppercase character.
    Letter(char),
    /// A top-row digit key; holds the bare digit.
    Digit(char),
    /// Sent as-is regardless of modifiers.
    Literal(char),
}

/// Looks up the classification of `vk`.
///
/// Never panics; all u8 inputs are handled.
pub fn classify(vk: u8) -> KeyClass {
    VK_CLASS_TABLE[vk as usize]
}

/// Returns the VK code of the letter key for `c` (either case).
pub fn letter_vk(c: char) -> Option<u8> {
    let upper = c.to_ascii_uppercase();
    upper
        .is_ascii_uppercase()
        .then(|| VK_A + (upper as u8 - b'A'))
}

/// Returns the VK code of the top-row digit key for `c`.
pub fn digit_vk(c: char) -> Option<u8> {
    c.is_ascii_digit().then(|| VK_0 + (c as u8 - b'0'))
}

/// Complete VK → class table indexed by VK code (0x00–0xFF).
const VK_CLASS_TABLE: [KeyClass; 256] = {
    let mut t = [KeyClass::Unmapped; 256];

    // ── Control keys ─────────────────────────────────────────────────────────
    t[VK_BACK as usize] = KeyClass::Control(ControlToken::Backspace);
    t[VK_RETURN as usize] = KeyClass::Control(ControlToken::Enter);
    t[VK_LEFT as usize] = KeyClass::Control(ControlToken::ArrowLeft);
    t[VK_UP as usize] = KeyClass::Control(ControlToken::ArrowUp);
    t[VK_RIGHT as usize] = KeyClass::Control(ControlToken::ArrowRight);
    t[VK_DOWN as usize] = KeyClass::Control(ControlToken::ArrowDown);

    // ── Digit row (VK_0=0x30 … VK_9=0x39) ───────────────────────────────────
    let mut vk = VK_0;
    while vk <= VK_9 {
        t[vk as usize] = KeyClass::Digit(vk as char);
        vk += 1;
    }

    // ── Alphabet keys (VK_A=0x41 … VK_Z=0x5A) ────────────────────────────────
    let mut vk = VK_A;
    while vk <= VK_Z {
        t[vk as usize] = KeyClass::Letter(vk as char);
        vk += 1;
    }

    t[VK_SPACE as usize] = KeyClass::Literal(' ');
    t
};

// ── Tests ─────────────────────────────────────────────────────────────────────
