//! Terminal key-state adapter (crossterm).
//!
//! Puts the terminal into raw mode and turns the key events typed into this
//! window into virtual-key state for the sampler.  Keys typed into other
//! windows are never seen.
//!
//! # Press and release
//!
//! Terminals that support the keyboard enhancement protocol report press,
//! repeat and release events, so a key stays down until it is released.
//! Other terminals only report presses (plus auto-repeat); there a key
//! counts as down for the tick in which its event arrived, so every
//! auto-repeat shows up as a fresh press.
//!
//! # Modifiers
//!
//! The terminal has already applied shift and caps-lock to the characters it
//! delivers.  The adapter reports a shift state that makes the translator
//! reproduce exactly the delivered character: uppercase letters and shifted
//! digit symbols are reported with the effective shift state.

use std::io::{self, stdout};
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers,
    KeyboardEnhancementFlags, ModifierKeyCode, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use tracing::{debug, warn};

use keybridge_core::keymap::translate::digit_for_shifted;
use keybridge_core::keymap::windows_vk::{
    digit_vk, letter_vk, VK_BACK, VK_DOWN, VK_LEFT, VK_RETURN, VK_RIGHT, VK_SPACE, VK_UP,
};
use keybridge_core::{KeyStateSource, Modifier};

/// Maps a terminal key to its VK code and the shift state that reproduces it.
///
/// Returns `None` for keys the bridge does not transmit.
pub fn map_key(code: KeyCode, modifiers: KeyModifiers, caps_lock: bool) -> Option<(u8, bool)> {
    let shift_flag = modifiers.contains(KeyModifiers::SHIFT);
    match code {
        KeyCode::Char(c) => {
            if let Some(vk) = letter_vk(c) {
                let effective = c.is_ascii_uppercase() ^ caps_lock;
                Some((vk, effective || (shift_flag && !caps_lock)))
            } else if let Some(vk) = digit_vk(c) {
                Some((vk, false))
            } else if let Some(digit) = digit_for_shifted(c) {
                digit_vk(digit).map(|vk| (vk, true))
            } else if c == ' ' {
                Some((VK_SPACE, shift_flag))
            } else {
                None
            }
        }
        KeyCode::Backspace => Some((VK_BACK, shift_flag)),
        KeyCode::Enter => Some((VK_RETURN, shift_flag)),
        KeyCode::Left => Some((VK_LEFT, shift_flag)),
        KeyCode::Up => Some((VK_UP, shift_flag)),
        KeyCode::Right => Some((VK_RIGHT, shift_flag)),
        KeyCode::Down => Some((VK_DOWN, shift_flag)),
        _ => None,
    }
}

/// Maps a modifier key to the modifier it holds.
fn modifier_of(code: ModifierKeyCode) -> Option<Modifier> {
    match code {
        ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => Some(Modifier::Shift),
        ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => Some(Modifier::Control),
        ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => Some(Modifier::Alt),
        _ => None,
    }
}

/// Keyboard state accumulated from terminal key events.
#[derive(Debug, Clone)]
pub struct KeySnapshot {
    down: [bool; 256],
    shift: bool,
    control: bool,
    alt: bool,
    caps_lock: bool,
}

impl Default for KeySnapshot {
    fn default() -> Self {
        Self {
            down: [false; 256],
            shift: false,
            control: false,
            alt: false,
            caps_lock: false,
        }
    }
}

impl KeySnapshot {
    /// Forgets every pressed key and held modifier.  Caps-lock is kept.
    pub fn clear_pressed(&mut self) {
        self.down = [false; 256];
        self.shift = false;
        self.control = false;
        self.alt = false;
    }

    /// Folds one terminal key event into the snapshot.
    pub fn apply(&mut self, event: KeyEvent) {
        let pressed = !matches!(event.kind, KeyEventKind::Release);
        self.caps_lock = event.state.contains(KeyEventState::CAPS_LOCK);

        if let KeyCode::Modifier(code) = event.code {
            if let Some(modifier) = modifier_of(code) {
                self.set_held(modifier, pressed);
                self.down[modifier.vk() as usize] = pressed;
            }
            return;
        }

        if pressed {
            self.control = event.modifiers.contains(KeyModifiers::CONTROL);
            self.alt = event.modifiers.contains(KeyModifiers::ALT);
        }
        if let Some((vk, shift)) = map_key(event.code, event.modifiers, self.caps_lock) {
            self.down[vk as usize] = pressed;
            if pressed {
                self.shift = shift;
            }
        }
    }

    fn set_held(&mut self, modifier: Modifier, held: bool) {
        match modifier {
            Modifier::Shift => self.shift = held,
            Modifier::Control => self.control = held,
            Modifier::Alt => self.alt = held,
            Modifier::CapsLock => {}
        }
    }
}

impl KeyStateSource for KeySnapshot {
    fn is_down(&self, vk: u8) -> bool {
        self.down[vk as usize]
    }

    fn is_held(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Shift => self.shift,
            Modifier::Control => self.control,
            Modifier::Alt => self.alt,
            Modifier::CapsLock => false,
        }
    }

    fn is_toggled(&self, modifier: Modifier) -> bool {
        modifier == Modifier::CapsLock && self.caps_lock
    }
}

/// Raw-mode terminal as a [`KeyStateSource`].
///
/// Raw mode (and the keyboard enhancement flags, when pushed) are restored
/// when the value is dropped.
#[derive(Debug)]
pub struct TerminalKeyState {
    snapshot: KeySnapshot,
    reports_release: bool,
}

impl TerminalKeyState {
    /// Enables raw mode and, when supported, press/release reporting.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the terminal cannot be switched to raw mode.
    pub fn open() -> io::Result<Self> {
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        enable_raw_mode()?;
        let mut state = Self {
            snapshot: KeySnapshot::default(),
            reports_release: false,
        };
        if enhanced {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
            state.reports_release = true;
        }
        debug!("terminal key input ready (release events: {})", state.reports_release);
        Ok(state)
    }

    pub fn reports_release(&self) -> bool {
        self.reports_release
    }
}

impl KeyStateSource for TerminalKeyState {
    fn begin_tick(&mut self) -> io::Result<()> {
        if !self.reports_release {
            self.snapshot.clear_pressed();
        }
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.snapshot.apply(key);
            }
        }
        Ok(())
    }

    fn is_down(&self, vk: u8) -> bool {
        self.snapshot.is_down(vk)
    }

    fn is_held(&self, modifier: Modifier) -> bool {
        self.snapshot.is_held(modifier)
    }

    fn is_toggled(&self, modifier: Modifier) -> bool {
        self.snapshot.is_toggled(modifier)
    }
}

impl Drop for TerminalKeyState {
    fn drop(&mut self) {
        if self.reports_release {
            if let Err(e) = execute!(stdout(), PopKeyboardEnhancementFlags) {
                warn!("failed to restore keyboard flags: {e}");
            }
        }
        if let Err(e) = disable_raw_mode() {
            warn!("failed to leave raw mode: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
