//! Integration tests for translation and press-edge sampling.
//!
//! These tests drive the public API of `keybridge-core` the way the host
//! polling loop does: sample a scripted keyboard, translate each press edge
//! with the current modifiers and collect the wire bytes.

use std::collections::HashSet;

use keybridge_core::keymap::translate::SHIFT_SYMBOLS;
use keybridge_core::keymap::windows_vk::{classify, KeyClass, VK_A, VK_RETURN, VK_Z};
use keybridge_core::{
    translate, ControlToken, KeySampler, KeyStateSource, Modifier, ModifierState, SymbolEvent,
    VkRange,
};

const MODIFIER_COMBOS: [ModifierState; 4] = [
    ModifierState { shift: false, caps_lock: false },
    ModifierState { shift: true, caps_lock: false },
    ModifierState { shift: false, caps_lock: true },
    ModifierState { shift: true, caps_lock: true },
];

// ── Translator properties ─────────────────────────────────────────────────────

#[test]
fn test_unmapped_codes_never_produce_an_event() {
    let mut unmapped = 0;
    for vk in 0u8..=255 {
        if classify(vk) != KeyClass::Unmapped {
            continue;
        }
        unmapped += 1;
        for mods in MODIFIER_COMBOS {
            assert_eq!(translate(vk, mods), None, "VK 0x{vk:02X} with {mods:?}");
        }
    }
    // 256 codes minus 26 letters, 10 digits, 6 control keys and space.
    assert_eq!(unmapped, 256 - 26 - 10 - 6 - 1);
}

#[test]
fn test_letter_case_follows_shift_xor_caps_lock() {
    for vk in VK_A..=VK_Z {
        let upper = (vk as char).to_string();
        let lower = upper.to_ascii_lowercase();

        let cases = [
            (true, false, &upper),
            (false, true, &upper),
            (true, true, &lower),
            (false, false, &lower),
        ];
        for (shift, caps, expected) in cases {
            assert_eq!(
                translate(vk, ModifierState::new(shift, caps)),
                Some(SymbolEvent::Literal(expected.clone())),
                "VK 0x{vk:02X} shift={shift} caps={caps}"
            );
        }
    }
}

#[test]
fn test_every_digit_has_its_documented_shift_symbol() {
    let expected = [
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
    assert_eq!(SHIFT_SYMBOLS, expected);

    for (digit, symbol) in expected {
        let vk = digit as u8;
        for caps in [false, true] {
            assert_eq!(
                translate(vk, ModifierState::new(true, caps)),
                Some(SymbolEvent::literal(symbol))
            );
            assert_eq!(
                translate(vk, ModifierState::new(false, caps)),
                Some(SymbolEvent::literal(digit))
            );
        }
    }
}

#[test]
fn test_control_tokens_are_modifier_invariant() {
    let controls = [
        (0x08u8, ControlToken::Backspace),
        (0x0D, ControlToken::Enter),
        (0x25, ControlToken::ArrowLeft),
        (0x26, ControlToken::ArrowUp),
        (0x27, ControlToken::ArrowRight),
        (0x28, ControlToken::ArrowDown),
    ];
    for (vk, token) in controls {
        for mods in MODIFIER_COMBOS {
            assert_eq!(translate(vk, mods), Some(SymbolEvent::Control(token)));
        }
    }
}

// ── Sampler properties ────────────────────────────────────────────────────────

/// Keyboard whose state is replaced wholesale between ticks.
#[derive(Default)]
struct Keyboard {
    down: HashSet<u8>,
    shift: bool,
    caps: bool,
}

impl KeyStateSource for Keyboard {
    fn is_down(&self, vk: u8) -> bool {
        self.down.contains(&vk)
    }
    fn is_held(&self, modifier: Modifier) -> bool {
        modifier == Modifier::Shift && self.shift
    }
    fn is_toggled(&self, modifier: Modifier) -> bool {
        modifier == Modifier::CapsLock && self.caps
    }
}

fn translate_edges(sampler: &mut KeySampler, keyboard: &Keyboard) -> Vec<SymbolEvent> {
    let mods = ModifierState::new(
        keyboard.is_held(Modifier::Shift),
        keyboard.is_toggled(Modifier::CapsLock),
    );
    sampler
        .sample(keyboard)
        .into_iter()
        .filter_map(|vk| translate(vk, mods))
        .collect()
}

#[test]
fn test_key_held_for_many_ticks_emits_exactly_once() {
    // Arrange
    let mut sampler = KeySampler::new(VkRange::FULL);
    let mut keyboard = Keyboard::default();
    keyboard.down.insert(VK_A);

    // Act
    let emitted: Vec<SymbolEvent> = (0..50)
        .flat_map(|_| translate_edges(&mut sampler, &keyboard))
        .collect();

    // Assert
    assert_eq!(emitted, vec![SymbolEvent::literal('a')]);
}

#[test]
fn test_release_and_press_again_emits_twice() {
    let mut sampler = KeySampler::new(VkRange::FULL);
    let mut keyboard = Keyboard::default();

    keyboard.down.insert(VK_RETURN);
    let first = translate_edges(&mut sampler, &keyboard);
    keyboard.down.clear();
    let released = translate_edges(&mut sampler, &keyboard);
    keyboard.down.insert(VK_RETURN);
    let second = translate_edges(&mut sampler, &keyboard);

    assert_eq!(first, vec![SymbolEvent::Control(ControlToken::Enter)]);
    assert!(released.is_empty());
    assert_eq!(second, first);
}

#[test]
fn test_modifier_keys_alone_emit_nothing() {
    let mut sampler = KeySampler::new(VkRange::FULL);
    let mut keyboard = Keyboard::default();
    keyboard.shift = true;
    keyboard.down.extend([Modifier::Shift.vk(), Modifier::Control.vk()]);

    assert!(translate_edges(&mut sampler, &keyboard).is_empty());
}

#[test]
fn test_typing_sequence_produces_expected_wire_bytes() {
    // Arrange: a, caps-lock a, shift+1, enter – one press per tick with
    // releases in between.
    let mut sampler = KeySampler::new(VkRange::FULL);
    let steps: [(&[u8], bool, bool); 7] = [
        (&[VK_A], false, false),
        (&[], false, true),
        (&[VK_A], false, true),
        (&[], false, false),
        (&[0x31], true, false),
        (&[], false, false),
        (&[VK_RETURN], false, false),
    ];

    // Act
    let mut wire = Vec::new();
    for (down, shift, caps) in steps {
        let keyboard = Keyboard {
            down: down.iter().copied().collect(),
            shift,
            caps,
        };
        for event in translate_edges(&mut sampler, &keyboard) {
            wire.extend(event.to_wire_bytes());
        }
    }

    // Assert
    assert_eq!(wire, b"aA!<EN>");
}
