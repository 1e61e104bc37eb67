//! Messages written to the serial device.
//!
//! # Wire format
//!
//! ```text
//! <hostname>|<username>\n      session header, sent once
//! a                             literal symbol (one or more characters)
//! <EN>                          bracketed control token
//! ```
//!
//! There are no length prefixes, checksums or acknowledgements.  The only
//! newline on the wire is the one terminating the header.

use std::fmt;

/// Delimiter between host and user in the session header.
pub const HEADER_DELIMITER: char = '|';

/// Terminator of the session header.
pub const HEADER_TERMINATOR: char = '\n';

// ── Control tokens ────────────────────────────────────────────────────────────

/// A non-printable key sent as a bracketed textual marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlToken {
    Backspace,
    Enter,
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
}

impl ControlToken {
    /// All control tokens, in virtual-key order.
    pub const ALL: [ControlToken; 6] = [
        ControlToken::Backspace,
        ControlToken::Enter,
        ControlToken::ArrowLeft,
        ControlToken::ArrowUp,
        ControlToken::ArrowRight,
        ControlToken::ArrowDown,
    ];

    /// Returns the exact marker written to the wire.
    pub fn as_wire(self) -> &'static str {
        match self {
            ControlToken::Backspace => "<BK>",
            ControlToken::Enter => "<EN>",
            ControlToken::ArrowLeft => "<LEFT>",
            ControlToken::ArrowUp => "<UP>",
            ControlToken::ArrowRight => "<RIGHT>",
            ControlToken::ArrowDown => "<DOWN>",
        }
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

// ── Symbol events ─────────────────────────────────────────────────────────────

/// The result of translating one key-press edge.
///
/// Consumed immediately by the session emitter; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolEvent {
    /// Characters sent as-is (`"a"`, `"A"`, `"!"`, `" "`).
    Literal(String),
    /// A named control key.
    Control(ControlToken),
}

impl SymbolEvent {
    /// Convenience constructor for a single-character literal.
    pub fn literal(c: char) -> Self {
        SymbolEvent::Literal(c.to_string())
    }

    /// Returns the bytes written to the wire for this event.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        match self {
            SymbolEvent::Literal(text) => text.as_bytes().to_vec(),
            SymbolEvent::Control(token) => token.as_wire().as_bytes().to_vec(),
        }
    }
}

impl fmt::Display for SymbolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolEvent::Literal(text) => f.write_str(text),
            SymbolEvent::Control(token) => token.fmt(f),
        }
    }
}

// ── Session header ────────────────────────────────────────────────────────────

/// Identifies the session to the receiving device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHeader {
    host: String,
    user: String,
}

impl SessionHeader {
    /// Creates a header for `host` and `user`.
    ///
    /// The delimiter and line terminators are replaced with `_` in both parts
    /// so that the header is always exactly one line with one delimiter.
    pub fn new(host: impl AsRef<str>, user: impl AsRef<str>) -> Self {
        Self {
            host: sanitize_part(host.as_ref()),
            user: sanitize_part(user.as_ref()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Encodes the header as `"<host>|<user>\n"`.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for SessionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{HEADER_DELIMITER}{}{HEADER_TERMINATOR}",
            self.host, self.user
        )
    }
}

fn sanitize_part(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            HEADER_DELIMITER | '\r' | '\n' => '_',
            other => other,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_tokens_encode_to_bracketed_markers() {
        let wire: Vec<&str> = ControlToken::ALL.iter().map(|t| t.as_wire()).collect();
        assert_eq!(wire, ["<BK>", "<EN>", "<LEFT>", "<UP>", "<RIGHT>", "<DOWN>"]);
    }

    #[test]
    fn test_literal_event_encodes_its_text_verbatim() {
        assert_eq!(SymbolEvent::literal('a').to_wire_bytes(), b"a");
        assert_eq!(SymbolEvent::literal(' ').to_wire_bytes(), b" ");
    }

    #[test]
    fn test_control_event_encodes_token() {
        let event = SymbolEvent::Control(ControlToken::Enter);
        assert_eq!(event.to_wire_bytes(), b"<EN>");
        assert_eq!(event.to_string(), "<EN>");
    }

    #[test]
    fn test_header_is_pipe_delimited_and_newline_terminated() {
        let header = SessionHeader::new("BOX1", "alice");
        assert_eq!(header.to_wire_bytes(), b"BOX1|alice\n");
    }

    #[test]
    fn test_header_replaces_framing_characters_in_parts() {
        // Arrange
        let header = SessionHeader::new("host|evil\n", "bob\r");

        // Act
        let wire = header.to_string();

        // Assert
        assert_eq!(wire, "host_evil_|bob_\n");
        assert_eq!(wire.matches('|').count(), 1);
        assert_eq!(wire.matches('\n').count(), 1);
    }

    #[test]
    fn test_header_keeps_non_ascii_names() {
        let header = SessionHeader::new("équipe", "josé");
        assert_eq!(header.host(), "équipe");
        assert_eq!(header.user(), "josé");
    }
}
