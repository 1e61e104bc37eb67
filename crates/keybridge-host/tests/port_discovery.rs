//! Integration tests for interactive port discovery.
//!
//! `connect` drives the discovery state machine and consults the operator
//! console only for access-denied failures.  These tests replace the console
//! with a scripted one and the serial ports with [`MockPortProvider`].

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use keybridge_host::application::discover_port::{
    connect, DiscoveryError, DiscoveryOptions, FailureClassifier, OpenFailure, OpenFailureKind,
    OperatorConsole, PortDiscovery, PortError, PortInfo, RecoveryChoice, SerialSettings,
    DEFAULT_DETECT_MARKERS,
};
use keybridge_host::infrastructure::serial::mock::MockPortProvider;

// ── Scripted console ──────────────────────────────────────────────────────────

/// Answers recovery prompts from a queue and records everything shown.
#[derive(Debug, Default)]
struct ScriptedConsole {
    answers: VecDeque<RecoveryChoice>,
    lines: Vec<String>,
    prompts: Vec<OpenFailure>,
}

impl ScriptedConsole {
    fn answering(answers: &[RecoveryChoice]) -> Self {
        Self {
            answers: answers.iter().cloned().collect(),
            ..Self::default()
        }
    }
}

impl OperatorConsole for ScriptedConsole {
    fn status(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn prompt_recovery(&mut self, failure: &OpenFailure) -> io::Result<RecoveryChoice> {
        self.prompts.push(failure.clone());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn options(preferred: Option<&str>) -> DiscoveryOptions {
    DiscoveryOptions {
        preferred_port: preferred.map(str::to_string),
        detect_markers: DEFAULT_DETECT_MARKERS.iter().map(|m| m.to_string()).collect(),
        classifier: FailureClassifier::default(),
        settings: SerialSettings {
            settle_delay: Duration::ZERO,
            ..SerialSettings::default()
        },
    }
}

fn denied(port: &str) -> PortError {
    PortError::new(format!("could not open port '{port}': PermissionError(13, 'Access is denied.')"))
}

fn missing(port: &str) -> PortError {
    PortError::new(format!("{port}: The system cannot find the file specified."))
        .with_io_kind(io::ErrorKind::NotFound)
}

/// Enumerates D (an Arduino), X and Y.
fn board_provider() -> MockPortProvider {
    MockPortProvider::new(vec![
        PortInfo::new("X", "Communications Port"),
        PortInfo::new("D", "USB-SERIAL CH340"),
        PortInfo::new("Y", "Bluetooth link"),
    ])
}

// ── Candidate order ───────────────────────────────────────────────────────────

#[test]
fn test_candidates_try_preferred_then_detected_then_enumerated() {
    // Arrange
    let provider = board_provider();
    for port in ["P", "D", "X"] {
        provider.fail_next_open(port, missing(port));
    }
    let mut discovery = PortDiscovery::new(&provider, options(Some("P")));
    let mut console = ScriptedConsole::default();

    // Act
    let connection = connect(&mut discovery, &mut console).expect("Y should open");

    // Assert
    assert_eq!(discovery.candidates(), ["P", "D", "X", "Y"]);
    assert_eq!(provider.open_attempts(), ["P", "D", "X", "Y"]);
    assert_eq!(connection.port(), "Y");
    assert!(console.prompts.is_empty(), "non-denied failures never prompt");
    assert_eq!(console.lines.last().map(String::as_str), Some("Connected to Y at 9600 baud."));
}

#[test]
fn test_preferred_port_equal_to_enumerated_is_tried_once() {
    let provider = board_provider();
    provider.fail_next_open("X", missing("X"));
    provider.fail_next_open("D", missing("D"));
    provider.fail_next_open("Y", missing("Y"));
    let mut discovery = PortDiscovery::new(&provider, options(Some("X")));
    let mut console = ScriptedConsole::default();

    let result = connect(&mut discovery, &mut console);

    assert!(matches!(result, Err(DiscoveryError::Exhausted { .. })));
    assert_eq!(provider.open_attempts(), ["X", "D", "Y"]);
}

// ── Operator recovery ─────────────────────────────────────────────────────────

#[test]
fn test_denied_port_retried_on_enter() {
    // Arrange
    let provider = board_provider();
    provider.fail_next_open("D", denied("D"));
    let mut discovery = PortDiscovery::new(&provider, options(None));
    let mut console = ScriptedConsole::answering(&[RecoveryChoice::Retry]);

    // Act
    let connection = connect(&mut discovery, &mut console).unwrap();

    // Assert
    assert_eq!(connection.port(), "D");
    assert_eq!(provider.open_attempts(), ["D", "D"]);
    assert_eq!(console.prompts.len(), 1);
    assert_eq!(console.prompts[0].kind, OpenFailureKind::AccessDenied);
}

#[test]
fn test_denied_port_replaced_by_operator_supplied_port() {
    let provider = board_provider();
    provider.fail_next_open("D", denied("D"));
    let mut discovery = PortDiscovery::new(&provider, options(None));
    let mut console = ScriptedConsole::answering(&[RecoveryChoice::parse("COM9\n")]);

    let connection = connect(&mut discovery, &mut console).unwrap();

    assert_eq!(connection.port(), "COM9");
    assert_eq!(provider.open_attempts(), ["D", "COM9"]);
}

#[test]
fn test_failed_alternate_moves_on_to_next_candidate() {
    // Arrange
    let provider = board_provider();
    provider.fail_next_open("D", denied("D"));
    provider.fail_next_open("COM9", denied("COM9"));
    let mut discovery = PortDiscovery::new(&provider, options(None));
    let mut console = ScriptedConsole::answering(&[RecoveryChoice::Alternate("COM9".into())]);

    // Act
    let connection = connect(&mut discovery, &mut console).unwrap();

    // Assert: the alternate is not prompted for again.
    assert_eq!(provider.open_attempts(), ["D", "COM9", "X"]);
    assert_eq!(connection.port(), "X");
    assert_eq!(console.prompts.len(), 1);
}

#[test]
fn test_operator_abort_stops_discovery() {
    // Arrange
    let provider = board_provider();
    provider.fail_next_open("D", denied("D"));
    let mut discovery = PortDiscovery::new(&provider, options(None));
    let mut console = ScriptedConsole::answering(&[RecoveryChoice::parse("salir")]);

    // Act
    let err = connect(&mut discovery, &mut console).unwrap_err();

    // Assert
    assert!(matches!(err, DiscoveryError::Aborted { .. }));
    assert_eq!(err.last_error().map(|f| f.port.as_str()), Some("D"));
    assert_eq!(provider.open_attempts(), ["D"], "remaining candidates are not tried");
    assert!(console
        .lines
        .last()
        .is_some_and(|l| l.starts_with("Could not connect to the serial device")));
}

#[test]
fn test_unreadable_console_is_treated_as_abort() {
    let provider = board_provider();
    provider.fail_next_open("D", denied("D"));
    let mut discovery = PortDiscovery::new(&provider, options(None));
    let mut console = ScriptedConsole::default();

    let err = connect(&mut discovery, &mut console).unwrap_err();

    assert!(matches!(err, DiscoveryError::Aborted { .. }));
}

// ── Exhaustion ────────────────────────────────────────────────────────────────

#[test]
fn test_no_ports_reports_exhausted_without_last_error() {
    let provider = MockPortProvider::new(Vec::new());
    let mut discovery = PortDiscovery::new(&provider, options(None));
    let mut console = ScriptedConsole::default();

    let err = connect(&mut discovery, &mut console).unwrap_err();

    assert!(matches!(err, DiscoveryError::Exhausted { last_error: None }));
    assert_eq!(console.lines.first().map(String::as_str), Some("No serial ports found."));
    assert!(provider.open_attempts().is_empty());
}
