//! PortDiscovery: finds and opens the serial device.
//!
//! Candidates are tried in priority order: the preferred port, then the
//! auto-detected port, then every other enumerated port.  The first port that
//! opens wins.
//!
//! An open failure that looks like "access denied / port busy" is usually
//! caused by another program holding the port and can be fixed by the
//! operator.  [`PortDiscovery`] never talks to the console itself: it returns
//! [`DiscoveryStep::NeedsOperator`] and waits for [`PortDiscovery::resolve`].
//! [`connect`] is the outer loop that owns the console interaction.

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

// ── Port provider abstraction ─────────────────────────────────────────────────

/// One enumerated serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Identifier passed to `open` (`COM3`, `/dev/ttyUSB0`).
    pub id: String,
    /// Human-readable metadata (USB product / manufacturer).
    pub description: String,
}

impl PortInfo {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Raw error reported by a [`PortProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PortError {
    /// Driver error text, matched against the access-denied markers.
    pub message: String,
    /// Underlying I/O error kind, when the driver exposes one.
    pub io_kind: Option<io::ErrorKind>,
}

impl PortError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            io_kind: None,
        }
    }

    pub fn with_io_kind(mut self, kind: io::ErrorKind) -> Self {
        self.io_kind = Some(kind);
        self
    }
}

/// Serial device enumeration and opening.
///
/// The production implementation wraps the `serialport` crate; tests use
/// [`crate::infrastructure::serial::mock::MockPortProvider`].
pub trait PortProvider {
    /// Writable byte channel produced by [`PortProvider::open`].
    type Channel: Write;

    /// Lists the currently visible serial devices, in enumeration order.
    fn list_ports(&self) -> Result<Vec<PortInfo>, PortError>;

    /// Opens `port` at `baud` with the given read timeout.
    fn open(&self, port: &str, baud: u32, timeout: Duration) -> Result<Self::Channel, PortError>;
}

// ── Connection ────────────────────────────────────────────────────────────────

/// Link parameters used for every open attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud: u32,
    /// Read timeout; zero means non-blocking reads.
    pub timeout: Duration,
    /// Pause after a successful open while the device resets.
    pub settle_delay: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud: 9600,
            timeout: Duration::ZERO,
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// An open serial channel, exclusively owned by the session.
#[derive(Debug)]
pub struct Connection<C> {
    port: String,
    baud: u32,
    timeout: Duration,
    channel: C,
}

impl<C: Write> Connection<C> {
    pub fn new(port: impl Into<String>, baud: u32, timeout: Duration, channel: C) -> Self {
        Self {
            port: port.into(),
            baud,
            timeout,
            channel,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Flushes pending bytes and releases the port.
    pub fn close(mut self) -> io::Result<()> {
        let flushed = self.channel.flush();
        info!("closing serial connection on {}", self.port);
        drop(self.channel);
        flushed
    }
}

impl<C: Write> Write for Connection<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.channel.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.channel.flush()
    }
}

// ── Failure classification ────────────────────────────────────────────────────

/// How an open failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailureKind {
    /// Port denied or busy; the operator may retry, redirect or abort.
    AccessDenied,
    /// Anything else; the candidate is skipped.
    Other,
}

/// A classified open failure for one port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not open {port}: {message}")]
pub struct OpenFailure {
    pub port: String,
    pub kind: OpenFailureKind,
    pub message: String,
}

/// Markers recognised as "access denied / port busy" by default.
///
/// Driver error text differs per platform and locale, so the list is
/// configurable.
pub const DEFAULT_ACCESS_DENIED_MARKERS: &[&str] = &[
    "Access is denied",
    "PermissionError",
    "Acceso denegado",
    "Accesso denegado",
    "could not open port",
    "Permission denied",
    "Device or resource busy",
];

/// Classifies open failures by case-sensitive substring match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureClassifier {
    access_denied_markers: Vec<String>,
}

impl FailureClassifier {
    pub fn new(access_denied_markers: Vec<String>) -> Self {
        Self {
            access_denied_markers,
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.access_denied_markers
    }

    /// Classifies `error`.
    ///
    /// An I/O kind of `PermissionDenied` is access-denied regardless of the
    /// message text.
    pub fn classify(&self, error: &PortError) -> OpenFailureKind {
        let by_kind = error.io_kind == Some(io::ErrorKind::PermissionDenied);
        let by_text = self
            .access_denied_markers
            .iter()
            .any(|marker| !marker.is_empty() && error.message.contains(marker.as_str()));
        if by_kind || by_text {
            OpenFailureKind::AccessDenied
        } else {
            OpenFailureKind::Other
        }
    }

    fn failure(&self, port: &str, error: &PortError) -> OpenFailure {
        OpenFailure {
            port: port.to_string(),
            kind: self.classify(error),
            message: error.message.clone(),
        }
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_ACCESS_DENIED_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        )
    }
}

// ── Candidate list ────────────────────────────────────────────────────────────

/// Description markers of common USB-to-serial adapters.
pub const DEFAULT_DETECT_MARKERS: &[&str] = &["Arduino", "CH340", "USB-SERIAL"];

/// Returns the first enumerated port whose description contains a marker.
pub fn detect_port<'a>(ports: &'a [PortInfo], markers: &[String]) -> Option<&'a PortInfo> {
    ports.iter().find(|port| {
        markers
            .iter()
            .any(|marker| !marker.is_empty() && port.description.contains(marker.as_str()))
    })
}

/// Builds the ordered, de-duplicated candidate list.
///
/// Order: `preferred`, then `detected`, then every enumerated port in
/// enumeration order.
pub fn build_candidates(
    preferred: Option<&str>,
    detected: Option<&str>,
    enumerated: &[PortInfo],
) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(enumerated.len() + 2);
    let ordered = preferred
        .into_iter()
        .chain(detected)
        .chain(enumerated.iter().map(|p| p.id.as_str()));
    for id in ordered {
        if !id.is_empty() && !candidates.iter().any(|c| c == id) {
            candidates.push(id.to_string());
        }
    }
    candidates
}

// ── Discovery state machine ───────────────────────────────────────────────────

/// Error returned when no connection could be established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("no serial port could be opened (last error: {})", describe(.last_error))]
    Exhausted { last_error: Option<OpenFailure> },
    #[error("port discovery aborted by the operator (last error: {})", describe(.last_error))]
    Aborted { last_error: Option<OpenFailure> },
}

impl DiscoveryError {
    pub fn last_error(&self) -> Option<&OpenFailure> {
        match self {
            DiscoveryError::Exhausted { last_error } | DiscoveryError::Aborted { last_error } => {
                last_error.as_ref()
            }
        }
    }
}

fn describe(last_error: &Option<OpenFailure>) -> String {
    match last_error {
        Some(failure) => failure.to_string(),
        None => "no candidate ports".to_string(),
    }
}

/// The operator's answer to an access-denied failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryChoice {
    /// Try the same port again.
    Retry,
    /// Try this port instead, once.
    Alternate(String),
    /// Give up on discovery.
    Abort,
}

impl RecoveryChoice {
    /// Parses one line of operator input.
    ///
    /// Empty input retries; `exit`, `quit`, `q` or `salir` (any case) abort;
    /// anything else is a port identifier.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return RecoveryChoice::Retry;
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "exit" | "quit" | "q" | "salir" => RecoveryChoice::Abort,
            _ => RecoveryChoice::Alternate(trimmed.to_string()),
        }
    }
}

/// Result of a single discovery step.
#[derive(Debug)]
pub enum DiscoveryStep<C> {
    /// A port opened and settled.
    Connected(Connection<C>),
    /// A candidate failed with a non-recoverable error; call `advance` again.
    Skipped(OpenFailure),
    /// A candidate is denied or busy; answer with `resolve`.
    NeedsOperator(OpenFailure),
    /// Discovery is over without a connection.
    Failed(DiscoveryError),
}

/// Inputs to [`PortDiscovery::new`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryOptions {
    pub preferred_port: Option<String>,
    pub detect_markers: Vec<String>,
    pub classifier: FailureClassifier,
    pub settings: SerialSettings,
}

/// Console-agnostic discovery over an ordered candidate list.
pub struct PortDiscovery<'a, P: PortProvider> {
    provider: &'a P,
    classifier: FailureClassifier,
    settings: SerialSettings,
    candidates: Vec<String>,
    detected: Option<String>,
    next: usize,
    pending: Option<String>,
    last_error: Option<OpenFailure>,
}

impl<'a, P: PortProvider> PortDiscovery<'a, P> {
    /// Enumerates ports and builds the candidate list.
    ///
    /// An enumeration failure is logged and leaves only the preferred port.
    pub fn new(provider: &'a P, options: DiscoveryOptions) -> Self {
        let enumerated = provider.list_ports().unwrap_or_else(|e| {
            warn!("serial port enumeration failed: {e}");
            Vec::new()
        });
        let detected = detect_port(&enumerated, &options.detect_markers).map(|p| p.id.clone());
        if let Some(ref port) = detected {
            info!("auto-detected serial device on {port}");
        }
        let candidates = build_candidates(
            options.preferred_port.as_deref(),
            detected.as_deref(),
            &enumerated,
        );
        debug!("serial candidates: {candidates:?}");

        Self {
            provider,
            classifier: options.classifier,
            settings: options.settings,
            candidates,
            detected,
            next: 0,
            pending: None,
            last_error: None,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn detected(&self) -> Option<&str> {
        self.detected.as_deref()
    }

    /// The candidate the next `advance` call will try.
    pub fn next_candidate(&self) -> Option<&str> {
        self.candidates.get(self.next).map(String::as_str)
    }

    pub fn last_error(&self) -> Option<&OpenFailure> {
        self.last_error.as_ref()
    }

    /// Tries the next candidate.
    pub fn advance(&mut self) -> DiscoveryStep<P::Channel> {
        self.pending = None;
        let Some(port) = self.candidates.get(self.next).cloned() else {
            return DiscoveryStep::Failed(DiscoveryError::Exhausted {
                last_error: self.last_error.clone(),
            });
        };
        self.next += 1;
        self.attempt(&port, true)
    }

    /// Applies the operator's answer to the last `NeedsOperator` step.
    ///
    /// Without a pending failure this behaves like [`PortDiscovery::advance`].
    pub fn resolve(&mut self, choice: RecoveryChoice) -> DiscoveryStep<P::Channel> {
        let Some(port) = self.pending.take() else {
            return self.advance();
        };
        match choice {
            RecoveryChoice::Retry => {
                info!("retrying {port}");
                self.attempt(&port, true)
            }
            RecoveryChoice::Alternate(alternate) => {
                info!("trying operator-supplied port {alternate}");
                self.attempt(&alternate, false)
            }
            RecoveryChoice::Abort => {
                warn!("port discovery aborted by operator");
                DiscoveryStep::Failed(DiscoveryError::Aborted {
                    last_error: self.last_error.clone(),
                })
            }
        }
    }

    fn attempt(&mut self, port: &str, recoverable: bool) -> DiscoveryStep<P::Channel> {
        let settings = self.settings;
        match self.provider.open(port, settings.baud, settings.timeout) {
            Ok(channel) => {
                info!("opened {port} at {} baud", settings.baud);
                if !settings.settle_delay.is_zero() {
                    debug!("waiting {:?} for the device to settle", settings.settle_delay);
                    std::thread::sleep(settings.settle_delay);
                }
                DiscoveryStep::Connected(Connection::new(
                    port,
                    settings.baud,
                    settings.timeout,
                    channel,
                ))
            }
            Err(error) => {
                let failure = self.classifier.failure(port, &error);
                self.last_error = Some(failure.clone());
                if recoverable && failure.kind == OpenFailureKind::AccessDenied {
                    warn!("{failure} (port denied or busy)");
                    self.pending = Some(port.to_string());
                    DiscoveryStep::NeedsOperator(failure)
                } else {
                    warn!("{failure}");
                    DiscoveryStep::Skipped(failure)
                }
            }
        }
    }
}

impl<P: PortProvider> fmt::Debug for PortDiscovery<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortDiscovery")
            .field("candidates", &self.candidates)
            .field("next", &self.next)
            .field("pending", &self.pending)
            .field("last_error", &self.last_error)
            .finish()
    }
}

// ── Interactive driver ────────────────────────────────────────────────────────

/// Line-based operator interaction used during discovery.
pub trait OperatorConsole {
    /// Prints one plain status line.
    fn status(&mut self, line: &str);

    /// Asks the operator how to handle an access-denied failure.
    fn prompt_recovery(&mut self, failure: &OpenFailure) -> io::Result<RecoveryChoice>;
}

/// Runs discovery to completion, consulting `console` on access-denied failures.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when every candidate failed or the operator
/// aborted.  A console read failure is treated as an abort.
pub fn connect<P, K>(
    discovery: &mut PortDiscovery<'_, P>,
    console: &mut K,
) -> Result<Connection<P::Channel>, DiscoveryError>
where
    P: PortProvider,
    K: OperatorConsole + ?Sized,
{
    if discovery.candidates().is_empty() {
        console.status("No serial ports found.");
    }
    if let Some(port) = discovery.next_candidate() {
        console.status(&format!("Trying {port}..."));
    }
    let mut step = discovery.advance();
    loop {
        step = match step {
            DiscoveryStep::Connected(connection) => {
                console.status(&format!(
                    "Connected to {} at {} baud.",
                    connection.port(),
                    connection.baud()
                ));
                return Ok(connection);
            }
            DiscoveryStep::Skipped(failure) => {
                console.status(&format!("Could not open {}: {}", failure.port, failure.message));
                if let Some(port) = discovery.next_candidate() {
                    console.status(&format!("Trying {port}..."));
                }
                discovery.advance()
            }
            DiscoveryStep::NeedsOperator(failure) => {
                console.status(&format!("Could not open {}: {}", failure.port, failure.message));
                let choice = console.prompt_recovery(&failure).unwrap_or_else(|e| {
                    warn!("failed to read operator input: {e}");
                    RecoveryChoice::Abort
                });
                discovery.resolve(choice)
            }
            DiscoveryStep::Failed(error) => {
                console.status(&format!("Could not connect to the serial device: {error}"));
                return Err(error);
            }
        };
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
