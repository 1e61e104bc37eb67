//! Session use case: header, polling loop and per-symbol emission.
//!
//! One tick is: exit check, full sweep of the sampled range, translation of
//! every new press, one flushed write per symbol, then the fixed sleep.
//! When the exit combination is held nothing is emitted for that tick.

use std::io::{self, Write};
use std::time::Duration;

use keybridge_core::{
    translate, ExitCombination, KeySampler, KeyStateSource, Modifier, ModifierState,
    SessionHeader, SymbolEvent, VkRange,
};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::application::discover_port::Connection;

/// Default delay between two ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(4);

/// Error type for a running session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The serial channel rejected a write or flush.
    #[error("serial write failed: {0}")]
    Write(#[source] io::Error),

    /// The key-state source could not be refreshed.
    #[error("key state unavailable: {0}")]
    KeyState(#[source] io::Error),
}

// ── Emitter ───────────────────────────────────────────────────────────────────

/// Writes protocol units to the device, flushing after each one.
#[derive(Debug)]
pub struct SessionEmitter<W: Write> {
    channel: W,
    symbols_sent: u64,
}

impl<W: Write> SessionEmitter<W> {
    pub fn new(channel: W) -> Self {
        Self {
            channel,
            symbols_sent: 0,
        }
    }

    /// Sends `host|user\n`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Write`] if the channel rejects the bytes.
    pub fn send_header(&mut self, header: &SessionHeader) -> Result<(), SessionError> {
        info!("sending session header for {}@{}", header.user(), header.host());
        self.send_bytes(&header.to_wire_bytes())
    }

    /// Sends one symbol.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Write`] if the channel rejects the bytes.
    pub fn send(&mut self, event: &SymbolEvent) -> Result<(), SessionError> {
        trace!("emit {event}");
        self.send_bytes(&event.to_wire_bytes())?;
        self.symbols_sent += 1;
        Ok(())
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        self.channel.write_all(bytes).map_err(SessionError::Write)?;
        self.channel.flush().map_err(SessionError::Write)
    }

    pub fn symbols_sent(&self) -> u64 {
        self.symbols_sent
    }

    pub fn into_inner(self) -> W {
        self.channel
    }
}

// ── Polling loop ──────────────────────────────────────────────────────────────

/// Tick timing, sampled range and shutdown chord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingPolicy {
    pub interval: Duration,
    pub range: VkRange,
    pub exit: ExitCombination,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            range: VkRange::FULL,
            exit: ExitCombination::default(),
        }
    }
}

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub ticks: u64,
    pub symbols_sent: u64,
}

/// Runs the polling loop until the exit combination is held.
///
/// # Errors
///
/// Returns the first [`SessionError`]; the loop does not retry writes.
pub fn run_session<S, W>(
    keys: &mut S,
    emitter: &mut SessionEmitter<W>,
    policy: &PollingPolicy,
) -> Result<SessionSummary, SessionError>
where
    S: KeyStateSource + ?Sized,
    W: Write,
{
    let mut sampler = KeySampler::new(policy.range);
    let mut ticks = 0u64;
    let sent_before = emitter.symbols_sent();

    loop {
        keys.begin_tick().map_err(SessionError::KeyState)?;
        ticks += 1;

        if policy.exit.is_requested(&*keys) {
            info!("exit combination {} pressed", policy.exit);
            return Ok(SessionSummary {
                ticks,
                symbols_sent: emitter.symbols_sent() - sent_before,
            });
        }

        let pressed = sampler.sample(&*keys);
        if !pressed.is_empty() {
            let modifiers = ModifierState::new(
                keys.is_held(Modifier::Shift),
                keys.is_toggled(Modifier::CapsLock),
            );
            for vk in pressed {
                match translate(vk, modifiers) {
                    Some(event) => emitter.send(&event)?,
                    None => trace!("vk {vk:#04x} has no symbol"),
                }
            }
        }

        if !policy.interval.is_zero() {
            std::thread::sleep(policy.interval);
        }
    }
}

/// Sends the header, runs the loop, and closes the connection on a clean exit.
///
/// # Errors
///
/// Returns [`SessionError::Write`] for header, symbol or close failures and
/// [`SessionError::KeyState`] when the key source fails.
pub fn run_bridge<C, S>(
    connection: Connection<C>,
    header: &SessionHeader,
    keys: &mut S,
    policy: &PollingPolicy,
) -> Result<SessionSummary, SessionError>
where
    C: Write,
    S: KeyStateSource + ?Sized,
{
    let port = connection.port().to_string();
    let mut emitter = SessionEmitter::new(connection);
    emitter.send_header(header)?;

    info!(
        "session started on {port}; polling vk {:#04x}..={:#04x} every {:?}",
        policy.range.first(),
        policy.range.last(),
        policy.interval
    );
    let summary = run_session(keys, &mut emitter, policy)?;
    debug!("session summary: {summary:?}");

    emitter.into_inner().close().map_err(SessionError::Write)?;
    info!(
        "session on {port} ended after {} ticks, {} symbols sent",
        summary.ticks, summary.symbols_sent
    );
    Ok(summary)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
