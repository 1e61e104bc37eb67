//! Mock serial ports for unit and integration testing.
//!
//! # Why a mock provider?
//!
//! Real serial devices cannot be attached in CI, and the interesting paths
//! (busy ports, permission errors, dropped writes) are hard to provoke on
//! purpose.  [`MockPortProvider`] scripts open results per port and records
//! every attempt; [`MockChannel`] records every flushed frame so tests can
//! assert exactly what reached the wire.
//!
//! # Usage in tests
//!
//! ```ignore
//! let provider = MockPortProvider::new(vec![PortInfo::new("COM3", "Arduino Uno")]);
//! provider.fail_next_open("COM3", PortError::new("Access is denied."));
//!
//! // ... run discovery ...
//!
//! assert_eq!(provider.open_attempts(), ["COM3", "COM3"]);
//! assert_eq!(provider.wire().frames(), vec![b"BOX1|alice\n".to_vec()]);
//! ```

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::discover_port::{PortError, PortInfo, PortProvider};

// ── Recorded wire ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct WireState {
    frames: Vec<Vec<u8>>,
    unflushed: Vec<u8>,
    write_calls: usize,
    fail_writes_after: Option<usize>,
    closed: bool,
}

/// Shared record of everything written through [`MockChannel`]s.
#[derive(Debug, Clone, Default)]
pub struct WireLog {
    state: Arc<Mutex<WireState>>,
}

impl WireLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte runs in the order they were flushed.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().expect("lock poisoned").frames.clone()
    }

    /// Flushed frames decoded as UTF-8.
    pub fn frame_strings(&self) -> Vec<String> {
        self.frames()
            .into_iter()
            .map(|f| String::from_utf8_lossy(&f).into_owned())
            .collect()
    }

    /// Bytes written but not yet flushed.
    pub fn unflushed(&self) -> Vec<u8> {
        self.state.lock().expect("lock poisoned").unflushed.clone()
    }

    /// Whether the channel has been dropped.
    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("lock poisoned").closed
    }

    /// Makes every write after the first `n` fail with `BrokenPipe`.
    pub fn fail_writes_after(&self, n: usize) {
        self.state.lock().expect("lock poisoned").fail_writes_after = Some(n);
    }
}

/// A writable channel that records flushed frames into a [`WireLog`].
#[derive(Debug)]
pub struct MockChannel {
    log: WireLog,
}

impl MockChannel {
    pub fn new(log: WireLog) -> Self {
        Self { log }
    }
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.log.state.lock().expect("lock poisoned");
        if let Some(limit) = state.fail_writes_after {
            if state.write_calls >= limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
            }
        }
        state.write_calls += 1;
        state.unflushed.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.log.state.lock().expect("lock poisoned");
        if !state.unflushed.is_empty() {
            let frame = std::mem::take(&mut state.unflushed);
            state.frames.push(frame);
        }
        Ok(())
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        if let Ok(mut state) = self.log.state.lock() {
            state.closed = true;
        }
    }
}

// ── Provider ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ProviderState {
    enumeration_error: Option<PortError>,
    scripted_failures: HashMap<String, VecDeque<PortError>>,
    attempts: Vec<(String, u32, Duration)>,
}

/// A [`PortProvider`] with scripted open results.
///
/// Ports open successfully unless a failure has been queued for them with
/// [`MockPortProvider::fail_next_open`].  Any identifier can be opened, listed
/// or not, so operator-supplied ports work too.
#[derive(Debug)]
pub struct MockPortProvider {
    ports: Vec<PortInfo>,
    state: Mutex<ProviderState>,
    wire: WireLog,
}

impl MockPortProvider {
    pub fn new(ports: Vec<PortInfo>) -> Self {
        Self {
            ports,
            state: Mutex::new(ProviderState::default()),
            wire: WireLog::new(),
        }
    }

    /// Queues one failure for the next open of `port`.
    pub fn fail_next_open(&self, port: &str, error: PortError) {
        self.state
            .lock()
            .expect("lock poisoned")
            .scripted_failures
            .entry(port.to_string())
            .or_default()
            .push_back(error);
    }

    /// Makes `list_ports` fail.
    pub fn fail_enumeration(&self, error: PortError) {
        self.state.lock().expect("lock poisoned").enumeration_error = Some(error);
    }

    /// Ports passed to `open`, in call order.
    pub fn open_attempts(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("lock poisoned")
            .attempts
            .iter()
            .map(|(port, _, _)| port.clone())
            .collect()
    }

    /// Baud rate and timeout of the last open attempt on `port`.
    pub fn open_settings(&self, port: &str) -> Option<(u32, Duration)> {
        self.state
            .lock()
            .expect("lock poisoned")
            .attempts
            .iter()
            .rev()
            .find(|(p, _, _)| p == port)
            .map(|&(_, baud, timeout)| (baud, timeout))
    }

    /// The log shared by every channel this provider opens.
    pub fn wire(&self) -> WireLog {
        self.wire.clone()
    }
}

impl PortProvider for MockPortProvider {
    type Channel = MockChannel;

    fn list_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        match self.state.lock().expect("lock poisoned").enumeration_error {
            Some(ref error) => Err(error.clone()),
            None => Ok(self.ports.clone()),
        }
    }

    fn open(&self, port: &str, baud: u32, timeout: Duration) -> Result<MockChannel, PortError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.attempts.push((port.to_string(), baud, timeout));
        if let Some(error) = state
            .scripted_failures
            .get_mut(port)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(MockChannel::new(self.wire.clone()))
    }
}
