//! Operator console: plain status lines and the port recovery prompt.
//!
//! Used only while the connection is being established, before the terminal
//! enters raw mode.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::application::discover_port::{OpenFailure, OperatorConsole, RecoveryChoice};

/// Console over any line reader and writer.
///
/// [`StdConsole::stdio`] binds it to the process's stdin / stdout; tests
/// pass in-memory buffers.
pub struct StdConsole<R, W> {
    input: R,
    output: W,
}

impl StdConsole<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{line}")?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> OperatorConsole for StdConsole<R, W> {
    fn status(&mut self, line: &str) {
        if let Err(e) = self.write_line(line) {
            warn!("failed to write status line: {e}");
        }
    }

    fn prompt_recovery(&mut self, failure: &OpenFailure) -> io::Result<RecoveryChoice> {
        writeln!(self.output)?;
        writeln!(
            self.output,
            "{} seems to be in use or access was denied. Close any serial monitor or other program using it, then:",
            failure.port
        )?;
        writeln!(self.output, "  - press ENTER to retry")?;
        writeln!(self.output, "  - type another port (e.g. COM3 or /dev/ttyUSB1) and press ENTER to try it")?;
        writeln!(self.output, "  - type 'exit' and press ENTER to give up")?;
        write!(self.output, "Port (ENTER=retry | PORT | exit): ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            // End of input: nobody is there to answer.
            return Ok(RecoveryChoice::Abort);
        }
        Ok(RecoveryChoice::parse(&line))
    }
}
