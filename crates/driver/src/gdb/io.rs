//! Byte streams to and from GDB
//!
//! [`MiTransport`] separates the MI protocol handling from where the bytes come from: a
//! spawned `gdb` process in production, or an in-memory pipe in tests.

use std::{
    io::{self, BufRead, BufReader, Cursor, Read, Write},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use crossbeam_channel::{Receiver, Sender};
use eyre::{Context, OptionExt};

/// Bidirectional MI line stream
///
/// The reader half is moved onto a background thread, the writer half stays with the
/// driver. Readers should block until a line is available and report end of file once
/// GDB has gone away.
pub trait MiTransport: Send + 'static {
    type Reader: BufRead + Send + 'static;
    type Writer: Write + Send + 'static;

    fn split(self) -> eyre::Result<(Self::Reader, Self::Writer)>;
}

/// A `gdb` child process speaking MI on its standard streams
pub struct ProcessTransport {
    child: ChildGuard,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl ProcessTransport {
    /// Spawn `gdb --interpreter=mi2`, sending the debugged program's terminal to
    /// `/dev/null` so it cannot draw over the user interface
    pub fn spawn(gdb: &Path) -> eyre::Result<Self> {
        tracing::debug!(gdb = %gdb.display(), "spawning debugger");
        let mut child = Command::new(gdb)
            .args(["--interpreter=mi2", "--quiet", "--nx", "--tty=/dev/null"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .wrap_err_with(|| format!("spawning {}", gdb.display()))?;

        let stdin = child.stdin.take().ok_or_eyre("gdb stdin was not captured")?;
        let stdout = child
            .stdout
            .take()
            .ok_or_eyre("gdb stdout was not captured")?;
        Ok(Self {
            child: ChildGuard(child),
            stdin,
            stdout,
        })
    }
}

impl MiTransport for ProcessTransport {
    type Reader = BufReader<ChildStdout>;
    type Writer = ProcessWriter;

    fn split(self) -> eyre::Result<(Self::Reader, Self::Writer)> {
        Ok((
            BufReader::new(self.stdout),
            ProcessWriter {
                stdin: self.stdin,
                _child: self.child,
            },
        ))
    }
}

/// Writer half of [`ProcessTransport`]; owns the child, which is killed when this is
/// dropped
pub struct ProcessWriter {
    stdin: ChildStdin,
    _child: ChildGuard,
}

impl Write for ProcessWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdin.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdin.flush()
    }
}

struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        match self.0.try_wait() {
            Ok(Some(status)) => tracing::debug!(%status, "debugger already exited"),
            _ => {
                tracing::debug!("killing debugger process");
                let _ = self.0.kill();
                let _ = self.0.wait();
            }
        }
    }
}

/// In-memory transport for testing
///
/// A connected pair: bytes written to one end are read from the other. Reads block
/// until data arrives and report end of file once the other end is dropped.
pub struct InMemoryTransport {
    reader: InMemoryReader,
    writer: InMemoryWriter,
}

pub struct InMemoryReader {
    buffer: Cursor<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

pub struct InMemoryWriter {
    tx: Sender<Vec<u8>>,
}

impl InMemoryTransport {
    /// Returns `(driver_end, debugger_end)`
    pub fn pair() -> (Self, Self) {
        let (driver_tx, debugger_rx) = crossbeam_channel::unbounded();
        let (debugger_tx, driver_rx) = crossbeam_channel::unbounded();

        let driver = Self {
            reader: InMemoryReader {
                buffer: Cursor::new(Vec::new()),
                rx: driver_rx,
            },
            writer: InMemoryWriter { tx: driver_tx },
        };
        let debugger = Self {
            reader: InMemoryReader {
                buffer: Cursor::new(Vec::new()),
                rx: debugger_rx,
            },
            writer: InMemoryWriter { tx: debugger_tx },
        };
        (driver, debugger)
    }

    pub fn into_halves(self) -> (InMemoryReader, InMemoryWriter) {
        (self.reader, self.writer)
    }
}

impl MiTransport for InMemoryTransport {
    type Reader = InMemoryReader;
    type Writer = InMemoryWriter;

    fn split(self) -> eyre::Result<(Self::Reader, Self::Writer)> {
        Ok(self.into_halves())
    }
}

impl BufRead for InMemoryReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.buffer.position() >= self.buffer.get_ref().len() as u64 {
            match self.rx.recv() {
                Ok(data) => self.buffer = Cursor::new(data),
                // other end dropped
                Err(_) => return Ok(&[]),
            }
        }
        self.buffer.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.buffer.consume(amt)
    }
}

impl Read for InMemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let len = std::cmp::min(available.len(), buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.consume(len);
        Ok(len)
    }
}

impl Write for InMemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel disconnected"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_cross_the_pair() -> io::Result<()> {
        let (driver, debugger) = InMemoryTransport::pair();
        let (mut driver_reader, mut driver_writer) = driver.into_halves();
        let (mut debugger_reader, mut debugger_writer) = debugger.into_halves();

        driver_writer.write_all(b"1-gdb-version\n")?;
        let mut line = String::new();
        debugger_reader.read_line(&mut line)?;
        assert_eq!(line, "1-gdb-version\n");

        // a line split across writes is reassembled
        debugger_writer.write_all(b"1^do")?;
        debugger_writer.write_all(b"ne\n")?;
        line.clear();
        driver_reader.read_line(&mut line)?;
        assert_eq!(line, "1^done\n");
        Ok(())
    }

    #[test]
    fn dropping_one_end_is_end_of_file() -> io::Result<()> {
        let (driver, debugger) = InMemoryTransport::pair();
        let (mut reader, _writer) = driver.into_halves();
        drop(debugger);

        let mut line = String::new();
        assert_eq!(reader.read_line(&mut line)?, 0);
        Ok(())
    }
}
