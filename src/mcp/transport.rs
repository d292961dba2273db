//! Newline-delimited JSON messages over a reader/writer pair.

use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

use serde::Serialize;

/// One JSON-RPC message per line. Works over stdio or any in-memory pair.
pub struct StdioTransport<R, W> {
    reader: R,
    writer: W,
    line: String,
}

impl StdioTransport<StdinLock<'static>, Stdout> {
    /// A transport over the process's stdin and stdout.
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        StdioTransport::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdioTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        StdioTransport {
            reader,
            writer,
            line: String::new(),
        }
    }

    /// The next non-blank line without its terminator, or `None` at end of input.
    pub fn read_message(&mut self) -> io::Result<Option<String>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let message = self.line.trim();
            if !message.is_empty() {
                return Ok(Some(message.to_string()));
            }
        }
    }

    pub fn write_message<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
