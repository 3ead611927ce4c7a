/*!
Line-oriented console endpoints for a [`DuplexSession`].

[`DuplexSession`]: crate::protocol::duplex::DuplexSession
*/

use std::io::{self, BufRead, Write};

use crate::core::constants::QUIT_COMMAND;
use crate::protocol::duplex::{MessageSink, MessageSource};

/// Reads one message per line; EOF or the quit command ends the session
pub struct ConsoleSource<R> {
    input: R,
}

impl ConsoleSource<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(io::BufReader::new(io::stdin()))
    }
}

impl<R: BufRead + Send + 'static> ConsoleSource<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead + Send + 'static> MessageSource for ConsoleSource<R> {
    fn next_message(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let text = line.trim_end_matches(['\r', '\n']);
                if text.trim() == QUIT_COMMAND {
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                log::warn!("console read failed: {}", e);
                None
            }
        }
    }
}

/// Prints each received message on its own line
pub struct ConsoleSink<W> {
    output: W,
    prefix: String,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), "peer> ")
    }
}

impl<W: Write + Send + 'static> ConsoleSink<W> {
    pub fn new(output: W, prefix: &str) -> Self {
        Self {
            output,
            prefix: prefix.to_string(),
        }
    }
}

impl<W: Write> ConsoleSink<W> {
    fn write_line(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = self.output.write_fmt(line).and_then(|_| self.output.flush()) {
            log::warn!("console write failed: {}", e);
        }
    }
}

impl<W: Write + Send + 'static> MessageSink for ConsoleSink<W> {
    fn deliver(&mut self, text: &str) {
        let prefix = std::mem::take(&mut self.prefix);
        self.write_line(format_args!("{}{}\n", prefix, text));
        self.prefix = prefix;
    }

    fn decrypt_failed(&mut self) {
        self.write_line(format_args!("[a message could not be decrypted and was dropped]\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Writer that only counts flushes
    #[derive(Clone, Default)]
    struct FlushCounter(Arc<Mutex<usize>>);

    impl Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// Writer whose every call fails
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_sink_flushes_every_line() {
        let counter = FlushCounter::default();
        let mut sink = ConsoleSink::new(counter.clone(), "peer> ");
        sink.deliver("one");
        sink.decrypt_failed();
        assert_eq!(*counter.0.lock().unwrap(), 2);
    }

    #[test]
    fn test_sink_survives_write_errors() {
        let mut sink = ConsoleSink::new(Broken, "peer> ");
        sink.deliver("lost");
        sink.decrypt_failed();
    }

    #[test]
    fn test_source_stops_at_quit() {
        let mut source = ConsoleSource::new(Cursor::new(b"hi\r\nthere\n/quit\nignored\n".to_vec()));
        assert_eq!(source.next_message().as_deref(), Some("hi"));
        assert_eq!(source.next_message().as_deref(), Some("there"));
        assert_eq!(source.next_message(), None);
    }

    #[test]
    fn test_source_stops_at_eof() {
        let mut source = ConsoleSource::new(Cursor::new(b"last line without newline".to_vec()));
        assert_eq!(source.next_message().as_deref(), Some("last line without newline"));
        assert_eq!(source.next_message(), None);
    }

    #[test]
    fn test_source_keeps_empty_lines() {
        let mut source = ConsoleSource::new(Cursor::new(b"\n".to_vec()));
        assert_eq!(source.next_message().as_deref(), Some(""));
    }

    #[test]
    fn test_sink_prefixes_lines() {
        let buf = SharedBuf::default();
        let mut sink = ConsoleSink::new(buf.clone(), "peer> ");
        sink.deliver("hello");
        sink.decrypt_failed();

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(written.starts_with("peer> hello\n"));
        assert!(written.contains("could not be decrypted"));
    }
}
