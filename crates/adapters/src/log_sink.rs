//! Log sinks for the JSON line logger.

use std::io::Write;
use std::sync::Mutex;

/// A sink that receives pre-formatted log lines.
pub trait LogSink: Send + Sync {
    /// Write a line to the sink.
    fn write_line(&self, line: &str);
}

/// Log sink that writes to stderr.
#[derive(Debug, Default)]
pub struct StderrLogSink;

impl LogSink for StderrLogSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        if let Err(error) = stderr.write_all(line.as_bytes()) {
            eprintln!("log sink write failed: {error}");
        }
    }
}

/// Log sink buffering lines in memory, for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    /// Drain and return the captured lines.
    pub fn take(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn write_line(&self, line: &str) {
        if let Ok(mut guard) = self.lines.lock() {
            guard.push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_captures_and_drains_lines() {
        let sink = MemoryLogSink::default();
        sink.write_line("hello\n");
        sink.write_line("world\n");

        assert_eq!(sink.take(), ["hello\n", "world\n"]);
        assert!(sink.take().is_empty());
    }
}
