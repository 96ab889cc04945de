//! Where run reports go.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// Plain-text destination for processor output.
pub trait ReportSink {
    fn write(&mut self, text: &str);

    fn writeln(&mut self, text: &str) {
        self.write(text);
        self.write("\n");
    }
}

impl ReportSink for String {
    fn write(&mut self, text: &str) {
        self.push_str(text);
    }
}

/// Sink over any writer, usually stdout. Write failures are logged and
/// otherwise ignored so that reporting never fails a run.
pub struct WriterSink<W: io::Write> {
    inner: W,
}

impl<W: io::Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: io::Write> ReportSink for WriterSink<W> {
    fn write(&mut self, text: &str) {
        if let Err(e) = self.inner.write_all(text.as_bytes()) {
            tracing::warn!(error = %e, "failed to write report");
        }
    }
}

/// In-memory sink whose clones share one buffer, so a caller can hand one
/// clone to the processor and read the report through another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Rc<RefCell<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }
}

impl ReportSink for MemorySink {
    fn write(&mut self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_sink_appends() {
        let mut out = String::new();
        out.writeln("Status summary:");
        out.write("done: 1 handler(s)");
        assert_eq!(out, "Status summary:\ndone: 1 handler(s)");
    }

    #[test]
    fn writer_sink_writes_bytes() {
        let mut sink = WriterSink::new(Vec::new());
        sink.writeln("PhpReturnFile: env.php / db.host / ");
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "PhpReturnFile: env.php / db.host / \n"
        );
    }

    #[test]
    fn memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.writeln("a");
        writer.write("b");
        assert_eq!(sink.contents(), "a\nb");
    }
}
