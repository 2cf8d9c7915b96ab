//! Destinations for training progress lines.
//!
//! Sinks return nothing, so a failing sink can never reach the loss
//! computation.

/// Accepts formatted progress lines.
pub trait ProgressSink {
    fn emit(&mut self, line: &str);
}

impl<P: ProgressSink + ?Sized> ProgressSink for &mut P {
    fn emit(&mut self, line: &str) {
        (**self).emit(line)
    }
}

/// Forwards lines to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&mut self, line: &str) {
        tracing::info!("{line}");
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectProgress {
    lines: Vec<String>,
}

impl CollectProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl ProgressSink for CollectProgress {
    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// Discards every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn emit(&mut self, _line: &str) {}
}
