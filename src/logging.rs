//! Run-level log sink.
//!
//! Every component that reports progress takes an explicit `&dyn RunLog`
//! rather than assuming a global sink exists. The default implementation
//! forwards to `tracing`; embedding front-ends can supply their own sink to
//! mirror messages into a log pane.

use std::sync::Mutex;

/// Observable log stream for one engine run.
pub trait RunLog: Send + Sync {
    fn log(&self, message: &str);
}

/// Default sink: forwards run messages to the `tracing` infrastructure.
pub struct TracingLog;

impl RunLog for TracingLog {
    fn log(&self, message: &str) {
        tracing::info!(target: "magpie::run", "{message}");
    }
}

/// Captures messages in memory. Used by tests and by front-ends that render
/// the log themselves.
#[derive(Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("log mutex poisoned").clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.contains(needle))
    }
}

impl RunLog for MemoryLog {
    fn log(&self, message: &str) {
        self.entries
            .lock()
            .expect("log mutex poisoned")
            .push(message.to_string());
    }
}
