use std::sync::{Arc, Mutex};

use procrun::errors::Result;
use procrun::exec::ResultHandler;

/// What a [`RecordingHandler`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Completed(i32),
    Failed(String),
}

/// Result handler that appends every invocation to a shared log, so tests
/// can assert it was called exactly once.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

impl ResultHandler for RecordingHandler {
    fn handle(self: Box<Self>, result: Result<i32>) {
        let entry = match result {
            Ok(code) => Recorded::Completed(code),
            Err(e) => Recorded::Failed(e.to_string()),
        };
        self.calls.lock().unwrap().push(entry);
    }
}
