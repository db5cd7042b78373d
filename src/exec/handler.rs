// src/exec/handler.rs

//! Result delivery for asynchronous executions.

use tokio::sync::oneshot;

use crate::errors::{ProcrunError, Result};

/// Receives the outcome of an asynchronous execution.
///
/// `handle` consumes the handler, so it can only ever run once: either with
/// the accepted exit code or with the failure.
pub trait ResultHandler: Send + 'static {
    fn handle(self: Box<Self>, result: Result<i32>);
}

impl<F> ResultHandler for F
where
    F: FnOnce(Result<i32>) + Send + 'static,
{
    fn handle(self: Box<Self>, result: Result<i32>) {
        (*self)(result)
    }
}

/// Handler that forwards the outcome to a [`ResultReceiver`].
#[derive(Debug)]
pub struct DefaultResultHandler {
    tx: oneshot::Sender<Result<i32>>,
}

impl DefaultResultHandler {
    pub fn new() -> (Self, ResultReceiver) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, ResultReceiver { rx })
    }
}

impl ResultHandler for DefaultResultHandler {
    fn handle(self: Box<Self>, result: Result<i32>) {
        // The receiver may have been dropped; nobody is interested then.
        let _ = self.tx.send(result);
    }
}

/// Awaitable side of a [`DefaultResultHandler`].
#[derive(Debug)]
pub struct ResultReceiver {
    rx: oneshot::Receiver<Result<i32>>,
}

impl ResultReceiver {
    /// Wait for the execution to finish.
    pub async fn wait(self) -> Result<i32> {
        self.rx.await.map_err(|_| {
            ProcrunError::Other(anyhow::anyhow!(
                "execution task ended without delivering a result"
            ))
        })?
    }

    /// Take the result if it has already arrived.
    pub fn try_result(&mut self) -> Option<Result<i32>> {
        self.rx.try_recv().ok()
    }
}
