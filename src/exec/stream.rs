// src/exec/stream.rs

//! Ownership of the child's standard streams.
//!
//! A [`StreamHandler`] is part of the executor configuration and is shared
//! between executions. For every execution it configures the stdio of the
//! command and then hands out a [`StreamSession`] that owns stdin, stdout and
//! stderr until the process has exited.

use std::fmt;
use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use crate::errors::{ProcrunError, Result};

pub trait StreamHandler: Send + Sync + fmt::Debug {
    /// Set up stdin/stdout/stderr on the command before it is spawned.
    fn configure(&self, cmd: &mut Command);

    /// Take the child's pipes and start pumping them.
    fn start(&self, label: &str, child: &mut Child) -> Result<StreamSession>;
}

/// Per-execution pump tasks.
#[derive(Debug, Default)]
pub struct StreamSession {
    pumps: Vec<JoinHandle<io::Result<()>>>,
}

impl StreamSession {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pump: JoinHandle<io::Result<()>>) {
        self.pumps.push(pump);
    }

    /// Wait for every pump to drain and report the first failure.
    pub async fn finish(self) -> Result<()> {
        let mut first_err = None;

        for pump in self.pumps {
            let res = match pump.await {
                Ok(res) => res,
                Err(join_err) => Err(io::Error::other(join_err)),
            };
            if let Err(e) = res {
                warn!(error = %e, "stream pump failed");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(ProcrunError::Stream(e)),
            None => Ok(()),
        }
    }

    /// Like [`Self::finish`], but gives up after `limit` and aborts whatever
    /// pumps are still running.
    pub async fn finish_within(self, limit: Duration) -> Result<()> {
        let aborts = self.abort_handles();

        match tokio::time::timeout(limit, self.finish()).await {
            Ok(res) => res,
            Err(_) => {
                warn!(?limit, "stream pumps still open; abandoning remaining output");
                for a in aborts {
                    a.abort();
                }
                Ok(())
            }
        }
    }

    /// Handles that stop the pumps without waiting for them.
    pub fn abort_handles(&self) -> Vec<AbortHandle> {
        self.pumps.iter().map(JoinHandle::abort_handle).collect()
    }
}

/// Shared buffer that collects captured output.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Captured bytes as text (lossy UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn append(&self, data: &[u8]) {
        self.lock().extend_from_slice(data);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Where an output stream of the child goes.
#[derive(Debug, Clone, Default)]
pub enum OutputTarget {
    /// Each line is logged at debug level.
    #[default]
    Log,
    /// Bytes are appended to a shared buffer.
    Capture(CapturedOutput),
    /// The child writes directly to our own stream.
    Inherit,
    /// Discarded.
    Null,
}

impl OutputTarget {
    fn stdio(&self) -> Stdio {
        match self {
            OutputTarget::Log | OutputTarget::Capture(_) => Stdio::piped(),
            OutputTarget::Inherit => Stdio::inherit(),
            OutputTarget::Null => Stdio::null(),
        }
    }
}

/// Default stream handler: pumps stdout/stderr to their targets and
/// optionally feeds fixed bytes to stdin.
#[derive(Debug, Clone, Default)]
pub struct PumpStreamHandler {
    stdout: OutputTarget,
    stderr: OutputTarget,
    input: Option<Arc<[u8]>>,
}

impl PumpStreamHandler {
    /// Log both output streams at debug level.
    pub fn logging() -> Self {
        Self::default()
    }

    /// Capture stdout and stderr into separate buffers.
    ///
    /// The buffers belong to the handler, not to an execution: every
    /// execution of an executor using this handler appends to the same two
    /// buffers, and concurrent executions interleave their output there.
    /// Use one handler per executor when output must be told apart.
    pub fn capturing() -> (Self, CapturedOutput, CapturedOutput) {
        let out = CapturedOutput::new();
        let err = CapturedOutput::new();
        let handler = Self {
            stdout: OutputTarget::Capture(out.clone()),
            stderr: OutputTarget::Capture(err.clone()),
            input: None,
        };
        (handler, out, err)
    }

    pub fn inherit() -> Self {
        Self {
            stdout: OutputTarget::Inherit,
            stderr: OutputTarget::Inherit,
            input: None,
        }
    }

    pub fn with_stdout(mut self, target: OutputTarget) -> Self {
        self.stdout = target;
        self
    }

    pub fn with_stderr(mut self, target: OutputTarget) -> Self {
        self.stderr = target;
        self
    }

    /// Write `input` to the child's stdin, then close it.
    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(Arc::from(input.into()));
        self
    }
}

impl StreamHandler for PumpStreamHandler {
    fn configure(&self, cmd: &mut Command) {
        cmd.stdin(if self.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(self.stdout.stdio());
        cmd.stderr(self.stderr.stdio());
    }

    fn start(&self, label: &str, child: &mut Child) -> Result<StreamSession> {
        let mut session = StreamSession::empty();

        if let (Some(input), Some(mut stdin)) = (self.input.clone(), child.stdin.take()) {
            session.push(tokio::spawn(async move {
                match stdin.write_all(&input).await {
                    Ok(()) => stdin.shutdown().await,
                    // The child is free to exit without reading its input.
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    Err(e) => Err(e),
                }
            }));
        }

        if let Some(stdout) = child.stdout.take() {
            session.push(spawn_pump(label, "stdout", stdout, self.stdout.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            session.push(spawn_pump(label, "stderr", stderr, self.stderr.clone()));
        }

        Ok(session)
    }
}

fn spawn_pump<R>(
    label: &str,
    stream: &'static str,
    reader: R,
    target: OutputTarget,
) -> JoinHandle<io::Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let label = label.to_string();
    tokio::spawn(async move {
        match target {
            OutputTarget::Capture(captured) => {
                let mut reader = reader;
                let mut chunk = [0u8; 4096];
                loop {
                    let n = reader.read(&mut chunk).await?;
                    if n == 0 {
                        break;
                    }
                    captured.append(&chunk[..n]);
                }
            }
            _ => {
                // Output is not guaranteed to be UTF-8, so split on raw bytes.
                let mut reader = BufReader::new(reader);
                let mut line = Vec::new();
                loop {
                    line.clear();
                    if reader.read_until(b'\n', &mut line).await? == 0 {
                        break;
                    }
                    let text = String::from_utf8_lossy(&line);
                    debug!(command = %label, stream, "{}", text.trim_end());
                }
            }
        }
        Ok(())
    })
}
